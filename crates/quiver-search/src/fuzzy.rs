/// Token-set-aware similarity on a 0–100 scale.
///
/// Three views are combined and the best one wins:
/// - the plain normalized Levenshtein ratio of the two strings,
/// - the ratio of the token-sorted forms (so `team-dev` matches `dev-team`),
/// - the best ratio of the query against any query-length window of the
///   candidate.
///
/// The token view is capped below 100 so that only a literal match can reach
/// the exact-match score; the window view is capped below the dedicated
/// prefix tier so a substring hit never outranks a true prefix hit.
pub(crate) fn similarity(query: &str, candidate: &str) -> i32 {
    if query.is_empty() || candidate.is_empty() {
        return 0;
    }

    let direct = strsim::normalized_levenshtein(query, candidate);
    let token = token_sort_ratio(query, candidate).min(0.99);
    let partial = best_window_ratio(query, candidate).min(0.79);

    let best = direct.max(token).max(partial);
    (best * 100.0).round() as i32
}

fn token_sort_ratio(query: &str, candidate: &str) -> f64 {
    let sorted = |s: &str| -> String {
        let mut tokens: Vec<&str> = s
            .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .collect();
        tokens.sort_unstable();
        tokens.join(" ")
    };
    strsim::normalized_levenshtein(&sorted(query), &sorted(candidate))
}

fn best_window_ratio(query: &str, candidate: &str) -> f64 {
    let query_chars: Vec<char> = query.chars().collect();
    let candidate_chars: Vec<char> = candidate.chars().collect();
    if candidate_chars.len() <= query_chars.len() {
        return 0.0;
    }

    let mut best: f64 = 0.0;
    for start in 0..=candidate_chars.len() - query_chars.len() {
        let window: String = candidate_chars[start..start + query_chars.len()]
            .iter()
            .collect();
        best = best.max(strsim::normalized_levenshtein(query, &window));
        if best == 1.0 {
            break;
        }
    }
    best
}
