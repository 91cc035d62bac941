use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use resource_types::{Resource, ResourceKind};
use rustc_hash::FxHashMap;

use crate::fuzzy::similarity;
use crate::trie::Trie;
use crate::{DEFAULT_THRESHOLD, MAX_QUERY_CHARS, QUERY_CACHE_SIZE};

const SCORE_EXACT: i32 = 100;
const SCORE_PREFIX_ID: i32 = 80;
const SCORE_PREFIX_NAME: i32 = 60;
const FUZZY_NAME_PENALTY: i32 = 10;
const FUZZY_DESCRIPTION_PENALTY: i32 = 25;
const BONUS_ID: i32 = 20;
const BONUS_NAME: i32 = 10;

/// Which field produced a result's winning score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchField {
    Id,
    Name,
    Description,
}

/// Caller-tunable knobs for one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Results scoring below this are dropped.
    pub threshold: i32,
    /// Truncate the result list to at most this many entries.
    pub limit: Option<usize>,
    /// Restrict results to one resource kind.
    pub kind: Option<ResourceKind>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            limit: None,
            kind: None,
        }
    }
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub resource: Arc<Resource>,
    pub score: i32,
    pub field: MatchField,
}

#[derive(Debug)]
struct Entry {
    resource: Arc<Resource>,
    id_lower: String,
    name_lower: String,
    description_lower: String,
}

/// An immutable search snapshot over a resource set.
///
/// Structures built once: an exact id map, an exact lowercased-name map, a
/// prefix trie over ids and names, and a flat list for fuzzy scanning. The
/// query cache lives inside the snapshot, so replacing the snapshot after a
/// catalog refresh retires stale results with it.
#[derive(Debug)]
pub struct SearchIndex {
    entries: Vec<Entry>,
    by_id: FxHashMap<String, usize>,
    by_name: FxHashMap<String, Vec<usize>>,
    trie: Trie,
    cache: Mutex<LruCache<String, Arc<Vec<SearchResult>>>>,
}

impl SearchIndex {
    pub fn build(resources: impl IntoIterator<Item = Arc<Resource>>) -> Self {
        let mut entries = Vec::new();
        let mut by_id = FxHashMap::default();
        let mut by_name: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut trie = Trie::new();

        for resource in resources {
            let index = entries.len();
            let entry = Entry {
                id_lower: resource.id.as_str().to_lowercase(),
                name_lower: resource.name.to_lowercase(),
                description_lower: resource
                    .description
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase(),
                resource,
            };

            by_id.insert(entry.id_lower.clone(), index);
            by_name.entry(entry.name_lower.clone()).or_default().push(index);
            trie.insert(&entry.id_lower, pack(index, MatchField::Id));
            trie.insert(&entry.name_lower, pack(index, MatchField::Name));
            entries.push(entry);
        }

        Self {
            entries,
            by_id,
            by_name,
            trie,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(QUERY_CACHE_SIZE).unwrap(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank every match type for `query` in one pass.
    ///
    /// An exact match does not short-circuit: close alternatives are still
    /// ranked and returned below it. Ordering is score descending, then id
    /// ascending, so a fixed resource set and query always produce the same
    /// sequence.
    pub fn search_smart(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let query: String = query.chars().take(MAX_QUERY_CHARS).collect();
        if query.trim().is_empty() {
            return Vec::new();
        }

        let cache_key = cache_key(&query, options);
        if let Some(results) = self.cache.lock().unwrap().get(&cache_key) {
            return results.as_ref().clone();
        }

        let results = Arc::new(self.search_uncached(&query.to_lowercase(), options));
        self.cache
            .lock()
            .unwrap()
            .put(cache_key, Arc::clone(&results));
        results.as_ref().clone()
    }

    fn search_uncached(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let mut scores: Vec<Option<(i32, MatchField)>> = vec![None; self.entries.len()];
        let mut apply = |index: usize, score: i32, field: MatchField| {
            if score > scores[index].map_or(i32::MIN, |(best, _)| best) {
                scores[index] = Some((score, field));
            }
        };

        // Exact id and name, case-insensitive.
        if let Some(&index) = self.by_id.get(query) {
            apply(index, SCORE_EXACT + BONUS_ID, MatchField::Id);
        }
        if let Some(indices) = self.by_name.get(query) {
            for &index in indices {
                apply(index, SCORE_EXACT + BONUS_NAME, MatchField::Name);
            }
        }

        // Prefix hits via the trie.
        for packed in self.trie.collect_prefix(query) {
            let (index, field) = unpack(packed);
            let score = match field {
                MatchField::Id => SCORE_PREFIX_ID + BONUS_ID,
                MatchField::Name => SCORE_PREFIX_NAME + BONUS_NAME,
                MatchField::Description => continue,
            };
            apply(index, score, field);
        }

        // Fuzzy scan over the flat list.
        for (index, entry) in self.entries.iter().enumerate() {
            apply(
                index,
                similarity(query, &entry.id_lower) + BONUS_ID,
                MatchField::Id,
            );
            apply(
                index,
                similarity(query, &entry.name_lower) - FUZZY_NAME_PENALTY + BONUS_NAME,
                MatchField::Name,
            );
            if !entry.description_lower.is_empty() {
                apply(
                    index,
                    similarity(query, &entry.description_lower) - FUZZY_DESCRIPTION_PENALTY,
                    MatchField::Description,
                );
            }
        }

        let mut results: Vec<SearchResult> = scores
            .into_iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let (score, field) = slot?;
                if score < options.threshold {
                    return None;
                }
                let entry = &self.entries[index];
                if let Some(kind) = options.kind {
                    if entry.resource.kind != kind {
                        return None;
                    }
                }
                Some(SearchResult {
                    resource: Arc::clone(&entry.resource),
                    score,
                    field,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.resource.id.cmp(&b.resource.id))
        });
        if let Some(limit) = options.limit {
            results.truncate(limit);
        }
        results
    }
}

fn cache_key(query: &str, options: &SearchOptions) -> String {
    format!(
        "{query}\u{0}{}\u{0}{}\u{0}{}",
        options.threshold,
        options.limit.map_or(-1i64, |limit| limit as i64),
        options.kind.map_or("*", ResourceKind::as_str),
    )
}

fn pack(index: usize, field: MatchField) -> u32 {
    let tag = match field {
        MatchField::Id => 0,
        MatchField::Name => 1,
        MatchField::Description => 2,
    };
    u32::try_from(index << 2).expect("search index overflow") | tag
}

fn unpack(packed: u32) -> (usize, MatchField) {
    let field = match packed & 0b11 {
        0 => MatchField::Id,
        1 => MatchField::Name,
        _ => MatchField::Description,
    };
    (packed as usize >> 2, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, name: &str, description: &str) -> Arc<Resource> {
        Arc::new(
            serde_yaml::from_str(&format!(
                r"
                id: {id}
                type: agent
                name: {name}
                description: {description}
                source: {{ url: 'https://github.com/org/repo' }}
                install_path: agents/{id}.md
                "
            ))
            .unwrap(),
        )
    }

    fn index() -> SearchIndex {
        SearchIndex::build([
            resource("architect", "Architect", "System architecture design"),
            resource(
                "architecture-agent",
                "Architecture Agent",
                "Reviews architecture decisions",
            ),
            resource("security-reviewer", "Security Reviewer", "Audits code for issues"),
        ])
    }

    #[test]
    fn typo_query_ranks_closest_first() {
        let index = index();
        let results = index.search_smart("architet", &SearchOptions::default());

        let ids: Vec<&str> = results
            .iter()
            .map(|result| result.resource.id.as_str())
            .collect();
        assert_eq!(ids, ["architect", "architecture-agent"]);
        assert!(results[0].score >= 95);
        assert!(results[1].score >= 80);
    }

    #[test]
    fn exact_id_match_outranks_everything() {
        let index = index();
        let results = index.search_smart("architect", &SearchOptions::default());

        assert_eq!(results[0].resource.id.as_str(), "architect");
        assert_eq!(results[0].score, 120);
        assert_eq!(results[0].field, MatchField::Id);
        assert!(results[1].score < 120);
    }

    #[test]
    fn exact_match_does_not_short_circuit_alternatives() {
        let index = index();
        let results = index.search_smart("architect", &SearchOptions::default());
        assert!(
            results.len() >= 2,
            "close alternatives should still be ranked"
        );
    }

    #[test]
    fn prefix_on_id_outranks_name_matches() {
        let index = SearchIndex::build([
            resource("arch-linux-helper", "Helper", "x"),
            resource("zz-helper", "Arch Helper", "x"),
        ]);
        let results = index.search_smart("arch", &SearchOptions::default());
        assert_eq!(results[0].resource.id.as_str(), "arch-linux-helper");
        assert_eq!(results[0].score, SCORE_PREFIX_ID + BONUS_ID);
        assert_eq!(results[1].resource.id.as_str(), "zz-helper");
        assert!(results[1].score < results[0].score);
    }

    #[test]
    fn results_are_deterministic_across_runs() {
        let index = index();
        let options = SearchOptions {
            threshold: 0,
            ..SearchOptions::default()
        };
        let first = index.search_smart("arch", &options);
        let second = index.search_smart("arch", &options);
        assert_eq!(first, second);

        // A freshly built index over the same set agrees element-wise.
        let rebuilt = self::index().search_smart("arch", &options);
        assert_eq!(first, rebuilt);
    }

    #[test]
    fn empty_query_returns_empty() {
        let index = index();
        assert!(index.search_smart("", &SearchOptions::default()).is_empty());
        assert!(index.search_smart("   ", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn single_character_query_prefixes() {
        let index = index();
        let results = index.search_smart("a", &SearchOptions::default());
        let ids: Vec<&str> = results
            .iter()
            .map(|result| result.resource.id.as_str())
            .collect();
        assert_eq!(ids, ["architect", "architecture-agent"]);
    }

    #[test]
    fn overlong_query_is_truncated_not_fatal() {
        let index = index();
        let long = "a".repeat(10_000);
        let results = index.search_smart(&long, &SearchOptions::default());
        assert!(results.is_empty());
    }

    #[test]
    fn kind_filter_restricts_results() {
        let index = index();
        let options = SearchOptions {
            kind: Some(ResourceKind::Mcp),
            ..SearchOptions::default()
        };
        assert!(index.search_smart("architect", &options).is_empty());
    }

    #[test]
    fn limit_truncates_ranked_results() {
        let index = index();
        let options = SearchOptions {
            limit: Some(1),
            ..SearchOptions::default()
        };
        let results = index.search_smart("architet", &options);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource.id.as_str(), "architect");
    }

    #[test]
    fn empty_index_searches_cleanly() {
        let index = SearchIndex::build(Vec::new());
        assert!(index.search_smart("anything", &SearchOptions::default()).is_empty());
    }
}
