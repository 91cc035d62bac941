//! Weighted search over the loaded resource set.
//!
//! The index is an immutable snapshot: it is built once per catalog
//! generation and replaced wholesale when the resource set changes, which
//! also retires its query cache. Searching is infallible on user input:
//! empty queries return nothing, overlong queries are truncated.

pub use crate::index::{MatchField, SearchIndex, SearchOptions, SearchResult};

mod fuzzy;
mod index;
mod trie;

/// Queries longer than this are truncated before matching.
pub const MAX_QUERY_CHARS: usize = 256;

/// Results scoring below this are dropped unless the caller overrides it.
pub const DEFAULT_THRESHOLD: i32 = 60;

/// Number of query results memoized per index.
pub(crate) const QUERY_CACHE_SIZE: usize = 128;
