use indexmap::IndexMap;
use serde::Serialize;

use crate::ResourceId;

/// The synthetic primary category for ids with a single segment.
pub const GENERAL_CATEGORY: &str = "general";

/// A derived grouping computed from a resource id's dash segments.
///
/// Categories are never persisted; they are recomputed from the id whenever
/// the resource set changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Category {
    pub primary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

impl Category {
    /// Derive the category from an id by splitting on `-`.
    ///
    /// One segment maps to the synthetic `general` category; two segments use
    /// the first as primary with no secondary; three or more use the first as
    /// primary and the joined middle segments as secondary. The trailing
    /// segment is always treated as the resource's own name.
    pub fn from_resource_id(id: &ResourceId) -> Self {
        let segments: Vec<&str> = id.segments().collect();
        match segments.len() {
            0 | 1 => Self {
                primary: GENERAL_CATEGORY.to_string(),
                secondary: None,
            },
            2 => Self {
                primary: segments[0].to_string(),
                secondary: None,
            },
            n => Self {
                primary: segments[0].to_string(),
                secondary: Some(segments[1..n - 1].join("-")),
            },
        }
    }
}

/// The hierarchical categorization of a resource set: primary category to
/// node, each node holding per-secondary counts and its member ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTree {
    pub categories: IndexMap<String, CategoryNode>,
}

impl CategoryTree {
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    /// Number of resources under this primary category.
    pub count: usize,
    /// Per-secondary-category counts.
    pub children: IndexMap<String, usize>,
    /// Member resource ids, in insertion order.
    pub members: Vec<ResourceId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str) -> Category {
        Category::from_resource_id(&id.parse().unwrap())
    }

    #[test]
    fn single_segment_is_general() {
        assert_eq!(
            category("architect"),
            Category {
                primary: GENERAL_CATEGORY.to_string(),
                secondary: None
            }
        );
    }

    #[test]
    fn two_segments_have_no_secondary() {
        assert_eq!(
            category("cmd-run"),
            Category {
                primary: "cmd".to_string(),
                secondary: None
            }
        );
    }

    #[test]
    fn middle_segments_join_into_secondary() {
        assert_eq!(
            category("mcp-dev-team-architect"),
            Category {
                primary: "mcp".to_string(),
                secondary: Some("dev-team".to_string())
            }
        );
        assert_eq!(
            category("ai-specialists-prompt-engineer"),
            Category {
                primary: "ai".to_string(),
                secondary: Some("specialists-prompt".to_string())
            }
        );
    }

    #[test]
    fn three_segments_use_single_middle() {
        assert_eq!(
            category("mcp-core-server"),
            Category {
                primary: "mcp".to_string(),
                secondary: Some("core".to_string())
            }
        );
    }
}
