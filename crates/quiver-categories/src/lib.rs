//! Prefix-based categorization of the resource set.
//!
//! Categories are derived from resource ids alone (see
//! [`Category::from_resource_id`]), so the engine is a pure function of the
//! id set: building it twice over the same resources yields equal trees.
//! Filtering is an index lookup into maps prebuilt during the single build
//! pass.

use std::sync::Arc;

use resource_types::{Category, CategoryTree, Resource, ResourceId};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// An immutable categorization snapshot over a resource set.
#[derive(Debug)]
pub struct CategoryEngine {
    tree: CategoryTree,
    resources: FxHashMap<ResourceId, Arc<Resource>>,
    by_primary: FxHashMap<String, Vec<ResourceId>>,
    by_secondary: FxHashMap<(String, String), Vec<ResourceId>>,
}

impl CategoryEngine {
    /// One pass over `resources`: derive each category, grow the tree, and
    /// fill both filter indexes.
    pub fn build(resources: impl IntoIterator<Item = Arc<Resource>>) -> Self {
        let mut tree = CategoryTree::default();
        let mut by_id = FxHashMap::default();
        let mut by_primary: FxHashMap<String, Vec<ResourceId>> = FxHashMap::default();
        let mut by_secondary: FxHashMap<(String, String), Vec<ResourceId>> = FxHashMap::default();

        for resource in resources {
            let id = resource.id.clone();
            let Category { primary, secondary } = Category::from_resource_id(&id);

            let node = tree.categories.entry(primary.clone()).or_default();
            node.count += 1;
            node.members.push(id.clone());
            if let Some(secondary) = &secondary {
                *node.children.entry(secondary.clone()).or_default() += 1;
                by_secondary
                    .entry((primary.clone(), secondary.clone()))
                    .or_default()
                    .push(id.clone());
            }
            by_primary.entry(primary).or_default().push(id.clone());
            by_id.insert(id, resource);
        }

        // Deterministic iteration independent of input order.
        tree.categories.sort_keys();
        for node in tree.categories.values_mut() {
            node.children.sort_keys();
            node.members.sort();
        }
        for ids in by_primary.values_mut() {
            ids.sort();
        }
        for ids in by_secondary.values_mut() {
            ids.sort();
        }

        Self {
            tree,
            resources: by_id,
            by_primary,
            by_secondary,
        }
    }

    pub fn tree(&self) -> &CategoryTree {
        &self.tree
    }

    /// Resources under `primary`, optionally narrowed to a secondary
    /// category. Lookup only; no scanning.
    pub fn filter(&self, primary: &str, secondary: Option<&str>) -> Vec<Arc<Resource>> {
        let ids = match secondary {
            Some(secondary) => self
                .by_secondary
                .get(&(primary.to_string(), secondary.to_string())),
            None => self.by_primary.get(primary),
        };
        ids.map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.resources.get(id).cloned())
            .collect()
    }

    pub fn statistics(&self) -> CategoryStatistics {
        let mut largest: Option<(String, usize)> = None;
        let mut smallest: Option<(String, usize)> = None;
        for (name, node) in &self.tree.categories {
            if largest.as_ref().map_or(true, |(_, count)| node.count > *count) {
                largest = Some((name.clone(), node.count));
            }
            if smallest.as_ref().map_or(true, |(_, count)| node.count < *count) {
                smallest = Some((name.clone(), node.count));
            }
        }
        CategoryStatistics {
            total_resources: self.resources.len(),
            total_categories: self.tree.len(),
            largest,
            smallest,
        }
    }
}

/// Aggregate counts over the category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStatistics {
    pub total_resources: usize,
    pub total_categories: usize,
    /// `(primary, count)` of the most populated category.
    pub largest: Option<(String, usize)>,
    /// `(primary, count)` of the least populated category.
    pub smallest: Option<(String, usize)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str) -> Arc<Resource> {
        Arc::new(
            serde_yaml::from_str(&format!(
                r"
                id: {id}
                type: agent
                name: {id}
                source: {{ url: 'https://github.com/org/repo' }}
                install_path: agents/{id}.md
                "
            ))
            .unwrap(),
        )
    }

    fn engine() -> CategoryEngine {
        CategoryEngine::build([
            resource("mcp-dev-team-architect"),
            resource("mcp-dev-team-writer"),
            resource("mcp-core"),
            resource("cmd-run"),
            resource("architect"),
        ])
    }

    #[test]
    fn tree_counts_and_children() {
        let engine = engine();
        let tree = engine.tree();

        let mcp = &tree.categories["mcp"];
        assert_eq!(mcp.count, 3);
        assert_eq!(mcp.children["dev-team"], 2);
        assert_eq!(mcp.members.len(), 3);

        assert_eq!(tree.categories["cmd"].count, 1);
        assert_eq!(tree.categories["general"].count, 1);
    }

    #[test]
    fn filter_by_primary_and_secondary() {
        let engine = engine();

        let mcp_all_resources = engine.filter("mcp", None);
        let mcp_all: Vec<&str> = mcp_all_resources
            .iter()
            .map(|resource| resource.id.as_str())
            .collect();
        assert_eq!(
            mcp_all,
            ["mcp-core", "mcp-dev-team-architect", "mcp-dev-team-writer"]
        );

        let dev_team_resources = engine.filter("mcp", Some("dev-team"));
        let dev_team: Vec<&str> = dev_team_resources
            .iter()
            .map(|resource| resource.id.as_str())
            .collect();
        assert_eq!(dev_team, ["mcp-dev-team-architect", "mcp-dev-team-writer"]);

        assert!(engine.filter("mcp", Some("no-such")).is_empty());
        assert!(engine.filter("no-such", None).is_empty());
    }

    #[test]
    fn build_is_deterministic_regardless_of_input_order() {
        let forward = engine();
        let reversed = CategoryEngine::build([
            resource("architect"),
            resource("cmd-run"),
            resource("mcp-core"),
            resource("mcp-dev-team-writer"),
            resource("mcp-dev-team-architect"),
        ]);
        assert_eq!(forward.tree(), reversed.tree());
    }

    #[test]
    fn statistics_report_extremes() {
        let engine = engine();
        let stats = engine.statistics();
        assert_eq!(stats.total_resources, 5);
        assert_eq!(stats.total_categories, 3);
        assert_eq!(stats.largest, Some(("mcp".to_string(), 3)));
        // `cmd` and `general` both hold one resource; the first in sorted
        // order wins the tie.
        assert_eq!(stats.smallest, Some(("cmd".to_string(), 1)));
    }

    #[test]
    fn empty_set_builds_an_empty_tree() {
        let engine = CategoryEngine::build(Vec::new());
        assert!(engine.tree().is_empty());
        assert_eq!(engine.statistics().total_categories, 0);
        assert!(engine.filter("anything", None).is_empty());
    }
}
