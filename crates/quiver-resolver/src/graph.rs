use std::sync::Arc;

use resource_types::{Resource, ResourceId};
use rustc_hash::FxHashMap;

/// The dependency graph over resource ids, flattened to index-based
/// adjacency lists.
///
/// Edges point from a resource to the resources it depends on. Node order is
/// ascending by id and every adjacency list is sorted, so all derived orders
/// (closures, cycles, topological ties) are independent of input order.
/// Dependency targets absent from the resource set are kept aside per
/// referrer rather than failing the build: whether a dangling edge is fatal
/// depends on the operation.
pub(crate) struct IdGraph {
    pub(crate) ids: Vec<ResourceId>,
    pub(crate) indices: FxHashMap<ResourceId, usize>,
    /// `requires[v]`: all dependency edges of `v` (required, plus
    /// recommended when enabled).
    pub(crate) requires: Vec<Vec<usize>>,
    /// `required_only[v]`: the subset of `requires[v]` declared `required`.
    pub(crate) required_only: Vec<Vec<usize>>,
    /// Reverse adjacency of `requires`.
    pub(crate) dependents: Vec<Vec<usize>>,
    /// `missing[v]`: dependency ids of `v` not present in the set.
    pub(crate) missing: Vec<Vec<ResourceId>>,
}

impl IdGraph {
    pub(crate) fn build(
        resources: &FxHashMap<ResourceId, Arc<Resource>>,
        include_recommended: bool,
    ) -> Self {
        let mut ids: Vec<ResourceId> = resources.keys().cloned().collect();
        ids.sort();
        let indices: FxHashMap<ResourceId, usize> = ids
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index))
            .collect();

        let n = ids.len();
        let mut requires: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut required_only: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut missing: Vec<Vec<ResourceId>> = vec![Vec::new(); n];

        for (v, id) in ids.iter().enumerate() {
            let dependencies = resources[id].dependencies();
            let mut edge = |target: &ResourceId, required: bool| match indices.get(target) {
                Some(&w) => {
                    requires[v].push(w);
                    if required {
                        required_only[v].push(w);
                    }
                    dependents[w].push(v);
                }
                None => missing[v].push(target.clone()),
            };
            for target in &dependencies.required {
                edge(target, true);
            }
            if include_recommended {
                for target in &dependencies.recommended {
                    edge(target, false);
                }
            }
        }

        for list in requires
            .iter_mut()
            .chain(required_only.iter_mut())
            .chain(dependents.iter_mut())
        {
            list.sort_unstable();
            list.dedup();
        }
        for list in &mut missing {
            list.sort();
            list.dedup();
        }

        Self {
            ids,
            indices,
            requires,
            required_only,
            dependents,
            missing,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }
}
