use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use resource_types::{
    DependencyStrength, InstallPlan, PlannedResource, Resource, ResourceId,
};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cycles::simple_cycles;
use crate::graph::IdGraph;
use crate::ResolveError;

/// Resolves user selections against an explicit resource set.
///
/// The resolver holds an immutable snapshot of the resource set; each
/// operation builds the id graph it needs and leaves no state behind.
#[derive(Debug)]
pub struct Resolver {
    resources: FxHashMap<ResourceId, Arc<Resource>>,
}

impl Resolver {
    pub fn new(resources: impl IntoIterator<Item = Arc<Resource>>) -> Self {
        Self {
            resources: resources
                .into_iter()
                .map(|resource| (resource.id.clone(), resource))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Compute an install plan for `selection`: the transitive closure over
    /// `required` (and `recommended` when enabled), verified acyclic, in
    /// topological order with lexicographic tie-breaking.
    ///
    /// Fatal conditions: a selected id not in the set, a closure member
    /// depending on an id not in the set, or any cycle within the closure.
    /// No partial plan is ever returned.
    pub fn resolve(
        &self,
        selection: &[ResourceId],
        include_recommended: bool,
    ) -> Result<InstallPlan, ResolveError> {
        if selection.is_empty() {
            return Ok(InstallPlan::default());
        }

        let graph = IdGraph::build(&self.resources, include_recommended);

        // Transitive closure, iterative worklist.
        let mut in_closure = vec![false; graph.len()];
        let mut worklist: Vec<usize> = Vec::new();
        for id in selection {
            let &v = graph
                .indices
                .get(id)
                .ok_or_else(|| ResolveError::UnknownResource { id: id.clone() })?;
            if !in_closure[v] {
                in_closure[v] = true;
                worklist.push(v);
            }
        }
        let selection_roots: Vec<usize> = worklist.clone();

        while let Some(v) = worklist.pop() {
            if let Some(dep) = graph.missing[v].first() {
                return Err(ResolveError::MissingDependency {
                    id: dep.clone(),
                    referrer: graph.ids[v].clone(),
                });
            }
            for &w in &graph.requires[v] {
                if !in_closure[w] {
                    in_closure[w] = true;
                    worklist.push(w);
                }
            }
        }

        // All cycles inside the closure, so the error enumerates every one.
        let cycles = simple_cycles(&graph.requires, &in_closure);
        if !cycles.is_empty() {
            return Err(ResolveError::CycleDetected {
                cycles: cycles
                    .into_iter()
                    .map(|cycle| cycle.into_iter().map(|v| graph.ids[v].clone()).collect())
                    .collect(),
            });
        }

        // Kahn's algorithm over the closure. The ready set is a min-heap on
        // the id, which pins the order among independent resources.
        let mut deps_remaining: Vec<usize> = (0..graph.len())
            .map(|v| {
                if in_closure[v] {
                    graph.requires[v].iter().filter(|&&w| in_closure[w]).count()
                } else {
                    0
                }
            })
            .collect();
        let mut ready: BinaryHeap<Reverse<(ResourceId, usize)>> = (0..graph.len())
            .filter(|&v| in_closure[v] && deps_remaining[v] == 0)
            .map(|v| Reverse((graph.ids[v].clone(), v)))
            .collect();

        let mut order: Vec<usize> = Vec::new();
        while let Some(Reverse((_, v))) = ready.pop() {
            order.push(v);
            for &u in &graph.dependents[v] {
                if in_closure[u] {
                    deps_remaining[u] -= 1;
                    if deps_remaining[u] == 0 {
                        ready.push(Reverse((graph.ids[u].clone(), u)));
                    }
                }
            }
        }
        debug_assert_eq!(
            order.len(),
            in_closure.iter().filter(|&&inside| inside).count(),
            "topological order must cover the acyclic closure"
        );

        // A resource is `required` if reachable from the selection through
        // required edges alone; anything else in the closure came in through
        // a recommended edge.
        let mut required = vec![false; graph.len()];
        let mut worklist = selection_roots;
        for &v in &worklist {
            required[v] = true;
        }
        while let Some(v) = worklist.pop() {
            for &w in &graph.required_only[v] {
                if !required[w] {
                    required[w] = true;
                    worklist.push(w);
                }
            }
        }

        let resources = order
            .into_iter()
            .map(|v| {
                let id = graph.ids[v].clone();
                let size = self.resources[&id]
                    .metadata
                    .as_ref()
                    .and_then(|metadata| metadata.get("size"))
                    .and_then(serde_yaml::Value::as_u64);
                PlannedResource {
                    strength: if required[v] {
                        DependencyStrength::Required
                    } else {
                        DependencyStrength::Recommended
                    },
                    already_installed: false,
                    size,
                    id,
                }
            })
            .collect();

        let plan = InstallPlan { resources };
        debug!("Resolved {} resource(s): {plan}", plan.len());
        Ok(plan)
    }

    /// Every simple cycle in the full resource set. Recommended edges
    /// participate only when `include_recommended` is set.
    pub fn detect_cycles(&self, include_recommended: bool) -> Vec<Vec<ResourceId>> {
        let graph = IdGraph::build(&self.resources, include_recommended);
        let active = vec![true; graph.len()];
        simple_cycles(&graph.requires, &active)
            .into_iter()
            .map(|cycle| cycle.into_iter().map(|v| graph.ids[v].clone()).collect())
            .collect()
    }

    /// All resources that depend on `id`, directly or transitively, through
    /// either edge strength. Sorted by id; empty if `id` is unknown.
    pub fn reverse_dependencies(&self, id: &ResourceId) -> Vec<ResourceId> {
        let graph = IdGraph::build(&self.resources, true);
        let Some(&start) = graph.indices.get(id) else {
            return Vec::new();
        };

        let mut seen = vec![false; graph.len()];
        let mut worklist = vec![start];
        seen[start] = true;
        let mut result = Vec::new();
        while let Some(v) = worklist.pop() {
            for &u in &graph.dependents[v] {
                if !seen[u] {
                    seen[u] = true;
                    result.push(graph.ids[u].clone());
                    worklist.push(u);
                }
            }
        }
        result.sort();
        result
    }
}
