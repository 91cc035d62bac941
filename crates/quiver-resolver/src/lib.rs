//! Dependency resolution over the resource graph.
//!
//! The graph is an adjacency structure over resource *ids*: resources never
//! hold references to each other, so cycles in the data cannot create cycles
//! in ownership. Resolution computes the transitive closure of a selection,
//! proves it acyclic, and emits a deterministic topological install order.
//! Cycle detection enumerates every simple cycle (not just the first) so the
//! error can name them all.
//!
//! Everything here is iterative; resolution is tested against chains far
//! deeper than any recursion budget would allow.

use resource_types::ResourceId;

pub use crate::resolve::Resolver;

mod cycles;
mod graph;
mod resolve;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("Resource `{id}` is not in the catalog")]
    UnknownResource { id: ResourceId },

    #[error("Missing dependency: `{id}` (required by `{referrer}`) is not in the catalog")]
    MissingDependency { id: ResourceId, referrer: ResourceId },

    #[error("Dependency cycle detected: {}", format_cycles(.cycles))]
    CycleDetected { cycles: Vec<Vec<ResourceId>> },
}

fn format_cycles(cycles: &[Vec<ResourceId>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut rendered: Vec<&str> = cycle.iter().map(ResourceId::as_str).collect();
            if let Some(first) = rendered.first().copied() {
                rendered.push(first);
            }
            rendered.join(" -> ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}
