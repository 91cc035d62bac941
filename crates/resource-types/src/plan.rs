use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ResourceId;

/// Why a resource is part of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStrength {
    /// Reachable from the selection through `required` edges alone.
    Required,
    /// Pulled in through at least one `recommended` edge.
    Recommended,
}

/// One entry of an [`InstallPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedResource {
    pub id: ResourceId,
    pub strength: DependencyStrength,
    /// Whether an identical install (same digest) is already on disk.
    pub already_installed: bool,
    /// Declared content size in bytes, when the catalog knows it.
    pub size: Option<u64>,
}

/// An ordered sequence of resources to install.
///
/// The order is a topological order of the transitive closure of the user's
/// selection: every resource appears exactly once, after all of its required
/// predecessors. Plans are per-operation values and are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallPlan {
    pub resources: Vec<PlannedResource>,
}

impl InstallPlan {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.resources.iter().map(|resource| &resource.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedResource> {
        self.resources.iter()
    }
}

impl Display for InstallPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, resource) in self.resources.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            f.write_str(resource.id.as_str())?;
        }
        Ok(())
    }
}
