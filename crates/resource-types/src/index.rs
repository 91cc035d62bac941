use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ResourceId, ResourceKind};

/// The top-level catalog summary, parsed from `<base>/index.yaml`.
///
/// The file itself only carries counts; the per-kind id lists are enumerated
/// from the catalog tree by the loader and attached afterwards (they do
/// round-trip through the disk cache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogIndex {
    pub total: usize,
    pub types: IndexMap<ResourceKind, usize>,
    pub version: String,
    #[serde(default)]
    pub resource_ids: IndexMap<ResourceKind, Vec<ResourceId>>,
}

impl CatalogIndex {
    /// The declared count for `kind`, zero if absent.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.types.get(&kind).copied().unwrap_or(0)
    }

    /// The enumerated ids for `kind`, in catalog order.
    pub fn ids(&self, kind: ResourceKind) -> &[ResourceId] {
        self.resource_ids
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All `(kind, id)` pairs in enumeration order: by kind, then by id.
    pub fn all(&self) -> impl Iterator<Item = (ResourceKind, &ResourceId)> {
        ResourceKind::ALL
            .into_iter()
            .flat_map(|kind| self.ids(kind).iter().map(move |id| (kind, id)))
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
