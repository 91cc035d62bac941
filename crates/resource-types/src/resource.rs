use serde::{Deserialize, Serialize};

use crate::{ResourceId, ResourceKind, SchemaViolation, Source};

/// A single installable unit from the catalog.
///
/// Resources are immutable once loaded. Field validation beyond what serde
/// enforces lives in [`Resource::validate`], which the catalog loader runs on
/// every parsed document before the resource is admitted to the in-memory
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resource {
    pub id: ResourceId,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencySpec>,
    /// Where the resource is written, relative to the per-user base directory.
    pub install_path: String,
    /// Free-form metadata (tags, tools, model, ...); opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_yaml::Mapping>,
}

impl Resource {
    /// Validate the fields serde cannot: non-empty strings, digest format,
    /// disjoint dependency lists, and a relative install path.
    ///
    /// URL scheme/host policy and path containment are enforced separately by
    /// the security layer; this is purely shape validation.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if self.name.trim().is_empty() {
            return Err(SchemaViolation::new("name", "must not be empty"));
        }
        if let Some(sha256) = &self.source.sha256 {
            if !Source::is_valid_sha256(sha256) {
                return Err(SchemaViolation::new(
                    "source.sha256",
                    "expected 64 lowercase hex characters",
                ));
            }
        }
        if self.install_path.trim().is_empty() {
            return Err(SchemaViolation::new("install_path", "must not be empty"));
        }
        if self.install_path.starts_with('/') || self.install_path.starts_with('\\') {
            return Err(SchemaViolation::new(
                "install_path",
                "must be relative to the user base directory",
            ));
        }
        if let Some(dependencies) = &self.dependencies {
            if let Some(id) = dependencies
                .recommended
                .iter()
                .find(|id| dependencies.required.contains(id))
            {
                return Err(SchemaViolation::new(
                    "dependencies.recommended",
                    format!("`{id}` is already listed under `required`"),
                ));
            }
        }
        Ok(())
    }

    /// The dependency spec, empty if the document declared none.
    pub fn dependencies(&self) -> DependencySpec {
        self.dependencies.clone().unwrap_or_default()
    }
}

/// Declared edges to other resources, split by strength.
///
/// `required` dependencies gate installation ordering; `recommended` ones are
/// pulled in only when the caller opts in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<ResourceId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommended: Vec<ResourceId>,
}

impl DependencySpec {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.recommended.is_empty()
    }
}
