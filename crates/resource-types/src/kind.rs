use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of resource kinds the catalog can hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Agent,
    Command,
    Hook,
    Template,
    Mcp,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Agent,
        ResourceKind::Command,
        ResourceKind::Hook,
        ResourceKind::Template,
        ResourceKind::Mcp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Agent => "agent",
            ResourceKind::Command => "command",
            ResourceKind::Hook => "hook",
            ResourceKind::Template => "template",
            ResourceKind::Mcp => "mcp",
        }
    }

    /// The catalog (and per-user) subdirectory holding this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceKind::Agent => "agents",
            ResourceKind::Command => "commands",
            ResourceKind::Hook => "hooks",
            ResourceKind::Template => "templates",
            ResourceKind::Mcp => "mcps",
        }
    }
}

impl FromStr for ResourceKind {
    type Err = InvalidResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(ResourceKind::Agent),
            "command" => Ok(ResourceKind::Command),
            "hook" => Ok(ResourceKind::Hook),
            "template" => Ok(ResourceKind::Template),
            "mcp" => Ok(ResourceKind::Mcp),
            _ => Err(InvalidResourceKind(s.to_string())),
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown resource type `{0}`: expected one of `agent`, `command`, `hook`, `template`, `mcp`")]
pub struct InvalidResourceKind(pub String);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::ResourceKind;

    #[test]
    fn round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind() {
        assert!(ResourceKind::from_str("plugin").is_err());
        assert!(ResourceKind::from_str("Agent").is_err());
    }
}
