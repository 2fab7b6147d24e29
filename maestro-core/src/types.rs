//! Identity and metadata primitives shared by every component.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for any addressable component: a mission, a tool, a
/// note, a connection. Random by default; [`ComponentId::from_name`] gives
/// a deterministic id for cases that need stable identity across restarts
/// (e.g. deriving a tool's id from its registered name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(Uuid);

impl ComponentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes()))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic version triple for components that need one (tool schemas,
/// stored artifacts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn is_compatible_with(&self, other: &Version) -> bool {
        self.major == other.major
    }

    pub fn is_newer_than(&self, other: &Version) -> bool {
        self > other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Descriptive metadata attached to a component (a tool, an agent role).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub id: ComponentId,
    pub name: String,
    pub version: Version,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ComponentMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ComponentId::new(),
            name: name.into(),
            version: Version::new(0, 1, 0),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_version(&mut self, version: Version) {
        self.version = version;
        self.updated_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_id_uniqueness() {
        assert_ne!(ComponentId::new(), ComponentId::new());
    }

    #[test]
    fn component_id_from_name_is_deterministic() {
        assert_eq!(
            ComponentId::from_name("document_search"),
            ComponentId::from_name("document_search")
        );
        assert_ne!(
            ComponentId::from_name("document_search"),
            ComponentId::from_name("web_search")
        );
    }

    #[test]
    fn version_compatibility() {
        let a = Version::new(1, 2, 3);
        let b = Version::new(1, 5, 0);
        let c = Version::new(2, 0, 0);
        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
        assert!(b.is_newer_than(&a));
    }

    #[test]
    fn version_display() {
        assert_eq!(Version::new(1, 2, 3).to_string(), "1.2.3");
    }

    #[test]
    fn metadata_starts_at_0_1_0() {
        let meta = ComponentMetadata::new("planning", "planning role");
        assert_eq!(meta.version, Version::new(0, 1, 0));
    }
}
