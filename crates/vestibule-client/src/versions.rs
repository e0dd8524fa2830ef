//! Server version metadata and compatibility.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Protocol versions this core can talk to.
///
/// A server is compatible when it advertises at least one of these.
pub const SUPPORTED_VERSIONS: &[&str] = &[
    "r0.6.0", "r0.6.1", "v1.1", "v1.2", "v1.3", "v1.4", "v1.5", "v1.6", "v1.7", "v1.8",
];

/// Version and capability metadata reported by a homeserver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersions {
    /// Protocol versions the server implements.
    pub versions: Vec<String>,
    /// Unstable feature flags and whether each is enabled.
    #[serde(default)]
    pub unstable_features: BTreeMap<String, bool>,
}

impl ServerVersions {
    /// Build from a plain version list.
    pub fn from_versions<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            versions: versions.into_iter().map(Into::into).collect(),
            unstable_features: BTreeMap::new(),
        }
    }

    /// Whether the server advertises at least one supported version.
    ///
    /// An empty version list is non-compliant, not merely unknown.
    pub fn is_compatible(&self) -> bool {
        self.versions
            .iter()
            .any(|v| SUPPORTED_VERSIONS.contains(&v.as_str()))
    }
}
