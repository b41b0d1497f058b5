//! Thin manifest stand-in.
//!
//! Parsing the real ZON manifest format is out of scope for this crate (see
//! the Non-goals in the governing specification); the core only needs a
//! package's name, version, and flat dependency list to feed the resolver.
//! Any caller that does own a ZON parser can construct this directly.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::dependency::DependencySource;

/// A minimal parsed manifest: just enough for the resolver to start from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: HashMap<String, ManifestDependency>,
}

/// A dependency entry as it would appear in a manifest's dependency table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestDependency {
    #[serde(default = "default_version_req")]
    pub version_req: String,
    pub source: DependencySource,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub build_only: bool,
    #[serde(default)]
    pub dev_only: bool,
}

fn default_version_req() -> String {
    "*".to_string()
}

impl Manifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Manifest {
            name: name.into(),
            version: version.into(),
            dependencies: HashMap::new(),
        }
    }

    /// Load a manifest serialized as JSON (the interchange format the thin
    /// CLI uses to hand a parsed manifest to the core; a real ZON frontend
    /// would construct `Manifest` directly instead of going through disk).
    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
