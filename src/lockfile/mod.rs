//! The `ovo.lock` file: a deterministic JSON serialization of a resolved
//! dependency graph.
//!
//! Determinism is enforced structurally rather than by sorting at
//! serialize-time: `packages` is a `BTreeMap`, whose iteration (and thus
//! serde's map serialization) is always ascending byte-wise by key, and
//! `LockedPackage`'s fields are declared in the fixed order the wire format
//! requires, which `serde_json` preserves when serializing a typed struct
//! directly (it never round-trips through an unordered `Value` map).

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ResolutionResult, ResolvedPackage, SourceType};

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LockfileError {
    #[error("lockfile not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse lockfile: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("unrecognized lockfile schema version {0} (expected {CURRENT_VERSION})")]
    UnsupportedVersion(u32),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Either a missing file (distinct from a malformed one) or a successfully
/// parsed lockfile. Returned by `try_load`.
pub enum LoadOutcome {
    Absent,
    Loaded(Lockfile),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockfileMetadata {
    pub updated_at: i64,
    #[serde(default)]
    pub manifest_hash: Option<String>,
    #[serde(default)]
    pub ovo_version: Option<String>,
}

/// The persisted form of a `ResolvedPackage`: field order here is the wire
/// order, not just a convenience grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedPackage {
    pub version: String,
    pub source_type: SourceType,
    pub source_url: String,
    #[serde(default)]
    pub resolved_hash: Option<String>,
    #[serde(default)]
    pub integrity_hash: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub locked_at: i64,
}

impl LockedPackage {
    pub fn from_resolved(pkg: &ResolvedPackage, integrity_hash: Option<String>, locked_at: i64) -> Self {
        LockedPackage {
            version: pkg.version.clone(),
            source_type: pkg.source_type,
            source_url: pkg.source_url.clone(),
            resolved_hash: pkg.resolved_hash.clone(),
            integrity_hash,
            dependencies: pkg.dependencies.clone(),
            locked_at,
        }
    }

    /// Whether this locked entry's version satisfies a resolver-style
    /// version requirement. Delegates to the resolver's compatibility rules.
    pub fn satisfies(&self, version_req: &str) -> bool {
        crate::resolver::version::matches(version_req, &self.version)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    pub version: u32,
    pub roots: Vec<String>,
    pub metadata: LockfileMetadata,
    pub packages: BTreeMap<String, LockedPackage>,
}

impl Lockfile {
    pub fn new() -> Self {
        Lockfile {
            version: CURRENT_VERSION,
            roots: Vec::new(),
            metadata: LockfileMetadata::default(),
            packages: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, LockfileError> {
        match Self::try_load(path)? {
            LoadOutcome::Loaded(lockfile) => Ok(lockfile),
            LoadOutcome::Absent => Err(LockfileError::FileNotFound(path.to_path_buf())),
        }
    }

    /// Loads `path`, distinguishing "file does not exist" from any other
    /// I/O or parse failure.
    pub fn try_load(path: &Path) -> Result<LoadOutcome, LockfileError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LoadOutcome::Absent),
            Err(e) => return Err(LockfileError::Io(e)),
        };

        let lockfile: Lockfile = serde_json::from_str(&content)?;
        if lockfile.version != CURRENT_VERSION {
            return Err(LockfileError::UnsupportedVersion(lockfile.version));
        }
        Ok(LoadOutcome::Loaded(lockfile))
    }

    /// Writes to `<path>.tmp` then renames, so a crash mid-write never
    /// corrupts the existing lockfile.
    pub fn save(&self, path: &Path) -> Result<(), LockfileError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let tmp_path = path.with_extension("lock.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn put_package(&mut self, name: impl Into<String>, package: LockedPackage) {
        self.packages.insert(name.into(), package);
    }

    pub fn get_package(&self, name: &str) -> Option<&LockedPackage> {
        self.packages.get(name)
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn add_root(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.roots.contains(&name) {
            self.roots.push(name);
        }
    }

    pub fn is_up_to_date(&self, manifest_hash: &str) -> bool {
        self.metadata.manifest_hash.as_deref() == Some(manifest_hash)
    }

    /// Depth-first order from `roots`, each package emitted only after all
    /// of its dependencies. A valid lockfile cannot contain a cycle (the
    /// resolver enforces that before a lockfile is ever written), so a
    /// simple visited-set suffices.
    pub fn topological_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.packages.len());
        let mut visited = std::collections::HashSet::new();

        fn visit(
            name: &str,
            packages: &BTreeMap<String, LockedPackage>,
            visited: &mut std::collections::HashSet<String>,
            order: &mut Vec<String>,
        ) {
            if !visited.insert(name.to_string()) {
                return;
            }
            if let Some(pkg) = packages.get(name) {
                for dep in &pkg.dependencies {
                    visit(dep, packages, visited, order);
                }
            }
            order.push(name.to_string());
        }

        for root in &self.roots {
            visit(root, &self.packages, &mut visited, &mut order);
        }
        order
    }

    /// Builds a lockfile from a resolution, stamping every entry with
    /// `locked_at`. Roots are carried over in order.
    pub fn from_resolution(result: &ResolutionResult, now: i64, manifest_hash: Option<String>) -> Self {
        let mut lockfile = Lockfile::new();
        lockfile.roots = result.roots.clone();
        lockfile.metadata.updated_at = now;
        lockfile.metadata.manifest_hash = manifest_hash;
        lockfile.metadata.ovo_version = Some(env!("CARGO_PKG_VERSION").to_string());

        for (name, pkg) in &result.packages {
            lockfile.put_package(name.clone(), LockedPackage::from_resolved(pkg, None, now));
        }
        lockfile
    }
}

impl Default for Lockfile {
    fn default() -> Self {
        Self::new()
    }
}
