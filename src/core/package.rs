//! `ResolvedPackage` and `ResolutionResult`: the output of the resolver.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tag identifying which adapter produced a `ResolvedPackage`. Shared with
/// the lockfile and the cache's `source_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Git,
    Archive,
    Path,
    Registry,
    Vcpkg,
    Conan,
    System,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Git => "git",
            SourceType::Archive => "archive",
            SourceType::Path => "path",
            SourceType::Registry => "registry",
            SourceType::Vcpkg => "vcpkg",
            SourceType::Conan => "conan",
            SourceType::System => "system",
        }
    }
}

/// Compile/link flags an adapter was able to derive for a resolved package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub lib_dirs: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub c_flags: Vec<String>,
    #[serde(default)]
    pub ld_flags: Vec<String>,
}

/// An exact resolution: name, version, and source nailed down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
    pub source_type: SourceType,
    /// Canonical location: git url, archive url, local path, registry
    /// reference, vcpkg triplet path, conan reference, or "system".
    pub source_url: String,
    /// Git commit id or archive content hash, when applicable.
    #[serde(default)]
    pub resolved_hash: Option<String>,
    /// Names of this package's transitive dependencies.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub build_config: Option<BuildConfig>,
    /// Git: whether submodules should be initialized after checkout.
    #[serde(default)]
    pub submodules: bool,
    /// Git: auth token used to clone a private remote. Never persisted to
    /// a lockfile; only meaningful within the resolve-then-fetch run that
    /// produced this package.
    #[serde(skip)]
    pub auth_token: Option<String>,
}

impl ResolvedPackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>, source_type: SourceType, source_url: impl Into<String>) -> Self {
        ResolvedPackage {
            name: name.into(),
            version: version.into(),
            source_type,
            source_url: source_url.into(),
            resolved_hash: None,
            dependencies: Vec::new(),
            build_config: None,
            submodules: false,
            auth_token: None,
        }
    }

    pub fn with_resolved_hash(mut self, hash: impl Into<String>) -> Self {
        self.resolved_hash = Some(hash.into());
        self
    }

    pub fn with_submodules(mut self, submodules: bool) -> Self {
        self.submodules = submodules;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    pub fn with_build_config(mut self, build_config: BuildConfig) -> Self {
        self.build_config = Some(build_config);
        self
    }
}

/// Counters surfaced by the resolver for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    pub total: usize,
    pub from_lockfile: usize,
    pub newly_resolved: usize,
    pub fallbacks_used: usize,
    pub elapsed_ms: u64,
}

/// A complete, conflict-free resolution closed under transitive dependencies.
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    pub packages: HashMap<String, ResolvedPackage>,
    pub roots: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ResolveStats,
}

impl ResolutionResult {
    pub fn new() -> Self {
        ResolutionResult::default()
    }

    /// Depth-first traversal from `roots`, emitting each node only after all
    /// of its dependencies. Matches the lockfile's `topological_order`.
    pub fn install_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.packages.len());
        let mut visited = std::collections::HashSet::new();

        fn visit(
            name: &str,
            packages: &HashMap<String, ResolvedPackage>,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, deps: &[&str]) -> ResolvedPackage {
        ResolvedPackage::new(name, "1.0.0", SourceType::Registry, "registry")
            .with_dependencies(deps.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn install_order_is_topological() {
        let mut result = ResolutionResult::new();
        result.packages.insert("a".into(), pkg("a", &["b"]));
        result.packages.insert("b".into(), pkg("b", &["c"]));
        result.packages.insert("c".into(), pkg("c", &[]));
        result.roots = vec!["a".into()];

        let order = result.install_order();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn install_order_handles_diamond_without_duplicates() {
        let mut result = ResolutionResult::new();
        result.packages.insert("a".into(), pkg("a", &["b", "c"]));
        result.packages.insert("b".into(), pkg("b", &["d"]));
        result.packages.insert("c".into(), pkg("c", &["d"]));
        result.packages.insert("d".into(), pkg("d", &[]));
        result.roots = vec!["a".into()];

        let order = result.install_order();
        assert_eq!(order.iter().filter(|n| *n == "d").count(), 1);
        assert!(order.iter().position(|n| n == "d").unwrap() < order.iter().position(|n| n == "b").unwrap());
    }
}
