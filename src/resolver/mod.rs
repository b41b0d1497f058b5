//! Transitive dependency resolution: a synchronous depth-first walk with
//! explicit cycle detection, lockfile-priority short-circuiting, and
//! per-dependency fallback-source retry.
//!
//! This replaces a PubGrub-style SAT solver with the simpler algorithm the
//! governing specification calls for — PubGrub has no natural way to express
//! "consult the lockfile before the network" or "retry with source B if
//! source A's fetch fails", both of which this resolver needs directly.

pub mod errors;
pub mod version;

use std::collections::HashSet;
use std::time::Instant;

pub use errors::ResolveError;

use crate::core::dependency::PlatformConstraint;
use crate::core::{Dependency, DependencySource, ResolutionResult, ResolvedPackage};
use crate::lockfile::Lockfile;

/// A single call point standing in for "invoke the right source adapter".
/// Kept as a trait so the resolver can be unit-tested against scripted
/// resolutions without touching git/curl/vcpkg.
pub trait SourceResolver {
    fn resolve(
        &self,
        name: &str,
        version_req: &str,
        source: &DependencySource,
    ) -> Result<ResolvedPackage, ResolveError>;
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub max_depth: usize,
    pub use_lockfile: bool,
    pub offline: bool,
    pub target_platform: Option<PlatformConstraint>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_depth: 100,
            use_lockfile: true,
            offline: false,
            target_platform: None,
        }
    }
}

pub struct Resolver<'a, R: SourceResolver> {
    config: ResolverConfig,
    source_resolver: &'a R,
    lockfile: Option<&'a Lockfile>,
    resolving: Vec<String>,
    result: ResolutionResult,
    started_at: Instant,
}

impl<'a, R: SourceResolver> Resolver<'a, R> {
    pub fn new(config: ResolverConfig, source_resolver: &'a R, lockfile: Option<&'a Lockfile>) -> Self {
        Resolver {
            config,
            source_resolver,
            lockfile,
            resolving: Vec::new(),
            result: ResolutionResult::new(),
            started_at: Instant::now(),
        }
    }

    /// Resolves every root dependency (in order) plus their closure,
    /// returning the finished `ResolutionResult`.
    pub fn resolve(mut self, deps: &[Dependency]) -> Result<ResolutionResult, ResolveError> {
        for dep in deps {
            if dep.dev_only {
                continue;
            }
            if !dep.matches_platform(self.config.target_platform.as_ref()) {
                self.result
                    .warnings
                    .push(format!("`{}` skipped: platform mismatch", dep.name));
                continue;
            }
            let name = self.resolve_dependency(dep, 0)?;
            if !self.result.roots.contains(&name) {
                self.result.roots.push(name);
            }
        }

        self.result.stats.total = self.result.packages.len();
        self.result.stats.elapsed_ms = self.started_at.elapsed().as_millis() as u64;
        Ok(self.result)
    }

    fn resolve_dependency(&mut self, dep: &Dependency, depth: usize) -> Result<String, ResolveError> {
        if depth > self.config.max_depth {
            return Err(ResolveError::CyclicDependency(dep.name.to_string()));
        }
        if self.resolving.contains(&dep.name.to_string()) {
            return Err(ResolveError::CyclicDependency(dep.name.to_string()));
        }

        if let Some(existing) = self.result.packages.get(dep.name.as_str()) {
            if version::matches(&dep.version_req, &existing.version) {
                return Ok(existing.name.clone());
            }
            return Err(ResolveError::VersionConflict {
                package: dep.name.to_string(),
                existing: existing.version.clone(),
                requested: dep.version_req.clone(),
            });
        }

        if self.config.use_lockfile {
            if let Some(lockfile) = self.lockfile {
                if let Some(locked) = lockfile.get_package(dep.name.as_str()) {
                    if locked.satisfies(&dep.version_req) {
                        return self.materialize_from_lockfile(dep.name.as_str(), depth);
                    }
                }
            }
        }

        if self.config.offline && dep.source.needs_network() {
            return Err(ResolveError::NetworkError {
                package: dep.name.to_string(),
            });
        }

        // Kept on `resolving` for the entire duration of this subtree — not
        // just across the adapter call — so a dependency reached again while
        // any of its own dependencies are still being resolved is correctly
        // seen as a cycle, not as "already resolved".
        self.resolving.push(dep.name.to_string());
        let result = self.resolve_dependency_subtree(dep, depth);
        self.resolving.pop();
        result
    }

    fn resolve_dependency_subtree(&mut self, dep: &Dependency, depth: usize) -> Result<String, ResolveError> {
        let (pkg, used_fallback) = self.resolve_from_source_with_fallbacks(dep)?;
        let name = pkg.name.clone();
        let dependency_names = pkg.dependencies.clone();
        self.result.packages.insert(name.clone(), pkg);
        if used_fallback {
            self.result.stats.fallbacks_used += 1;
        } else {
            self.result.stats.newly_resolved += 1;
        }

        for dep_name in dependency_names {
            if self.result.packages.contains_key(&dep_name) {
                continue;
            }
            let transitive = Dependency::new(dep_name, DependencySource::Registry {
                name: None,
                registry_url: None,
            });
            self.resolve_dependency(&transitive, depth + 1)?;
        }

        Ok(name)
    }

    fn materialize_from_lockfile(&mut self, name: &str, depth: usize) -> Result<String, ResolveError> {
        let locked = self.lockfile.unwrap().get_package(name).unwrap().clone();
        let pkg = ResolvedPackage::new(name, locked.version.clone(), locked.source_type, locked.source_url.clone())
            .with_dependencies(locked.dependencies.clone());
        let pkg = match locked.resolved_hash.clone() {
            Some(hash) => pkg.with_resolved_hash(hash),
            None => pkg,
        };

        self.result.packages.insert(name.to_string(), pkg);
        self.result.stats.from_lockfile += 1;

        for dep_name in locked.dependencies {
            if self.result.packages.contains_key(&dep_name) {
                continue;
            }
            let transitive = Dependency::new(dep_name, DependencySource::Registry {
                name: None,
                registry_url: None,
            });
            self.resolve_dependency(&transitive, depth + 1)?;
        }

        Ok(name.to_string())
    }

    fn resolve_from_source_with_fallbacks(
        &self,
        dep: &Dependency,
    ) -> Result<(ResolvedPackage, bool), ResolveError> {
        match self
            .source_resolver
            .resolve(dep.name.as_str(), &dep.version_req, &dep.source)
        {
            Ok(pkg) => Ok((pkg, false)),
            Err(primary_err) => {
                if dep.fallbacks.is_empty() {
                    return Err(primary_err);
                }
                let mut last_error = primary_err;
                for fallback in &dep.fallbacks {
                    match self
                        .source_resolver
                        .resolve(dep.name.as_str(), &dep.version_req, fallback)
                    {
                        Ok(pkg) => return Ok((pkg, true)),
                        Err(e) => last_error = e,
                    }
                }
                Err(ResolveError::AllFallbacksFailed {
                    package: dep.name.to_string(),
                    last_error: last_error.to_string(),
                })
            }
        }
    }
}

/// Seen-name set helper used by callers building a resolution incrementally
/// (e.g. the manager's `update` path, which re-resolves with lockfile
/// priority disabled but still wants to avoid double-counting roots).
pub fn unique_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        if seen.insert(name.clone()) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceType;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct ScriptedResolver {
        packages: RefCell<HashMap<String, ResolvedPackage>>,
        fail_names: Vec<String>,
    }

    impl SourceResolver for ScriptedResolver {
        fn resolve(
            &self,
            name: &str,
            _version_req: &str,
            _source: &DependencySource,
        ) -> Result<ResolvedPackage, ResolveError> {
            if self.fail_names.iter().any(|n| n == name) {
                return Err(ResolveError::PackageNotFound(name.to_string()));
            }
            self.packages
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| ResolveError::PackageNotFound(name.to_string()))
        }
    }

    fn registry_dep(name: &str) -> Dependency {
        Dependency::new(
            name,
            DependencySource::Registry {
                name: None,
                registry_url: None,
            },
        )
    }

    #[test]
    fn resolves_simple_chain() {
        let mut packages = HashMap::new();
        packages.insert(
            "a".to_string(),
            ResolvedPackage::new("a", "1.0.0", SourceType::Registry, "registry")
                .with_dependencies(vec!["b".to_string()]),
        );
        packages.insert(
            "b".to_string(),
            ResolvedPackage::new("b", "1.0.0", SourceType::Registry, "registry"),
        );

        let resolver_impl = ScriptedResolver {
            packages: RefCell::new(packages),
            fail_names: vec![],
        };

        let resolver = Resolver::new(ResolverConfig::default(), &resolver_impl, None);
        let result = resolver.resolve(&[registry_dep("a")]).unwrap();

        assert_eq!(result.packages.len(), 2);
        assert!(result.packages.contains_key("b"));
    }

    #[test]
    fn detects_cycle() {
        let mut packages = HashMap::new();
        packages.insert(
            "a".to_string(),
            ResolvedPackage::new("a", "1.0.0", SourceType::Registry, "registry")
                .with_dependencies(vec!["b".to_string()]),
        );
        packages.insert(
            "b".to_string(),
            ResolvedPackage::new("b", "1.0.0", SourceType::Registry, "registry")
                .with_dependencies(vec!["a".to_string()]),
        );

        let resolver_impl = ScriptedResolver {
            packages: RefCell::new(packages),
            fail_names: vec![],
        };

        let resolver = Resolver::new(ResolverConfig::default(), &resolver_impl, None);
        let err = resolver.resolve(&[registry_dep("a")]).unwrap_err();
        assert!(matches!(err, ResolveError::CyclicDependency(_)));
    }

    #[test]
    fn lockfile_priority_avoids_network() {
        use crate::lockfile::{Lockfile, LockedPackage};

        let mut lockfile = Lockfile::new();
        lockfile.put_package(
            "b",
            LockedPackage {
                version: "1.0.0".to_string(),
                source_type: SourceType::Git,
                source_url: "https://example.com/b.git".to_string(),
                resolved_hash: Some("deadbeef".to_string()),
                integrity_hash: None,
                dependencies: vec!["c".to_string()],
                locked_at: 0,
            },
        );
        lockfile.put_package(
            "c",
            LockedPackage {
                version: "1.0.0".to_string(),
                source_type: SourceType::Path,
                source_url: ".".to_string(),
                resolved_hash: None,
                integrity_hash: None,
                dependencies: vec![],
                locked_at: 0,
            },
        );

        let mut packages = HashMap::new();
        packages.insert(
            "a".to_string(),
            ResolvedPackage::new("a", "1.0.0", SourceType::Registry, "registry")
                .with_dependencies(vec!["b".to_string()]),
        );
        // `b` is deliberately absent from the scripted resolver: if the
        // resolver ever tried the network for it, resolution would fail.
        let resolver_impl = ScriptedResolver {
            packages: RefCell::new(packages),
            fail_names: vec![],
        };

        let resolver = Resolver::new(ResolverConfig::default(), &resolver_impl, Some(&lockfile));
        let result = resolver.resolve(&[registry_dep("a")]).unwrap();

        assert_eq!(result.stats.from_lockfile, 2);
        assert!(result.packages.contains_key("b"));
        assert!(result.packages.contains_key("c"));
    }

    #[test]
    fn offline_mode_rejects_network_sources() {
        let resolver_impl = ScriptedResolver {
            packages: RefCell::new(HashMap::new()),
            fail_names: vec![],
        };
        let mut config = ResolverConfig::default();
        config.offline = true;

        let dep = Dependency::new(
            "a",
            DependencySource::Git {
                url: "https://example.com/a.git".to_string(),
                reference: None,
                subdir: None,
                submodules: false,
                auth_token: None,
            },
        );

        let resolver = Resolver::new(config, &resolver_impl, None);
        let err = resolver.resolve(&[dep]).unwrap_err();
        assert!(matches!(err, ResolveError::NetworkError { .. }));
    }

    #[test]
    fn falls_back_to_secondary_source_on_primary_failure() {
        struct FallbackAware;
        impl SourceResolver for FallbackAware {
            fn resolve(
                &self,
                name: &str,
                _version_req: &str,
                source: &DependencySource,
            ) -> Result<ResolvedPackage, ResolveError> {
                match source {
                    DependencySource::Registry { .. } => Err(ResolveError::PackageNotFound(name.to_string())),
                    DependencySource::System { .. } => {
                        Ok(ResolvedPackage::new(name, "1.0.0", SourceType::System, "system"))
                    }
                    _ => Err(ResolveError::PackageNotFound(name.to_string())),
                }
            }
        }

        let dep = registry_dep("a").with_fallbacks(vec![DependencySource::System {
            pkg_config_name: Some("a".to_string()),
            include_paths: vec![],
            library_paths: vec![],
            libraries: vec![],
        }]);

        let resolver_impl = FallbackAware;
        let resolver = Resolver::new(ResolverConfig::default(), &resolver_impl, None);
        let result = resolver.resolve(&[dep]).unwrap();

        assert_eq!(result.stats.fallbacks_used, 1);
        assert!(result.packages.contains_key("a"));
    }
}
