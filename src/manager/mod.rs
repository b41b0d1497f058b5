//! `PackageManager`: the high-level orchestrator tying together the
//! resolver, fetcher, and lockfile. This is the sole orchestration surface
//! — every CLI subcommand is a thin wrapper around one of its operations.

pub mod depstring;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::core::Dependency;
use crate::fetcher::{FetchError, FetchResult, Fetcher};
use crate::integrity::hash_to_hex;
use crate::lockfile::{LoadOutcome, Lockfile, LockedPackage, LockfileError};
use crate::resolver::{ResolveError, Resolver, ResolverConfig};
use crate::sources::{AdapterSourceResolver, SourceContext};
use crate::util::process::RealCommandRunner;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    #[error("dependency string error: {0}")]
    DepString(#[from] depstring::DepStringError),
}

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub cache_dir: PathBuf,
    pub lockfile_path: PathBuf,
    pub use_lockfile: bool,
    pub offline: bool,
    pub registry_url: Option<String>,
    pub vcpkg_root: Option<PathBuf>,
    pub conan_user_home: Option<PathBuf>,
    pub max_parallel: usize,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            cache_dir: default_cache_dir(),
            lockfile_path: PathBuf::from("ovo.lock"),
            use_lockfile: true,
            offline: false,
            registry_url: None,
            vcpkg_root: std::env::var("VCPKG_ROOT").ok().map(PathBuf::from),
            conan_user_home: std::env::var("CONAN_USER_HOME").ok().map(PathBuf::from),
            max_parallel: 4,
            timeout_secs: 60,
            cache_ttl_secs: 7 * 24 * 3600,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "ovo", "ovo")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".ovo-cache"))
}

#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub resolved: usize,
    pub fetched: usize,
    pub from_cache: usize,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub mismatches: Vec<String>,
    pub missing: Vec<String>,
}

/// High-level orchestrator: configuration plus the resolver/fetcher glue.
pub struct PackageManager {
    config: ManagerConfig,
    source_resolver: AdapterSourceResolver,
}

impl PackageManager {
    pub fn new(config: ManagerConfig) -> Self {
        let ctx = SourceContext {
            runner: Arc::new(RealCommandRunner),
            offline: config.offline,
            timeout_secs: config.timeout_secs,
            vcpkg_root: config.vcpkg_root.clone(),
            conan_user_home: config.conan_user_home.clone(),
        };
        PackageManager { config, source_resolver: AdapterSourceResolver { ctx } }
    }

    fn load_lockfile(&self) -> Result<Option<Lockfile>, ManagerError> {
        if !self.config.use_lockfile {
            return Ok(None);
        }
        match Lockfile::try_load(&self.config.lockfile_path)? {
            LoadOutcome::Loaded(lockfile) => Ok(Some(lockfile)),
            LoadOutcome::Absent => Ok(None),
        }
    }

    fn fetcher(&self) -> Fetcher {
        Fetcher::new(self.config.cache_dir.clone(), self.config.cache_ttl_secs, self.source_resolver.ctx.clone())
    }

    /// `resolve(deps)` — construct a Resolver pointed at any existing
    /// lockfile, and run it.
    pub fn resolve(&self, deps: &[Dependency]) -> Result<crate::core::ResolutionResult, ManagerError> {
        let lockfile = self.load_lockfile()?;
        let resolver_config = ResolverConfig { offline: self.config.offline, ..ResolverConfig::default() };
        let resolver = Resolver::new(resolver_config, &self.source_resolver, lockfile.as_ref());
        Ok(resolver.resolve(deps)?)
    }

    /// Same as `resolve`, but with lockfile priority disabled so fresh
    /// versions are picked for every dependency.
    pub fn update(&self, deps: &[Dependency]) -> Result<crate::core::ResolutionResult, ManagerError> {
        let lockfile = self.load_lockfile()?;
        let resolver_config =
            ResolverConfig { offline: self.config.offline, use_lockfile: false, ..ResolverConfig::default() };
        let resolver = Resolver::new(resolver_config, &self.source_resolver, lockfile.as_ref());
        Ok(resolver.resolve(deps)?)
    }

    /// `fetch(pkg)` — lazily create a Fetcher and delegate.
    pub fn fetch(&self, pkg: &crate::core::ResolvedPackage) -> Result<FetchResult, ManagerError> {
        Ok(self.fetcher().fetch(pkg, false)?)
    }

    /// Resolve, fetch every package through a bounded worker pool, then
    /// write the new lockfile atomically. A partial install never leaves a
    /// partially updated lockfile on disk — the save happens only after
    /// every fetch succeeds and the pool has joined.
    pub fn install(&self, deps: &[Dependency]) -> Result<InstallReport, ManagerError> {
        let result = self.resolve(deps)?;
        let order = result.install_order();
        let fetcher = self.fetcher();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_parallel.max(1))
            .build()
            .expect("failed to build install thread pool");

        let packages: Vec<_> = order.iter().filter_map(|name| result.packages.get(name).map(|pkg| (name, pkg))).collect();

        let outcomes: Vec<Result<(String, FetchResult), FetchError>> = pool.install(|| {
            use rayon::prelude::*;
            packages
                .par_iter()
                .map(|(name, pkg)| fetcher.fetch(pkg, false).map(|r| ((*name).clone(), r)))
                .collect()
        });

        let mut report = InstallReport { resolved: result.packages.len(), ..Default::default() };
        let mut hashes = std::collections::HashMap::new();
        for outcome in outcomes {
            let (name, fetch_result) = outcome?;
            if fetch_result.from_cache {
                report.from_cache += 1;
            } else {
                report.fetched += 1;
            }
            info!(package = %name, from_cache = fetch_result.from_cache, "installed package");
            hashes.insert(name, fetch_result.content_hash);
        }

        let mut lockfile = Lockfile::from_resolution(&result, now(), None);
        for (name, hash) in hashes {
            if let Some(locked) = lockfile.packages.get_mut(&name) {
                locked.integrity_hash = Some(hash);
            }
        }
        lockfile.save(&self.config.lockfile_path)?;

        Ok(report)
    }

    /// `clean()` — delegate to the Fetcher's cache eviction.
    pub fn clean(&self) -> Result<usize, ManagerError> {
        Ok(self.fetcher().clean_cache()?)
    }

    /// For every locked package with an `integrity_hash`, re-hash its
    /// current on-disk tree and compare.
    pub fn verify(&self) -> Result<VerifyReport, ManagerError> {
        let lockfile = match self.load_lockfile()? {
            Some(lockfile) => lockfile,
            None => return Ok(VerifyReport::default()),
        };

        let mut report = VerifyReport::default();
        for (name, locked) in &lockfile.packages {
            let Some(expected) = &locked.integrity_hash else { continue };
            match self.path_for_locked(name, locked) {
                Some(path) if path.exists() => {
                    let actual = crate::integrity::hash_directory(&path).map(hash_to_hex).unwrap_or_default();
                    if &actual != expected {
                        report.mismatches.push(name.clone());
                    }
                }
                _ => report.missing.push(name.clone()),
            }
        }
        Ok(report)
    }

    fn path_for_locked(&self, name: &str, locked: &LockedPackage) -> Option<PathBuf> {
        use crate::core::SourceType;
        match locked.source_type {
            SourceType::Path => Some(PathBuf::from(&locked.source_url)),
            _ => {
                let key = crate::fetcher::cache_key(&crate::core::ResolvedPackage::new(
                    name,
                    locked.version.clone(),
                    locked.source_type,
                    locked.source_url.clone(),
                ))?;
                self.fetcher().cache().lookup(&key).map(|e| e.path)
            }
        }
    }
}

fn now() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DependencySource, SourceType};
    use tempfile::TempDir;

    fn path_dep(tmp: &Path, name: &str) -> Dependency {
        Dependency::new(name, DependencySource::Path { path: tmp.to_string_lossy().into_owned() })
    }

    #[test]
    fn install_writes_lockfile_with_single_path_dependency() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("f.txt"), b"hi").unwrap();

        let lockfile_path = tmp.path().join("ovo.lock");
        let cache_dir = tmp.path().join("cache");
        let config = ManagerConfig { lockfile_path: lockfile_path.clone(), cache_dir, ..ManagerConfig::default() };
        let manager = PackageManager::new(config);

        let report = manager.install(&[path_dep(tmp.path(), "demo")]).unwrap();
        assert_eq!(report.resolved, 1);
        assert!(lockfile_path.exists());

        let lockfile = Lockfile::load(&lockfile_path).unwrap();
        assert!(lockfile.has_package("demo"));
    }

    #[test]
    fn verify_reports_missing_when_integrity_hash_points_nowhere() {
        let tmp = TempDir::new().unwrap();
        let lockfile_path = tmp.path().join("ovo.lock");
        let mut lockfile = Lockfile::new();
        lockfile.add_root("ghost");
        lockfile.put_package(
            "ghost",
            LockedPackage {
                version: "1.0.0".into(),
                source_type: SourceType::Git,
                source_url: "https://example.com/ghost.git".into(),
                resolved_hash: Some("deadbeef".into()),
                integrity_hash: Some("abc123".into()),
                dependencies: vec![],
                locked_at: 0,
            },
        );
        lockfile.save(&lockfile_path).unwrap();

        let config = ManagerConfig {
            lockfile_path,
            cache_dir: tmp.path().join("cache"),
            ..ManagerConfig::default()
        };
        let manager = PackageManager::new(config);
        let report = manager.verify().unwrap();
        assert_eq!(report.missing, vec!["ghost".to_string()]);
        assert!(report.mismatches.is_empty());
    }

    #[test]
    fn verify_with_no_lockfile_is_empty() {
        let tmp = TempDir::new().unwrap();
        let config = ManagerConfig {
            lockfile_path: tmp.path().join("ovo.lock"),
            cache_dir: tmp.path().join("cache"),
            ..ManagerConfig::default()
        };
        let manager = PackageManager::new(config);
        let report = manager.verify().unwrap();
        assert!(report.mismatches.is_empty() && report.missing.is_empty());
    }
}
