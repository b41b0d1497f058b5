//! Fetcher: given a `ResolvedPackage`, produces a local filesystem path
//! plus its content hash, consulting the on-disk `Cache` before invoking
//! a source adapter.

pub mod cache;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

pub use cache::{Cache, CacheEntry, CacheStats};

use crate::core::{ResolvedPackage, SourceType};
use crate::integrity::{hash_directory, hash_to_hex, IntegrityError};
use crate::sources::{self, SourceContext, SourceError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub path: PathBuf,
    pub content_hash: String,
    pub resolved_ref: Option<String>,
    pub from_cache: bool,
}

/// Derives the cache key for a resolved package per source type. `path`
/// and `system` packages have no cache key (`None`): path fetches resolve
/// in place and system packages have no fetched content.
pub fn cache_key(pkg: &ResolvedPackage) -> Option<String> {
    match pkg.source_type {
        SourceType::Git => Some(match &pkg.resolved_hash {
            Some(hash) => format!("git:{}@{}", pkg.source_url, hash),
            None => format!("git:{}", pkg.source_url),
        }),
        SourceType::Archive => pkg.resolved_hash.as_ref().map(|h| format!("archive:{h}")),
        SourceType::Path => None,
        SourceType::Vcpkg => Some(format!("vcpkg:{}@{}", pkg.name, pkg.version)),
        SourceType::Conan => Some(format!("conan:{}", pkg.source_url)),
        SourceType::System => None,
        SourceType::Registry => Some(format!("registry:{}@{}", pkg.name, pkg.version)),
    }
}

pub struct Fetcher {
    cache: Cache,
    ctx: SourceContext,
}

impl Fetcher {
    pub fn new(cache_dir: PathBuf, cache_ttl_secs: u64, ctx: SourceContext) -> Self {
        Fetcher { cache: Cache::new(cache_dir, cache_ttl_secs), ctx }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn fetch(&self, pkg: &ResolvedPackage, force: bool) -> Result<FetchResult, FetchError> {
        if self.ctx.offline && pkg.source_type != SourceType::Path {
            if let Some(key) = cache_key(pkg) {
                if let Some(entry) = self.cache.lookup(&key) {
                    return Ok(self.result_from_cache_entry(entry, pkg, true));
                }
            }
            return Err(FetchError::Source(SourceError::NetworkError(format!(
                "fetching `{}` requires network access while offline",
                pkg.name
            ))));
        }

        let key = cache_key(pkg);
        if !force {
            if let Some(key) = &key {
                if let Some(entry) = self.cache.lookup(key) {
                    return Ok(self.result_from_cache_entry(entry, pkg, true));
                }
            }
        }

        let dest = match pkg.source_type {
            SourceType::Path => PathBuf::new(), // adapter returns the real path; dest unused
            _ => self.unique_dest(pkg),
        };
        if pkg.source_type != SourceType::Path {
            std::fs::create_dir_all(&dest).map_err(|e| FetchError::Io(e.to_string()))?;
        }

        let adapter_result = sources::fetch(pkg, &dest, &self.ctx)?;
        let content_hash = hash_to_hex(hash_directory(&adapter_result.path)?);

        // Archive packages with no pre-supplied hash have no cache key
        // until the content is actually downloaded; derive one now from
        // what was just fetched instead of bypassing the cache forever.
        let key = key.or_else(|| {
            (pkg.source_type == SourceType::Archive).then(|| format!("archive:{content_hash}"))
        });

        if let Some(key) = &key {
            let size = cache::dir_size(&adapter_result.path);
            self.cache.record(
                key,
                CacheEntry {
                    path: adapter_result.path.clone(),
                    size,
                    fetched_at: cache::now_secs(),
                    source_type: pkg.source_type.as_str().to_string(),
                },
            );
            info!(package = %pkg.name, key = %key, "fetched and cached package");
        }

        Ok(FetchResult {
            path: adapter_result.path,
            content_hash,
            resolved_ref: adapter_result.resolved_ref,
            from_cache: false,
        })
    }

    pub fn clean_cache(&self) -> Result<usize, FetchError> {
        self.cache.clean()
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn unique_dest(&self, pkg: &ResolvedPackage) -> PathBuf {
        let subdir = self.cache.subdir_for(pkg.source_type);
        let timestamp = cache::now_secs();
        subdir.join(format!("{}-{}-{timestamp}", pkg.source_type.as_str(), pkg.name))
    }

    fn result_from_cache_entry(&self, entry: CacheEntry, pkg: &ResolvedPackage, from_cache: bool) -> FetchResult {
        let content_hash = hash_directory(&entry.path)
            .map(hash_to_hex)
            .unwrap_or_else(|e| {
                warn!("failed to hash cached directory for {}: {e}", pkg.name);
                String::new()
            });
        FetchResult { path: entry.path, content_hash, resolved_ref: pkg.resolved_hash.clone(), from_cache }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_ctx() -> SourceContext {
        SourceContext::new(Arc::new(crate::util::process::RealCommandRunner))
    }

    #[test]
    fn cache_key_for_git_includes_hash_when_present() {
        let pkg = ResolvedPackage::new("foo", "1.0", SourceType::Git, "https://host/foo.git")
            .with_resolved_hash("abc123");
        assert_eq!(cache_key(&pkg).unwrap(), "git:https://host/foo.git@abc123");
    }

    #[test]
    fn cache_key_for_path_is_none() {
        let pkg = ResolvedPackage::new("foo", "local", SourceType::Path, "/some/path");
        assert!(cache_key(&pkg).is_none());
    }

    #[test]
    fn fetch_of_path_package_skips_cache_and_reads_directly() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("f.txt"), b"hello").unwrap();

        let fetcher = Fetcher::new(tmp.path().join("cache"), 0, test_ctx());
        let pkg = ResolvedPackage::new("foo", "local", SourceType::Path, tmp.path().to_string_lossy())
            .with_build_config(BuildConfig::default());

        let result = fetcher.fetch(&pkg, false).unwrap();
        assert!(!result.from_cache);
        assert!(!result.content_hash.is_empty());
    }

    #[test]
    fn fetch_of_hashless_archive_still_gets_cached_post_download() {
        use crate::test_support::{MockCommandRunner, MockProcessOutput};

        let runner = MockCommandRunner::new();
        runner.expect_prefix("curl", MockProcessOutput::success(""));
        runner.expect_prefix("tar", MockProcessOutput::success(""));
        let ctx = SourceContext::new(Arc::new(runner));

        let tmp = TempDir::new().unwrap();
        let fetcher = Fetcher::new(tmp.path().join("cache"), 0, ctx);

        let pkg = ResolvedPackage::new("mylib", "1.0", SourceType::Archive, "https://example.com/mylib-1.0.tar.gz");
        assert!(cache_key(&pkg).is_none());

        // `archive::fetch`'s downloads dir sits alongside the per-fetch
        // destination: `<cache_root>/archive/downloads`, independent of
        // the destination's timestamped leaf name.
        let downloads_dir = tmp.path().join("cache").join("archive").join("downloads");
        std::fs::create_dir_all(&downloads_dir).unwrap();
        std::fs::write(downloads_dir.join("mylib.download"), "archive bytes").unwrap();

        let result = fetcher.fetch(&pkg, false).unwrap();
        assert!(!result.from_cache);

        let derived_key = format!("archive:{}", result.content_hash);
        assert!(fetcher.cache().lookup(&derived_key).is_some());
    }

    #[test]
    fn offline_fetch_of_non_cached_git_package_is_network_error() {
        let tmp = TempDir::new().unwrap();
        let ctx = SourceContext { offline: true, ..test_ctx() };
        let fetcher = Fetcher::new(tmp.path().join("cache"), 0, ctx);
        let pkg = ResolvedPackage::new("foo", "1.0", SourceType::Git, "https://host/foo.git");

        let err = fetcher.fetch(&pkg, false).unwrap_err();
        assert!(matches!(err, FetchError::Source(SourceError::NetworkError(_))));
    }
}
