//! Path source adapter: local filesystem dependencies, used unmodified
//! from wherever they already sit on disk.

use std::path::{Path, PathBuf};

use crate::core::{BuildConfig, ResolvedPackage, SourceType};
use crate::sources::{AdapterFetchResult, SourceError};

pub fn resolve(name: &str, version_req: &str, path: &Path) -> Result<ResolvedPackage, SourceError> {
    if !path.exists() {
        return Err(SourceError::PathNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(SourceError::NotADirectory(path.to_path_buf()));
    }

    let canonical = std::fs::canonicalize(path).map_err(|_| SourceError::AccessDenied(path.to_path_buf()))?;
    check_no_symlink_loop(&canonical)?;

    let version = if version_req == "*" { "local".to_string() } else { version_req.to_string() };

    Ok(
        ResolvedPackage::new(name, version, SourceType::Path, canonical.to_string_lossy().into_owned())
            .with_build_config(BuildConfig::default()),
    )
}

pub fn fetch(pkg: &ResolvedPackage, _dest: &Path) -> Result<AdapterFetchResult, SourceError> {
    let source = PathBuf::from(&pkg.source_url);
    if !source.exists() {
        return Err(SourceError::PathNotFound(source));
    }
    // Path dependencies are used in place; nothing is copied into the cache.
    Ok(AdapterFetchResult { path: source, resolved_ref: None })
}

fn check_no_symlink_loop(path: &Path) -> Result<(), SourceError> {
    let mut seen = std::collections::HashSet::new();
    let mut current = path.to_path_buf();
    loop {
        if !seen.insert(current.clone()) {
            return Err(SourceError::SymlinkLoop(path.to_path_buf()));
        }
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                current = std::fs::read_link(&current).map_err(|_| SourceError::AccessDenied(current.clone()))?;
            }
            _ => break,
        }
        if seen.len() > 64 {
            return Err(SourceError::SymlinkLoop(path.to_path_buf()));
        }
    }
    Ok(())
}
