//! On-disk cache index: `<cache_dir>/index.json` mapping a cache key to
//! `{path, size, fetched_at, source_type}`, with TTL-based eviction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::SourceType;
use crate::fetcher::FetchError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
    pub fetched_at: u64,
    pub source_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheIndex {
    #[serde(default)]
    pub entries: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_bytes: u64,
    pub by_source_type: BTreeMap<String, usize>,
}

/// Owns `<cache_dir>/index.json`. Every read-modify-write of the index
/// goes through `with_index_lock`, the sole shared-mutation point.
pub struct Cache {
    root: PathBuf,
    ttl_secs: u64,
    lock: Mutex<()>,
}

impl Cache {
    pub fn new(root: PathBuf, ttl_secs: u64) -> Self {
        Cache { root, ttl_secs, lock: Mutex::new(()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    pub fn subdir_for(&self, source_type: SourceType) -> PathBuf {
        self.root.join(source_type.as_str())
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn load_index(&self) -> CacheIndex {
        let path = self.index_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => CacheIndex::default(),
        }
    }

    fn save_index(&self, index: &CacheIndex) {
        let path = self.index_path();
        if let Err(e) = std::fs::create_dir_all(&self.root) {
            warn!("failed to create cache root {}: {e}", self.root.display());
            return;
        }
        let tmp = path.with_extension("json.tmp");
        let result = serde_json::to_string_pretty(index)
            .map_err(|e| e.to_string())
            .and_then(|s| std::fs::write(&tmp, s).map_err(|e| e.to_string()))
            .and_then(|_| std::fs::rename(&tmp, &path).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("failed to flush cache index: {e}");
        }
    }

    /// Runs `f` with the current index, persisting whatever it returns.
    /// The load-mutate-save sequence is this struct's entire critical
    /// section; an in-process mutex serializes it so concurrent fetches
    /// from the install worker pool can't clobber each other's writes.
    pub fn with_index_lock<R>(&self, f: impl FnOnce(&mut CacheIndex) -> R) -> R {
        let _guard = self.lock.lock().unwrap();
        let mut index = self.load_index();
        let result = f(&mut index);
        self.save_index(&index);
        result
    }

    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        self.with_index_lock(|index| {
            let entry = index.entries.get(key)?;
            if !entry.path.exists() {
                return None;
            }
            if self.ttl_secs > 0 {
                let age = now_secs().saturating_sub(entry.fetched_at);
                if age > self.ttl_secs {
                    return None;
                }
            }
            Some(entry.clone())
        })
    }

    pub fn record(&self, key: &str, entry: CacheEntry) {
        self.with_index_lock(|index| {
            index.entries.insert(key.to_string(), entry);
        });
    }

    /// Deletes every entry whose age exceeds `ttl` (itself, not `ttl_secs`
    /// — `clean_cache` always purges by the configured TTL regardless of
    /// whether individual lookups are honoring it).
    pub fn clean(&self) -> Result<usize, FetchError> {
        if self.ttl_secs == 0 {
            return Ok(0);
        }
        let mut removed = 0;
        self.with_index_lock(|index| {
            let now = now_secs();
            let expired: Vec<String> = index
                .entries
                .iter()
                .filter(|(_, e)| now.saturating_sub(e.fetched_at) > self.ttl_secs)
                .map(|(k, _)| k.clone())
                .collect();
            for key in &expired {
                if let Some(entry) = index.entries.remove(key) {
                    let _ = std::fs::remove_dir_all(&entry.path);
                    removed += 1;
                }
            }
        });
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        let index = self.load_index();
        let mut stats = CacheStats::default();
        for entry in index.entries.values() {
            stats.total_bytes += entry.size;
            *stats.by_source_type.entry(entry.source_type.clone()).or_insert(0) += 1;
        }
        stats
    }
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn dir_size(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
