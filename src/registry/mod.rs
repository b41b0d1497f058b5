//! HTTPS JSON registry client.
//!
//! Wire shapes consumed here (`PackageMetadata`, `VersionMetadata`,
//! `SearchResult`) are this crate's own fixed contract for a central
//! registry API — the governing design left the `Registry.request` body
//! unspecified beyond "JSON over HTTPS", so the shapes below are the
//! binding decision for this implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_REGISTRY_URL: &str = "https://registry.ovo.dev";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("package not found: {0}")]
    PackageNotFound(String),

    #[error("version not found: {name}@{requirement}")]
    VersionNotFound { name: String, requirement: String },

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("rate limited")]
    RateLimited,

    #[error("unauthorized")]
    Unauthorized,

    #[error("server error: {0}")]
    ServerError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub version: String,
    #[serde(default)]
    pub yanked: bool,
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    pub requirement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub latest_version: String,
    #[serde(default)]
    pub versions: Vec<VersionMetadata>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub packages: Vec<PackageMetadata>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchParams {
    pub page: usize,
    pub per_page: usize,
}

struct CacheEntry {
    body: Vec<u8>,
    fetched_at: Instant,
}

/// Caches response bytes by request path with a TTL, shared by the live
/// client and offline mirror's lookup path.
struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    fn new(ttl: Duration) -> Self {
        ResponseCache { entries: Mutex::new(HashMap::new()), ttl }
    }

    fn get(&self, path: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(path)?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.body.clone())
    }

    fn put(&self, path: &str, body: Vec<u8>) {
        self.entries
            .lock()
            .unwrap()
            .insert(path.to_string(), CacheEntry { body, fetched_at: Instant::now() });
    }
}

/// A raw HTTP response as `HttpClient` implementations see it: no
/// higher-level registry semantics, just a status code and a body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Seam between `RegistryClient` and the actual transport, the same way
/// `CommandRunner` sits between source adapters and real subprocesses:
/// production code talks to `ReqwestHttpClient`, tests talk to a scripted
/// double.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str, bearer_token: Option<&str>) -> Result<HttpResponse, RegistryError>;
}

/// Default `HttpClient` backed by a real blocking `reqwest` client.
pub struct ReqwestHttpClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        ReqwestHttpClient { inner: reqwest::blocking::Client::new() }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        ReqwestHttpClient::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str, bearer_token: Option<&str>) -> Result<HttpResponse, RegistryError> {
        let mut req = self.inner.get(url);
        if let Some(token) = bearer_token {
            req = req.bearer_auth(token);
        }
        let response = req.send().map_err(|e| RegistryError::NetworkError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| RegistryError::NetworkError(e.to_string()))?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Single HTTPS client: one `request(path)` routine consults the cache,
/// composes `base_url + path`, issues a GET through the configured
/// `HttpClient` with an optional bearer token, and returns the raw body.
pub struct RegistryClient {
    base_url: String,
    token: Option<String>,
    cache: ResponseCache,
    http: Arc<dyn HttpClient>,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        RegistryClient {
            base_url: base_url.into(),
            token: None,
            cache: ResponseCache::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            http: Arc::new(ReqwestHttpClient::new()),
        }
    }

    pub fn default_url() -> &'static str {
        DEFAULT_REGISTRY_URL
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the transport, e.g. with a scripted double in tests.
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    fn request(&self, path: &str) -> Result<Vec<u8>, RegistryError> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(cached);
        }

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self.http.get(&url, self.token.as_deref())?;

        match response.status {
            404 => Err(RegistryError::PackageNotFound(path.to_string())),
            429 => Err(RegistryError::RateLimited),
            401 | 403 => Err(RegistryError::Unauthorized),
            200..=299 => {
                self.cache.put(path, response.body.clone());
                Ok(response.body)
            }
            other => Err(RegistryError::ServerError(other.to_string())),
        }
    }

    pub fn get_package(&self, name: &str) -> Result<PackageMetadata, RegistryError> {
        let body = self.request(&format!("/packages/{name}"))?;
        serde_json::from_slice(&body).map_err(|e| RegistryError::ServerError(e.to_string()))
    }

    pub fn get_version(&self, name: &str, version: &str) -> Result<VersionMetadata, RegistryError> {
        let pkg = self.get_package(name)?;
        pkg.versions
            .into_iter()
            .find(|v| v.version == version)
            .ok_or_else(|| RegistryError::VersionNotFound { name: name.to_string(), requirement: version.to_string() })
    }

    pub fn search(&self, query: &str, params: SearchParams) -> Result<SearchResult, RegistryError> {
        let page = if params.page == 0 { 1 } else { params.page };
        let per_page = if params.per_page == 0 { 25 } else { params.per_page };
        let body = self.request(&format!("/search?q={query}&page={page}&per_page={per_page}"))?;
        serde_json::from_slice(&body).map_err(|e| RegistryError::ServerError(e.to_string()))
    }

    /// See spec: "latest"/"*" → latest_version; exact match; `^`/`~` scan
    /// against `resolver::version::matches`; otherwise `VersionNotFound`.
    pub fn resolve_version(&self, name: &str, requirement: &str) -> Result<String, RegistryError> {
        let pkg = self.get_package(name)?;
        resolve_version_against(&pkg, requirement)
    }
}

fn resolve_version_against(pkg: &PackageMetadata, requirement: &str) -> Result<String, RegistryError> {
    if requirement == "latest" || requirement == "*" {
        return Ok(pkg.latest_version.clone());
    }
    if pkg.versions.iter().any(|v| v.version == requirement && !v.yanked) {
        return Ok(requirement.to_string());
    }
    if requirement.starts_with('^') || requirement.starts_with('~') {
        let found = pkg
            .versions
            .iter()
            .filter(|v| !v.yanked)
            .find(|v| crate::resolver::version::matches(requirement, &v.version));
        if let Some(v) = found {
            return Ok(v.version.clone());
        }
    }
    Err(RegistryError::VersionNotFound { name: pkg.name.clone(), requirement: requirement.to_string() })
}

/// Offline mirror: same public surface minus network-dependent operations,
/// reading a pre-fetched index of `PackageMetadata` from disk.
pub struct OfflineRegistry {
    index: HashMap<String, PackageMetadata>,
}

impl OfflineRegistry {
    pub fn load(index_dir: &Path) -> Result<Self, RegistryError> {
        let index_path = index_dir.join("index.json");
        let bytes = std::fs::read(&index_path)
            .map_err(|e| RegistryError::ServerError(format!("{}: {e}", index_path.display())))?;
        let packages: Vec<PackageMetadata> =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::ServerError(e.to_string()))?;
        Ok(OfflineRegistry { index: packages.into_iter().map(|p| (p.name.clone(), p)).collect() })
    }

    pub fn get_package(&self, name: &str) -> Result<PackageMetadata, RegistryError> {
        self.index.get(name).cloned().ok_or_else(|| RegistryError::PackageNotFound(name.to_string()))
    }

    pub fn resolve_version(&self, name: &str, requirement: &str) -> Result<String, RegistryError> {
        let pkg = self.get_package(name)?;
        resolve_version_against(&pkg, requirement)
    }
}

pub fn default_index_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("registry-index")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package() -> PackageMetadata {
        PackageMetadata {
            name: "zlib".into(),
            latest_version: "1.3.1".into(),
            description: None,
            versions: vec![
                VersionMetadata { version: "1.2.11".into(), yanked: false, dependencies: vec![] },
                VersionMetadata { version: "1.3.0".into(), yanked: true, dependencies: vec![] },
                VersionMetadata { version: "1.3.1".into(), yanked: false, dependencies: vec![] },
            ],
        }
    }

    #[test]
    fn resolves_latest_and_wildcard() {
        let pkg = sample_package();
        assert_eq!(resolve_version_against(&pkg, "latest").unwrap(), "1.3.1");
        assert_eq!(resolve_version_against(&pkg, "*").unwrap(), "1.3.1");
    }

    #[test]
    fn resolves_exact_match_but_not_yanked() {
        let pkg = sample_package();
        assert_eq!(resolve_version_against(&pkg, "1.2.11").unwrap(), "1.2.11");
        assert!(resolve_version_against(&pkg, "1.3.0").is_err());
    }

    #[test]
    fn resolves_caret_requirement_skipping_yanked() {
        let pkg = sample_package();
        let resolved = resolve_version_against(&pkg, "^1.3").unwrap();
        assert_eq!(resolved, "1.3.1");
    }

    #[test]
    fn unresolvable_requirement_is_version_not_found() {
        let pkg = sample_package();
        assert!(resolve_version_against(&pkg, "2.0.0").is_err());
    }

    #[test]
    fn response_cache_respects_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.put("/packages/zlib", b"cached".to_vec());
        assert_eq!(cache.get("/packages/zlib"), Some(b"cached".to_vec()));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("/packages/zlib"), None);
    }

    #[test]
    fn get_package_parses_response_from_mock_transport() {
        use crate::test_support::{MockHttpClient, MockHttpResponse};

        let mut mock = MockHttpClient::new();
        mock.mock_url(
            "https://registry.ovo.dev/packages/zlib",
            MockHttpResponse::ok(serde_json::to_vec(&sample_package()).unwrap()),
        );

        let client = RegistryClient::new("https://registry.ovo.dev").with_http_client(Arc::new(mock));
        let pkg = client.get_package("zlib").unwrap();
        assert_eq!(pkg.latest_version, "1.3.1");
    }

    #[test]
    fn get_package_maps_404_to_package_not_found() {
        use crate::test_support::{MockHttpClient, MockHttpResponse};

        let mut mock = MockHttpClient::new();
        mock.mock_url("https://registry.ovo.dev/packages/missing", MockHttpResponse::not_found());

        let client = RegistryClient::new("https://registry.ovo.dev").with_http_client(Arc::new(mock));
        let err = client.get_package("missing").unwrap_err();
        assert!(matches!(err, RegistryError::PackageNotFound(_)));
    }
}
