//! Test utilities and mocks for ovo unit tests: a scripted `CommandRunner`
//! for source-adapter tests, a mock HTTP client, and an in-memory
//! filesystem, so adapters and the registry client can be exercised
//! without touching real subprocesses or the network.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::registry::{HttpClient, HttpResponse, RegistryError};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// In-memory filesystem for tests that need directory/file state without
/// touching real disk.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: Vec<PathBuf>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        MockFileSystem::default()
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.insert(path, content.into());
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        if self.dirs.contains(&path) {
            return;
        }
        let mut current = path.clone();
        while let Some(parent) = current.parent() {
            if parent.as_os_str().is_empty() {
                break;
            }
            if !self.dirs.contains(&parent.to_path_buf()) {
                self.dirs.push(parent.to_path_buf());
            }
            current = parent.to_path_buf();
        }
        self.dirs.push(path);
    }

    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| anyhow::anyhow!("file not found: {}", path.display()))
    }

    pub fn read_to_string(&self, path: &Path) -> Result<String> {
        String::from_utf8(self.read(path)?).map_err(|e| anyhow::anyhow!("invalid UTF-8: {e}"))
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(&path.to_path_buf())
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(&path.to_path_buf())
    }
}

/// A scripted process result, used by `MockCommandRunner`.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockProcessOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput { status: 0, stdout: stdout.into(), stderr: String::new() }
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput { status, stdout: String::new(), stderr: stderr.into() }
    }

    fn into_output(self) -> Output {
        #[cfg(unix)]
        let status = {
            use std::os::unix::process::ExitStatusExt;
            ExitStatus::from_raw(self.status << 8)
        };
        #[cfg(not(unix))]
        let status = {
            // Best-effort: Windows `ExitStatus` has no public raw constructor
            // outside std, so a successful run always reports status 0 here.
            std::process::Command::new("cmd").arg("/C").arg("exit 0").status().unwrap()
        };
        Output { status, stdout: self.stdout.into_bytes(), stderr: self.stderr.into_bytes() }
    }
}

#[derive(Debug, Clone)]
pub enum CommandPattern {
    Exact(String),
    StartsWith(String),
    Contains(String),
    Any,
}

impl CommandPattern {
    fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Any => true,
        }
    }
}

struct Expectation {
    pattern: CommandPattern,
    output: MockProcessOutput,
}

/// Scripted `CommandRunner`: matches a `ProcessBuilder`'s rendered command
/// line against registered patterns, in registration order, and returns
/// the first match's output. Source adapters (git, archive, vcpkg, conan,
/// system) are exercised against this instead of real subprocesses.
#[derive(Default)]
pub struct MockCommandRunner {
    expectations: Mutex<Vec<Expectation>>,
    calls: Mutex<Vec<String>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        MockCommandRunner::default()
    }

    pub fn expect(&self, cmd: &str, output: MockProcessOutput) -> &Self {
        self.expectations.lock().unwrap().push(Expectation { pattern: CommandPattern::Exact(cmd.to_string()), output });
        self
    }

    pub fn expect_prefix(&self, prefix: &str, output: MockProcessOutput) -> &Self {
        self.expectations
            .lock()
            .unwrap()
            .push(Expectation { pattern: CommandPattern::StartsWith(prefix.to_string()), output });
        self
    }

    pub fn expect_contains(&self, substring: &str, output: MockProcessOutput) -> &Self {
        self.expectations
            .lock()
            .unwrap()
            .push(Expectation { pattern: CommandPattern::Contains(substring.to_string()), output });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(&self, builder: ProcessBuilder) -> Result<Output> {
        let rendered = builder.display_command();
        self.calls.lock().unwrap().push(rendered.clone());

        let expectations = self.expectations.lock().unwrap();
        for exp in expectations.iter() {
            if exp.pattern.matches(&rendered) {
                return Ok(exp.output.clone().into_output());
            }
        }
        bail!("unexpected command: {rendered}")
    }
}

/// Mock HTTP response for registry-client tests.
#[derive(Debug, Clone)]
pub struct MockHttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl MockHttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        MockHttpResponse { status: 200, body: body.into() }
    }

    pub fn not_found() -> Self {
        MockHttpResponse { status: 404, body: b"Not Found".to_vec() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// In-memory HTTP client for tests that need to stand in for a registry
/// endpoint without a live server.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: HashMap<String, MockHttpResponse>,
    requests: Mutex<Vec<String>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        MockHttpClient::default()
    }

    pub fn mock_url(&mut self, url: &str, response: MockHttpResponse) -> &mut Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn get(&self, url: &str) -> Result<MockHttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .iter()
            .find(|(pattern, _)| url == pattern.as_str() || url.starts_with(pattern.as_str()))
            .map(|(_, r)| r.clone())
            .ok_or_else(|| anyhow::anyhow!("no mock response for URL: {url}"))
    }

    pub fn download(&self, url: &str, writer: &mut impl Write) -> Result<u64> {
        let response = self.get(url)?;
        if !response.is_success() {
            bail!("HTTP error {}: {url}", response.status);
        }
        writer.write_all(&response.body)?;
        Ok(response.body.len() as u64)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Clone for MockHttpResponse {
    fn clone(&self) -> Self {
        MockHttpResponse { status: self.status, body: self.body.clone() }
    }
}

/// Lets `RegistryClient::with_http_client` take a `MockHttpClient` directly.
impl HttpClient for MockHttpClient {
    fn get(&self, url: &str, _bearer_token: Option<&str>) -> Result<HttpResponse, RegistryError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .iter()
            .find(|(pattern, _)| url == pattern.as_str() || url.starts_with(pattern.as_str()))
            .map(|(_, r)| HttpResponse { status: r.status, body: r.body.clone() })
            .ok_or_else(|| RegistryError::NetworkError(format!("no mock response for URL: {url}")))
    }
}

pub mod assertions {
    use std::fmt::Debug;

    pub fn assert_ok<T, E: Debug>(result: Result<T, E>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => panic!("expected Ok, got Err: {e:?}"),
        }
    }

    pub fn assert_err<T: Debug, E>(result: Result<T, E>) -> E {
        match result {
            Ok(v) => panic!("expected Err, got Ok: {v:?}"),
            Err(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_filesystem_tracks_files_and_parent_dirs() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/project/ovo.toml", b"offline = true".to_vec());
        assert!(fs.exists(Path::new("/project")));
        assert!(fs.is_dir(Path::new("/project")));
        assert_eq!(fs.read_to_string(Path::new("/project/ovo.toml")).unwrap(), "offline = true");
    }

    #[test]
    fn mock_command_runner_matches_exact_then_falls_through_to_error() {
        let runner = MockCommandRunner::new();
        runner.expect("git rev-parse HEAD", MockProcessOutput::success("abc123\n"));

        let output = runner.run(ProcessBuilder::new("git").arg("rev-parse").arg("HEAD")).unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "abc123");

        assert!(runner.run(ProcessBuilder::new("git").arg("fetch")).is_err());
    }

    #[test]
    fn mock_command_runner_records_calls() {
        let runner = MockCommandRunner::new();
        runner.expect_prefix("git", MockProcessOutput::success(""));
        let _ = runner.run(ProcessBuilder::new("git").arg("status"));
        assert_eq!(runner.calls(), vec!["git status".to_string()]);
    }

    #[test]
    fn mock_http_client_serves_registered_urls() {
        let mut client = MockHttpClient::new();
        client.mock_url("https://registry.example/packages/zlib", MockHttpResponse::ok(b"{}".to_vec()));
        let response = client.get("https://registry.example/packages/zlib").unwrap();
        assert!(response.is_success());
    }
}
