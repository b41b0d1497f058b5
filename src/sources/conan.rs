//! Conan source adapter: shells out to the `conan` CLI to install a
//! reference and reads back its generated dependency graph.
//!
//! BuildInfo is parsed first from `conanbuildinfo.json` (the JSON generator
//! output, `dependencies[*]` giving include_paths/lib_paths/libs/defines),
//! falling back to grep-parsing `conan_toolchain.cmake`'s `set(..._XXX ...)`
//! lines when the JSON generator wasn't produced.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::{BuildConfig, ResolvedPackage, SourceType};
use crate::sources::{AdapterFetchResult, SourceContext, SourceError};
use crate::util::process::ProcessBuilder;

/// A parsed `name/version[@user/channel]` conan reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConanReference {
    pub name: String,
    pub version: String,
    pub user: Option<String>,
    pub channel: Option<String>,
}

impl ConanReference {
    pub fn parse(reference: &str) -> Self {
        let (base, user_channel) = match reference.split_once('@') {
            Some((base, rest)) => (base, Some(rest)),
            None => (reference, None),
        };

        let mut parts = base.splitn(2, '/');
        let name = parts.next().unwrap_or_default().to_string();
        let version = parts.next().unwrap_or("unknown").to_string();

        let (user, channel) = match user_channel {
            Some(uc) => {
                let mut uc_parts = uc.splitn(2, '/');
                (uc_parts.next().map(str::to_string), uc_parts.next().map(str::to_string))
            }
            None => (None, None),
        };

        ConanReference { name, version, user, channel }
    }
}

impl std::fmt::Display for ConanReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let (Some(user), Some(channel)) = (&self.user, &self.channel) {
            write!(f, "@{user}/{channel}")?;
        }
        Ok(())
    }
}

pub fn resolve(reference: &str, options: &[String], ctx: &SourceContext) -> Result<ResolvedPackage, SourceError> {
    let parsed = ConanReference::parse(reference);

    if crate::util::process::find_executable("conan").is_none() {
        return Err(SourceError::ConanNotFound);
    }

    let output_dir = output_dir_for(ctx, &parsed);
    std::fs::create_dir_all(&output_dir).map_err(|e| SourceError::InstallFailed(e.to_string()))?;

    let mut builder = ProcessBuilder::new("conan")
        .arg("install")
        .arg(reference)
        .arg("--build=missing")
        .arg("-of")
        .arg(&output_dir);
    for opt in options {
        builder = builder.arg("-o").arg(opt);
    }
    if let Some(home) = &ctx.conan_user_home {
        builder = builder.env("CONAN_USER_HOME", home.to_string_lossy());
    }

    let output = ctx.runner.run(builder).map_err(|e| SourceError::InstallFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::InstallFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }

    let build_config = read_build_info(&output_dir).unwrap_or_default();

    Ok(ResolvedPackage::new(parsed.name.clone(), parsed.version.clone(), SourceType::Conan, reference)
        .with_build_config(build_config))
}

pub fn fetch(pkg: &ResolvedPackage, _dest: &Path) -> Result<AdapterFetchResult, SourceError> {
    Ok(AdapterFetchResult { path: std::path::PathBuf::from(&pkg.source_url), resolved_ref: None })
}

fn output_dir_for(ctx: &SourceContext, reference: &ConanReference) -> PathBuf {
    let base = ctx.conan_user_home.clone().unwrap_or_else(std::env::temp_dir);
    base.join("ovo-conan").join(format!("{}-{}", reference.name, reference.version))
}

#[derive(Debug, Deserialize)]
struct ConanBuildInfo {
    dependencies: Vec<ConanDependencyInfo>,
}

#[derive(Debug, Deserialize)]
struct ConanDependencyInfo {
    #[serde(default)]
    include_paths: Vec<String>,
    #[serde(default)]
    lib_paths: Vec<String>,
    #[serde(default)]
    libs: Vec<String>,
    #[serde(default)]
    defines: Vec<String>,
}

fn read_build_info(output_dir: &Path) -> Option<BuildConfig> {
    let json_path = output_dir.join("conanbuildinfo.json");
    if let Ok(contents) = std::fs::read_to_string(&json_path) {
        if let Some(config) = parse_build_info_json(&contents) {
            return Some(config);
        }
    }

    let cmake_path = output_dir.join("conan_toolchain.cmake");
    std::fs::read_to_string(&cmake_path).ok().map(|contents| parse_toolchain_cmake(&contents))
}

fn parse_build_info_json(contents: &str) -> Option<BuildConfig> {
    let info: ConanBuildInfo = serde_json::from_str(contents).ok()?;
    let mut config = BuildConfig::default();
    for dep in info.dependencies {
        config.include_dirs.extend(dep.include_paths);
        config.lib_dirs.extend(dep.lib_paths);
        config.libraries.extend(dep.libs);
        config.defines.extend(dep.defines);
    }
    Some(config)
}

/// Grep-fallback: scans `set(<PREFIX>_INCLUDE_DIRS "...")`-style cmake
/// variable assignments for the dir/lib lists conan's JSON generator would
/// otherwise have supplied.
fn parse_toolchain_cmake(contents: &str) -> BuildConfig {
    let mut config = BuildConfig::default();
    for line in contents.lines() {
        let line = line.trim();
        if let Some(values) = extract_set_values(line, "_INCLUDE_DIRS") {
            config.include_dirs.extend(values);
        } else if let Some(values) = extract_set_values(line, "_LIBRARY_DIRS") {
            config.lib_dirs.extend(values);
        } else if let Some(values) = extract_set_values(line, "_LIBRARIES") {
            config.libraries.extend(values);
        } else if let Some(values) = extract_set_values(line, "_COMPILE_DEFINITIONS") {
            config.defines.extend(values);
        }
    }
    config
}

fn extract_set_values(line: &str, var_suffix: &str) -> Option<Vec<String>> {
    let inner = line.strip_prefix("set(")?.strip_suffix(')')?;
    let (var, rest) = inner.split_once(char::is_whitespace)?;
    if !var.ends_with(var_suffix) {
        return None;
    }
    let values: Vec<String> = rest
        .split_whitespace()
        .map(|s| s.trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_splits_name_version_user_and_channel() {
        let reference = ConanReference::parse("openssl/3.0.0@_/_");
        assert_eq!(reference.name, "openssl");
        assert_eq!(reference.version, "3.0.0");
        assert_eq!(reference.user.as_deref(), Some("_"));
        assert_eq!(reference.channel.as_deref(), Some("_"));
        assert_eq!(reference.to_string(), "openssl/3.0.0@_/_");
    }

    #[test]
    fn reference_without_user_channel_round_trips_without_at_sign() {
        let reference = ConanReference::parse("zlib/1.3.1");
        assert_eq!(reference.name, "zlib");
        assert_eq!(reference.version, "1.3.1");
        assert_eq!(reference.user, None);
        assert_eq!(reference.channel, None);
        assert_eq!(reference.to_string(), "zlib/1.3.1");
    }

    #[test]
    fn build_info_json_aggregates_all_dependencies() {
        let json = r#"{
            "dependencies": [
                {"include_paths": ["/a/include"], "lib_paths": ["/a/lib"], "libs": ["a"], "defines": ["A_STATIC"]},
                {"include_paths": ["/b/include"], "lib_paths": ["/b/lib"], "libs": ["b"], "defines": []}
            ]
        }"#;
        let config = parse_build_info_json(json).unwrap();
        assert_eq!(config.include_dirs, vec!["/a/include", "/b/include"]);
        assert_eq!(config.lib_dirs, vec!["/a/lib", "/b/lib"]);
        assert_eq!(config.libraries, vec!["a", "b"]);
        assert_eq!(config.defines, vec!["A_STATIC"]);
    }

    #[test]
    fn toolchain_cmake_fallback_parses_set_statements() {
        let cmake = r#"
            set(ZLIB_INCLUDE_DIRS "/usr/include/zlib")
            set(ZLIB_LIBRARY_DIRS "/usr/lib")
            set(ZLIB_LIBRARIES "z")
        "#;
        let config = parse_toolchain_cmake(cmake);
        assert_eq!(config.include_dirs, vec!["/usr/include/zlib"]);
        assert_eq!(config.lib_dirs, vec!["/usr/lib"]);
        assert_eq!(config.libraries, vec!["z"]);
    }

    #[test]
    fn resolve_without_conan_binary_reports_conan_not_found() {
        let ctx = SourceContext::new(std::sync::Arc::new(crate::util::process::RealCommandRunner));
        if crate::util::process::find_executable("conan").is_none() {
            let err = resolve("openssl/3.0.0@_/_", &[], &ctx).unwrap_err();
            assert!(matches!(err, SourceError::ConanNotFound));
        }
    }
}
