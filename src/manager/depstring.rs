//! Parses the CLI/manifest dependency-string surface forms into a
//! `Dependency`.

use thiserror::Error;

use crate::core::{Dependency, DependencySource};
use crate::sources::name_from_url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DepStringError {
    #[error("empty dependency string")]
    Empty,
    #[error("git dependency string is missing a url: {0}")]
    MissingGitUrl(String),
    #[error("conan dependency string is missing a version: {0}")]
    MissingConanVersion(String),
}

pub fn parse(input: &str) -> Result<Dependency, DepStringError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DepStringError::Empty);
    }

    if let Some(rest) = input.strip_prefix("git:") {
        return parse_git(rest);
    }
    if let Some(rest) = input.strip_prefix("path:") {
        return Ok(parse_path(rest));
    }
    if let Some(rest) = input.strip_prefix("vcpkg:") {
        return Ok(parse_vcpkg(rest));
    }
    if let Some(rest) = input.strip_prefix("conan:") {
        return parse_conan(rest);
    }
    if let Some(rest) = input.strip_prefix("system:") {
        return Ok(parse_system(rest));
    }
    Ok(parse_default(input))
}

fn parse_git(rest: &str) -> Result<Dependency, DepStringError> {
    if rest.is_empty() {
        return Err(DepStringError::MissingGitUrl(rest.to_string()));
    }
    let (url, reference) = match rest.split_once('#') {
        Some((url, r)) => (url.to_string(), Some(r.to_string())),
        None => (rest.to_string(), None),
    };
    let name = name_from_url(&url);
    Ok(Dependency::new(
        name,
        DependencySource::Git { url, reference, subdir: None, submodules: false, auth_token: None },
    ))
}

fn parse_path(rest: &str) -> Dependency {
    let name = std::path::Path::new(rest)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| rest.to_string());
    Dependency::new(name, DependencySource::Path { path: rest.to_string() })
}

fn parse_vcpkg(rest: &str) -> Dependency {
    let (name, features) = match rest.split_once('[') {
        Some((name, tail)) => {
            let feature_list = tail.trim_end_matches(']');
            let features = feature_list.split(',').filter(|s| !s.is_empty()).map(|s| s.to_string()).collect();
            (name.to_string(), features)
        }
        None => (rest.to_string(), Vec::new()),
    };
    Dependency::new(
        name.clone(),
        DependencySource::Vcpkg { name: Some(name), features, triplet: None },
    )
}

fn parse_conan(rest: &str) -> Result<Dependency, DepStringError> {
    if !rest.contains('/') {
        return Err(DepStringError::MissingConanVersion(rest.to_string()));
    }
    let name = rest.split('/').next().unwrap().to_string();
    Ok(Dependency::new(name, DependencySource::Conan { reference: rest.to_string(), options: Vec::new() }))
}

fn parse_system(rest: &str) -> Dependency {
    Dependency::new(
        rest.to_string(),
        DependencySource::System {
            pkg_config_name: Some(rest.to_string()),
            include_paths: Vec::new(),
            library_paths: Vec::new(),
            libraries: Vec::new(),
        },
    )
}

fn parse_default(input: &str) -> Dependency {
    let (name, req) = match input.split_once('@') {
        Some((name, req)) => (name.to_string(), req.to_string()),
        None => (input.to_string(), "*".to_string()),
    };
    Dependency::new(name, DependencySource::Registry { name: None, registry_url: None }).with_version_req(req)
}
