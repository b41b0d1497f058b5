//! Git source adapter.
//!
//! Shells out to the `git` binary via `CommandRunner` rather than linking
//! `git2` — the clone/fetch/checkout/ls-remote sequence below mirrors the
//! teacher crate's `GitSource`, just driven through subprocesses instead of
//! libgit2 bindings.

use std::path::Path;

use crate::core::{BuildConfig, ResolvedPackage, SourceType};
use crate::sources::{AdapterFetchResult, SourceContext, SourceError};
use crate::util::process::ProcessBuilder;

const DEFAULT_SHALLOW_DEPTH: u32 = 1;

/// A 40-char hex string is treated as a commit id rather than a branch/tag.
pub fn is_commit_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Injects an auth token into an https URL as `https://<token>@host/...`.
pub fn inject_auth_token(url: &str, token: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("https://{token}@{rest}")
    } else {
        url.to_string()
    }
}

pub fn resolve(
    name: &str,
    url: &str,
    reference: Option<&str>,
    _subdir: Option<&str>,
    submodules: bool,
    auth_token: Option<&str>,
    ctx: &SourceContext,
) -> Result<ResolvedPackage, SourceError> {
    let version = reference.unwrap_or("HEAD").to_string();
    let probe_url = match auth_token {
        Some(token) => inject_auth_token(url, token),
        None => url.to_string(),
    };

    let resolved_hash = match reference {
        Some(r) if is_commit_hash(r) => r.to_string(),
        Some(r) => resolve_ref(&probe_url, r, ctx)?,
        None => resolve_ref(&probe_url, "HEAD", ctx)?,
    };

    let mut pkg = ResolvedPackage::new(name, version, SourceType::Git, url)
        .with_resolved_hash(resolved_hash)
        .with_build_config(BuildConfig::default())
        .with_submodules(submodules);
    if let Some(token) = auth_token {
        pkg = pkg.with_auth_token(token);
    }
    Ok(pkg)
}

pub fn fetch(pkg: &ResolvedPackage, dest: &Path, ctx: &SourceContext) -> Result<AdapterFetchResult, SourceError> {
    let reference = if pkg.version != "HEAD" { Some(pkg.version.as_str()) } else { None };
    let use_branch_flag = matches!(reference, Some(r) if !is_commit_hash(r));
    let clone_url = match &pkg.auth_token {
        Some(token) => inject_auth_token(&pkg.source_url, token),
        None => pkg.source_url.clone(),
    };

    let mut builder = ProcessBuilder::new("git")
        .arg("clone")
        .arg("--depth")
        .arg(DEFAULT_SHALLOW_DEPTH.to_string());
    if use_branch_flag {
        builder = builder.arg("--branch").arg(reference.unwrap());
    }
    builder = builder.arg(&clone_url).arg(dest);

    let output = ctx
        .runner
        .run(builder)
        .map_err(|e| SourceError::CloneFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::CloneFailed(stderr_of(&output)));
    }

    if let Some(hash) = reference.filter(|r| is_commit_hash(r)) {
        let fetch_output = ctx
            .runner
            .run(
                ProcessBuilder::new("git")
                    .arg("-C")
                    .arg(dest)
                    .arg("fetch")
                    .arg("--depth")
                    .arg("1")
                    .arg("origin")
                    .arg(hash),
            )
            .map_err(|e| SourceError::FetchFailed(e.to_string()))?;
        if !fetch_output.status.success() {
            return Err(SourceError::FetchFailed(stderr_of(&fetch_output)));
        }

        let checkout_output = ctx
            .runner
            .run(ProcessBuilder::new("git").arg("-C").arg(dest).arg("checkout").arg(hash))
            .map_err(|e| SourceError::CheckoutFailed(e.to_string()))?;
        if !checkout_output.status.success() {
            return Err(SourceError::CheckoutFailed(stderr_of(&checkout_output)));
        }
    }

    if pkg.submodules {
        update_submodules(dest, true, ctx)?;
    }

    let resolved = get_head(dest, ctx)?;
    Ok(AdapterFetchResult {
        path: dest.to_path_buf(),
        resolved_ref: Some(resolved),
    })
}

/// `git submodule update --init [--recursive]`.
pub fn update_submodules(repo: &Path, recursive: bool, ctx: &SourceContext) -> Result<(), SourceError> {
    let mut builder = ProcessBuilder::new("git")
        .arg("-C")
        .arg(repo)
        .arg("submodule")
        .arg("update")
        .arg("--init");
    if recursive {
        builder = builder.arg("--recursive");
    }
    let output = ctx
        .runner
        .run(builder)
        .map_err(|e| SourceError::SubmoduleFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::SubmoduleFailed(stderr_of(&output)));
    }
    Ok(())
}

pub fn get_head(repo: &Path, ctx: &SourceContext) -> Result<String, SourceError> {
    let output = ctx
        .runner
        .run(
            ProcessBuilder::new("git")
                .arg("-C")
                .arg(repo)
                .arg("rev-parse")
                .arg("HEAD"),
        )
        .map_err(|e| SourceError::CommandFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::CommandFailed(stderr_of(&output)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `git ls-remote <url> <ref>`; returns the first 40-char hash or `RefNotFound`.
pub fn resolve_ref(url: &str, reference: &str, ctx: &SourceContext) -> Result<String, SourceError> {
    let output = ctx
        .runner
        .run(ProcessBuilder::new("git").arg("ls-remote").arg(url).arg(reference))
        .map_err(|e| SourceError::CommandFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::CommandFailed(stderr_of(&output)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .next()
        .and_then(|line| line.split('\t').next())
        .filter(|hash| is_commit_hash(hash))
        .map(|s| s.to_string())
        .ok_or_else(|| SourceError::RefNotFound(reference.to_string()))
}

/// `git ls-remote --tags <url>`; returns `(hash, tag_name)` pairs with the
/// `refs/tags/` prefix stripped.
pub fn list_tags(url: &str, ctx: &SourceContext) -> Result<Vec<(String, String)>, SourceError> {
    list_refs(url, "--tags", "refs/tags/", ctx)
}

/// `git ls-remote --heads <url>`; returns `(hash, branch_name)` pairs with
/// the `refs/heads/` prefix stripped.
pub fn list_branches(url: &str, ctx: &SourceContext) -> Result<Vec<(String, String)>, SourceError> {
    list_refs(url, "--heads", "refs/heads/", ctx)
}

fn list_refs(
    url: &str,
    mode_flag: &str,
    strip_prefix: &str,
    ctx: &SourceContext,
) -> Result<Vec<(String, String)>, SourceError> {
    let output = ctx
        .runner
        .run(ProcessBuilder::new("git").arg("ls-remote").arg(mode_flag).arg(url))
        .map_err(|e| SourceError::CommandFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::CommandFailed(stderr_of(&output)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_ls_remote(&stdout)
        .into_iter()
        .map(|(hash, reference)| (hash, reference.trim_start_matches(strip_prefix).to_string()))
        .collect())
}

/// Parses `git ls-remote --tags|--heads` output into `(hash, ref_name)`
/// pairs, stripping dereferenced `^{}` tag entries.
pub fn parse_ls_remote(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter(|line| !line.ends_with("^{}"))
        .filter_map(|line| {
            let mut parts = line.splitn(2, '\t');
            let hash = parts.next()?.to_string();
            let reference = parts.next()?.to_string();
            Some((hash, reference))
        })
        .collect()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
