//! Archive source adapter: downloads a tarball/zip via `curl` and extracts
//! it via `tar`/`unzip`, per the Non-goal against linking native archive
//! libraries.

use std::path::Path;

use crate::core::{BuildConfig, ResolvedPackage, SourceType};
use crate::integrity::{hash_file, hash_to_hex};
use crate::sources::{AdapterFetchResult, SourceContext, SourceError};
use crate::util::process::ProcessBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarBz2,
    Tar,
    Zip,
}

pub fn detect_format(url: &str) -> Result<ArchiveFormat, SourceError> {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        Ok(ArchiveFormat::TarGz)
    } else if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
        Ok(ArchiveFormat::TarXz)
    } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") {
        Ok(ArchiveFormat::TarBz2)
    } else if lower.ends_with(".tar") {
        Ok(ArchiveFormat::Tar)
    } else if lower.ends_with(".zip") {
        Ok(ArchiveFormat::Zip)
    } else {
        Err(SourceError::UnsupportedFormat(url.to_string()))
    }
}

/// Composes canonical GitHub/GitLab release and source-archive URLs.
pub struct UrlBuilder;

impl UrlBuilder {
    pub fn github_release_asset(owner: &str, repo: &str, tag: &str, asset: &str) -> String {
        format!("https://github.com/{owner}/{repo}/releases/download/{tag}/{asset}")
    }

    pub fn github_source_tarball(owner: &str, repo: &str, reference: &str) -> String {
        format!("https://github.com/{owner}/{repo}/archive/refs/tags/{reference}.tar.gz")
    }

    pub fn gitlab_source_tarball(owner: &str, repo: &str, reference: &str) -> String {
        format!("https://gitlab.com/{owner}/{repo}/-/archive/{reference}/{repo}-{reference}.tar.gz")
    }
}

pub fn resolve(
    name: &str,
    version_req: &str,
    url: &str,
    hash: Option<&str>,
    _strip_prefix: Option<&str>,
) -> Result<ResolvedPackage, SourceError> {
    detect_format(url)?;
    let version = if version_req == "*" { "unknown".to_string() } else { version_req.to_string() };

    let pkg = ResolvedPackage::new(name, version, SourceType::Archive, url)
        .with_build_config(BuildConfig::default());
    Ok(match hash {
        Some(h) => pkg.with_resolved_hash(h),
        None => pkg,
    })
}

pub fn fetch(pkg: &ResolvedPackage, dest: &Path, ctx: &SourceContext) -> Result<AdapterFetchResult, SourceError> {
    let format = detect_format(&pkg.source_url)?;

    let downloads_dir = dest.parent().unwrap_or(dest).join("downloads");
    std::fs::create_dir_all(&downloads_dir)
        .map_err(|e| SourceError::DownloadFailed(e.to_string()))?;
    let tmp_archive = downloads_dir.join(format!("{}.download", pkg.name));

    let download_result = download(&pkg.source_url, &tmp_archive, ctx);
    if let Err(e) = &download_result {
        let _ = std::fs::remove_file(&tmp_archive);
        return Err(SourceError::DownloadFailed(e.to_string()));
    }

    if let Some(expected_hex) = &pkg.resolved_hash {
        let actual = hash_file(&tmp_archive).map_err(|e| SourceError::InvalidArchive(e.to_string()))?;
        let actual_hex = hash_to_hex(actual);
        if &actual_hex != expected_hex {
            let _ = std::fs::remove_file(&tmp_archive);
            return Err(SourceError::HashMismatch {
                expected: expected_hex.clone(),
                actual: actual_hex,
            });
        }
    }

    std::fs::create_dir_all(dest).map_err(|e| SourceError::ExtractionFailed(e.to_string()))?;
    let extraction = extract(&tmp_archive, dest, format, ctx);
    let _ = std::fs::remove_file(&tmp_archive);
    extraction?;

    Ok(AdapterFetchResult {
        path: dest.to_path_buf(),
        resolved_ref: pkg.resolved_hash.clone(),
    })
}

fn download(url: &str, dest: &Path, ctx: &SourceContext) -> Result<(), SourceError> {
    let output = ctx
        .runner
        .run(
            ProcessBuilder::new("curl")
                .arg("-L")
                .arg("-f")
                .arg("-o")
                .arg(dest)
                .arg("--max-time")
                .arg(ctx.timeout_secs.to_string())
                .arg(url),
        )
        .map_err(|e| SourceError::DownloadFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::DownloadFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    Ok(())
}

fn extract(archive: &Path, dest: &Path, format: ArchiveFormat, ctx: &SourceContext) -> Result<(), SourceError> {
    let output = match format {
        ArchiveFormat::Zip => ctx.runner.run(
            ProcessBuilder::new("unzip")
                .arg("-q")
                .arg("-o")
                .arg(archive)
                .arg("-d")
                .arg(dest),
        ),
        other => {
            let flag = match other {
                ArchiveFormat::TarGz => "-xzf",
                ArchiveFormat::TarXz => "-xJf",
                ArchiveFormat::TarBz2 => "-xjf",
                ArchiveFormat::Tar => "-xf",
                ArchiveFormat::Zip => unreachable!(),
            };
            ctx.runner.run(
                ProcessBuilder::new("tar")
                    .arg(flag)
                    .arg(archive)
                    .arg("-C")
                    .arg(dest)
                    .arg("--strip-components=0"),
            )
        }
    };

    let output = output.map_err(|e| SourceError::ExtractionFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::ExtractionFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    Ok(())
}
