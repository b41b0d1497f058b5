//! vcpkg source adapter: resolves/fetches packages from an existing vcpkg
//! installation via its CLI, rather than re-implementing port builds.

use std::path::{Path, PathBuf};

use crate::core::{BuildConfig, ResolvedPackage, SourceType};
use crate::sources::{AdapterFetchResult, SourceContext, SourceError};
use crate::util::process::ProcessBuilder;

pub fn resolve(
    name: &str,
    features: &[String],
    triplet: Option<&str>,
    ctx: &SourceContext,
) -> Result<ResolvedPackage, SourceError> {
    let root = ctx.vcpkg_root.as_ref().ok_or(SourceError::VcpkgNotFound)?;
    if !root.exists() {
        return Err(SourceError::VcpkgNotFound);
    }

    let owned_triplet;
    let triplet = match triplet {
        Some(t) => t,
        None => {
            owned_triplet = host_triplet(false);
            &owned_triplet
        }
    };
    let port_spec = port_spec(name, features);
    let installed_dir = root.join("installed").join(triplet);

    let version = read_installed_version(root, name, triplet, ctx).unwrap_or_else(|| "unknown".to_string());
    let build_config = discover_build_config(&installed_dir, name);

    Ok(
        ResolvedPackage::new(name, version, SourceType::Vcpkg, format!("{port_spec}:{triplet}"))
            .with_build_config(build_config),
    )
}

pub fn fetch(pkg: &ResolvedPackage, _dest: &Path) -> Result<AdapterFetchResult, SourceError> {
    // Installation happens during `resolve`'s `vcpkg install`; fetch only
    // reports the already-installed triplet directory.
    Ok(AdapterFetchResult { path: std::path::PathBuf::from(&pkg.source_url), resolved_ref: None })
}

/// Runs `vcpkg install <port[feature,...]>:<triplet>`.
pub fn install(name: &str, features: &[String], triplet: &str, ctx: &SourceContext) -> Result<(), SourceError> {
    let root = ctx.vcpkg_root.as_ref().ok_or(SourceError::VcpkgNotFound)?;
    let vcpkg_bin = root.join("vcpkg");
    let spec = format!("{}:{triplet}", port_spec(name, features));

    let output = ctx
        .runner
        .run(ProcessBuilder::new(&vcpkg_bin).arg("install").arg(&spec))
        .map_err(|e| SourceError::InstallFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(SourceError::InstallFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    Ok(())
}

/// Derives a vcpkg triplet (`<arch>-<os>[-static]`) from the host, the way
/// an explicit `triplet` override is formatted, rather than hardcoding one
/// platform.
fn host_triplet(static_linkage: bool) -> String {
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "x86",
        other => other,
    };
    let os = match std::env::consts::OS {
        "macos" => "osx",
        "linux" => "linux",
        "windows" => "windows",
        other => other,
    };
    if static_linkage {
        format!("{arch}-{os}-static")
    } else {
        format!("{arch}-{os}")
    }
}

fn port_spec(name: &str, features: &[String]) -> String {
    if features.is_empty() {
        name.to_string()
    } else {
        format!("{name}[{}]", features.join(","))
    }
}

fn read_installed_version(root: &Path, name: &str, triplet: &str, ctx: &SourceContext) -> Option<String> {
    let vcpkg_bin = root.join("vcpkg");
    let output = ctx
        .runner
        .run(ProcessBuilder::new(&vcpkg_bin).arg("list").arg(format!("{name}:{triplet}")))
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().find(|l| l.starts_with(name))?;
    line.split_whitespace().nth(1).map(|s| s.to_string())
}

/// Lists files under `<installed_dir>/{include,lib,bin}` and matches
/// library filenames by substring against `name`, instead of assuming the
/// whole directory and a library literally named `name`.
fn discover_build_config(installed_dir: &Path, name: &str) -> BuildConfig {
    let include_dir = installed_dir.join("include");
    let lib_dir = installed_dir.join("lib");
    let bin_dir = installed_dir.join("bin");

    let mut include_dirs = Vec::new();
    if include_dir.is_dir() {
        include_dirs.push(include_dir.to_string_lossy().into_owned());
    }

    let mut lib_dirs = Vec::new();
    let mut libraries = Vec::new();
    for dir in [&lib_dir, &bin_dir] {
        let Ok(entries) = std::fs::read_dir(dir) else { continue };
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !library_name_matches(&file_name, name) {
                continue;
            }
            let dir_str = dir.to_string_lossy().into_owned();
            if !lib_dirs.contains(&dir_str) {
                lib_dirs.push(dir_str);
            }
            if let Some(link_name) = library_link_name(&file_name) {
                if !libraries.contains(&link_name) {
                    libraries.push(link_name);
                }
            }
        }
    }

    if libraries.is_empty() {
        // Nothing under lib/bin matched by substring; fall back to the
        // bare port name so a link line is still produced.
        libraries.push(name.to_string());
        if lib_dir.is_dir() {
            lib_dirs.push(lib_dir.to_string_lossy().into_owned());
        }
    }

    BuildConfig { include_dirs, lib_dirs, libraries, ..Default::default() }
}

fn library_stem(file_name: &str) -> &str {
    file_name
        .strip_suffix(".lib")
        .or_else(|| file_name.strip_suffix(".dll"))
        .or_else(|| file_name.strip_suffix(".a"))
        .or_else(|| file_name.strip_suffix(".so"))
        .or_else(|| file_name.strip_suffix(".dylib"))
        .unwrap_or(file_name)
        .trim_start_matches("lib")
}

fn library_name_matches(file_name: &str, pkg_name: &str) -> bool {
    library_stem(file_name).to_ascii_lowercase().contains(&pkg_name.to_ascii_lowercase())
}

fn library_link_name(file_name: &str) -> Option<String> {
    let stem = library_stem(file_name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
