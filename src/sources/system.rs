//! System source adapter: locates an already-installed library through
//! three ordered detection stages — `pkg-config`, a manual search across
//! well-known include/lib directories, then per-library environment
//! variables — falling back to explicit manifest-supplied paths only when
//! none of the three stages find anything.

use std::env;
use std::path::Path;

use crate::core::{BuildConfig, ResolvedPackage, SourceType};
use crate::sources::{AdapterFetchResult, SourceContext, SourceError};
use crate::util::process::ProcessBuilder;

const SEARCH_INCLUDE_DIRS: &[&str] = &["/usr/include", "/usr/local/include"];
const SEARCH_LIB_DIRS: &[&str] = &["/usr/lib", "/usr/lib64", "/usr/local/lib"];

pub fn resolve(
    name: &str,
    pkg_config_name: Option<&str>,
    include_paths: &[String],
    library_paths: &[String],
    libraries: &[String],
    ctx: &SourceContext,
) -> Result<ResolvedPackage, SourceError> {
    let probe_name = pkg_config_name.unwrap_or(name);

    if let Some(pc_name) = pkg_config_name {
        if crate::util::process::find_executable("pkg-config").is_some() {
            if let Ok(pkg) = resolve_via_pkg_config(name, pc_name, ctx) {
                return Ok(pkg);
            }
        }
    }

    if let Some(pkg) = search_filesystem(name, probe_name, include_paths, library_paths) {
        return Ok(pkg);
    }

    if let Some(pkg) = search_env_vars(name, probe_name) {
        return Ok(pkg);
    }

    if !include_paths.is_empty() || !library_paths.is_empty() || !libraries.is_empty() {
        let build_config = BuildConfig {
            include_dirs: include_paths.to_vec(),
            lib_dirs: library_paths.to_vec(),
            libraries: if libraries.is_empty() { vec![name.to_string()] } else { libraries.to_vec() },
            ..Default::default()
        };

        return Ok(
            ResolvedPackage::new(name, "system".to_string(), SourceType::System, "system")
                .with_build_config(build_config),
        );
    }

    Err(SourceError::LibraryNotFound(name.to_string()))
}

pub fn fetch(pkg: &ResolvedPackage, _dest: &Path) -> Result<AdapterFetchResult, SourceError> {
    Ok(AdapterFetchResult { path: std::path::PathBuf::from(&pkg.source_url), resolved_ref: None })
}

fn resolve_via_pkg_config(name: &str, pc_name: &str, ctx: &SourceContext) -> Result<ResolvedPackage, SourceError> {
    if crate::util::process::find_executable("pkg-config").is_none() {
        return Err(SourceError::PkgConfigNotFound);
    }

    let version_output = ctx
        .runner
        .run(ProcessBuilder::new("pkg-config").arg("--modversion").arg(pc_name))
        .map_err(|e| SourceError::CommandFailed(e.to_string()))?;
    if !version_output.status.success() {
        return Err(SourceError::LibraryNotFound(pc_name.to_string()));
    }
    let version = String::from_utf8_lossy(&version_output.stdout).trim().to_string();

    let cflags_output = ctx
        .runner
        .run(ProcessBuilder::new("pkg-config").arg("--cflags").arg(pc_name))
        .map_err(|e| SourceError::CommandFailed(e.to_string()))?;
    let libs_output = ctx
        .runner
        .run(ProcessBuilder::new("pkg-config").arg("--libs").arg(pc_name))
        .map_err(|e| SourceError::CommandFailed(e.to_string()))?;

    let build_config = parse_pkg_config_flags(
        &String::from_utf8_lossy(&cflags_output.stdout),
        &String::from_utf8_lossy(&libs_output.stdout),
    );

    Ok(
        ResolvedPackage::new(name, version, SourceType::System, format!("pkg-config:{pc_name}"))
            .with_build_config(build_config),
    )
}

fn parse_pkg_config_flags(cflags: &str, libs: &str) -> BuildConfig {
    let mut config = BuildConfig::default();
    for token in cflags.split_whitespace() {
        if let Some(path) = token.strip_prefix("-I") {
            config.include_dirs.push(path.to_string());
        } else if let Some(define) = token.strip_prefix("-D") {
            config.defines.push(define.to_string());
        } else {
            config.c_flags.push(token.to_string());
        }
    }
    for token in libs.split_whitespace() {
        if let Some(path) = token.strip_prefix("-L") {
            config.lib_dirs.push(path.to_string());
        } else if let Some(lib) = token.strip_prefix("-l") {
            config.libraries.push(lib.to_string());
        } else {
            config.ld_flags.push(token.to_string());
        }
    }
    config
}

/// Stage 2: a manual search for `lib<name><ext>` across a built-in set of
/// lib directories plus caller-supplied extras.
fn search_filesystem(
    name: &str,
    probe_name: &str,
    extra_include: &[String],
    extra_lib: &[String],
) -> Option<ResolvedPackage> {
    let lib_dirs: Vec<String> =
        SEARCH_LIB_DIRS.iter().map(|s| s.to_string()).chain(extra_lib.iter().cloned()).collect();
    let candidates = library_filename_candidates(probe_name);

    let found_dir = lib_dirs.iter().find_map(|dir| {
        candidates
            .iter()
            .any(|file| Path::new(dir).join(file).exists())
            .then(|| dir.clone())
    })?;

    let include_dirs: Vec<String> = SEARCH_INCLUDE_DIRS
        .iter()
        .map(|s| s.to_string())
        .chain(extra_include.iter().cloned())
        .filter(|dir| Path::new(dir).is_dir())
        .collect();

    let build_config = BuildConfig {
        include_dirs,
        lib_dirs: vec![found_dir],
        libraries: vec![probe_name.to_string()],
        ..Default::default()
    };

    Some(ResolvedPackage::new(name, "system".to_string(), SourceType::System, "system").with_build_config(build_config))
}

/// Stage 3: `<UPPER(NAME)>_INCLUDE_DIR` / `<UPPER(NAME)>_LIB_DIR`.
fn search_env_vars(name: &str, probe_name: &str) -> Option<ResolvedPackage> {
    let upper = probe_name.to_ascii_uppercase().replace(['-', '.'], "_");
    let include_dir = env::var(format!("{upper}_INCLUDE_DIR")).ok();
    let lib_dir = env::var(format!("{upper}_LIB_DIR")).ok();

    if include_dir.is_none() && lib_dir.is_none() {
        return None;
    }

    let build_config = BuildConfig {
        include_dirs: include_dir.into_iter().collect(),
        lib_dirs: lib_dir.into_iter().collect(),
        libraries: vec![probe_name.to_string()],
        ..Default::default()
    };

    Some(ResolvedPackage::new(name, "system".to_string(), SourceType::System, "system").with_build_config(build_config))
}

fn library_filename_candidates(name: &str) -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec![format!("{name}.dll"), format!("{name}.lib")]
    } else if cfg!(target_os = "macos") {
        vec![format!("lib{name}.dylib"), format!("lib{name}.a")]
    } else {
        vec![format!("lib{name}.so"), format!("lib{name}.a")]
    }
}
