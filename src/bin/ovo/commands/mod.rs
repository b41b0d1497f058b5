//! Command implementations. Each is a thin wrapper around one
//! `ovo::PackageManager` operation — this binary exercises the library, it
//! does not host any logic of its own.

pub mod clean;
pub mod completions;
pub mod fetch;
pub mod install;
pub mod resolve;
pub mod update;
pub mod verify;

use anyhow::{bail, Context, Result};

use ovo::core::Manifest;
use ovo::manager::depstring;
use ovo::Dependency;

use crate::cli::DepsArgs;

/// Parses every dependency named by `args`: a manifest file's dependency
/// table (if `--manifest` was given) plus any inline dependency strings.
/// At least one source must be present.
pub fn resolve_dep_args(args: &DepsArgs) -> Result<Vec<Dependency>> {
    let mut deps = Vec::new();

    if let Some(path) = &args.manifest {
        let manifest = Manifest::load_json(path).with_context(|| format!("failed to load manifest {}", path.display()))?;
        for (name, dep) in manifest.dependencies {
            let mut dependency = Dependency::new(name, dep.source).with_version_req(dep.version_req);
            dependency.optional = dep.optional;
            dependency.build_only = dep.build_only;
            dependency.dev_only = dep.dev_only;
            deps.push(dependency);
        }
    }

    for spec in &args.deps {
        deps.push(depstring::parse(spec).with_context(|| format!("invalid dependency string `{spec}`"))?);
    }

    if deps.is_empty() {
        bail!("no dependencies given: pass dependency strings or --manifest <path>");
    }

    Ok(deps)
}
