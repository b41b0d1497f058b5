//! `ovo update`

use anyhow::Result;

use ovo::util::{Shell, Status};
use ovo::PackageManager;

use super::resolve_dep_args;
use crate::cli::DepsArgs;

pub fn execute(manager: &PackageManager, shell: &Shell, args: DepsArgs) -> Result<()> {
    let deps = resolve_dep_args(&args)?;
    let result = manager.update(&deps)?;

    for name in result.install_order() {
        let Some(pkg) = result.packages.get(&name) else { continue };
        shell.status(Status::Updated, format!("{} v{} ({})", pkg.name, pkg.version, pkg.source_type.as_str()));
    }
    Ok(())
}
