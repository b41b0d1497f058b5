//! `ovo fetch`

use anyhow::Result;

use ovo::util::{Shell, Status};
use ovo::PackageManager;

use super::resolve_dep_args;
use crate::cli::DepsArgs;

pub fn execute(manager: &PackageManager, shell: &Shell, args: DepsArgs) -> Result<()> {
    let deps = resolve_dep_args(&args)?;
    let result = manager.resolve(&deps)?;

    for name in result.install_order() {
        let Some(pkg) = result.packages.get(&name) else { continue };
        let fetched = manager.fetch(pkg)?;
        let status = if fetched.from_cache { Status::Skipped } else { Status::Fetching };
        shell.status(
            status,
            format!(
                "{} -> {} ({}){}",
                pkg.name,
                fetched.path.display(),
                pkg.source_type.as_str(),
                if fetched.from_cache { " [cached]" } else { "" }
            ),
        );
    }
    Ok(())
}
