//! `ovo install`

use anyhow::Result;

use ovo::util::{Shell, Status};
use ovo::PackageManager;

use super::resolve_dep_args;
use crate::cli::DepsArgs;

pub fn execute(manager: &PackageManager, shell: &Shell, args: DepsArgs) -> Result<()> {
    let deps = resolve_dep_args(&args)?;
    let report = manager.install(&deps)?;

    shell.status(
        Status::Finished,
        format!("resolved {} package(s), fetched {} ({} from cache)", report.resolved, report.fetched, report.from_cache),
    );
    Ok(())
}
