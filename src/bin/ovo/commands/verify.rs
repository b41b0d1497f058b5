//! `ovo verify`

use anyhow::{bail, Result};

use ovo::util::{Shell, Status};
use ovo::PackageManager;

pub fn execute(manager: &PackageManager, shell: &Shell) -> Result<()> {
    let report = manager.verify()?;

    for name in &report.mismatches {
        shell.warn(format!("mismatch: {name}"));
    }
    for name in &report.missing {
        shell.warn(format!("missing: {name}"));
    }

    if !report.mismatches.is_empty() || !report.missing.is_empty() {
        bail!("{} mismatch(es), {} missing package(s)", report.mismatches.len(), report.missing.len());
    }

    shell.status(Status::Finished, "all locked packages verified");
    Ok(())
}
