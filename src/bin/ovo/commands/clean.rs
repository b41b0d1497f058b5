//! `ovo clean`

use anyhow::Result;

use ovo::util::{Shell, Status};
use ovo::PackageManager;

pub fn execute(manager: &PackageManager, shell: &Shell) -> Result<()> {
    let removed = manager.clean()?;
    shell.status(Status::Removed, format!("{removed} expired cache entries"));
    Ok(())
}
