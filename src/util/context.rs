//! Global context for ovo operations: paths, config location, and
//! environment plumbed down to the `PackageManager`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("dev", "ovo", "ovo"));

/// Paths, verbosity, and color settings shared across a CLI invocation.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    home: PathBuf,
    verbose: bool,
    color: bool,
}

impl GlobalContext {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.cache_dir().to_path_buf()
        } else {
            directories::UserDirs::new()
                .map(|d| d.home_dir().join(".ovo"))
                .unwrap_or_else(|| PathBuf::from(".ovo"))
        };

        Ok(GlobalContext { cwd, home, verbose: false, color: true })
    }

    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Global ovo home directory (`~/.cache/ovo` or platform equivalent).
    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    pub fn global_config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Project-local `.ovo/` directory, analogous to `.git/` or `target/`.
    pub fn project_ovo_dir(&self) -> PathBuf {
        self.cwd.join(".ovo")
    }

    pub fn project_config_path(&self) -> PathBuf {
        self.cwd.join("ovo.toml")
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.cwd.join("ovo.lock")
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path)
                .with_context(|| format!("failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::new().expect("failed to create default GlobalContext")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_paths_are_absolute() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
    }

    #[test]
    fn project_ovo_dir_is_under_cwd() {
        let ctx = GlobalContext::with_cwd(PathBuf::from("/tmp/demo")).unwrap();
        assert_eq!(ctx.project_ovo_dir(), PathBuf::from("/tmp/demo/.ovo"));
        assert_eq!(ctx.lockfile_path(), PathBuf::from("/tmp/demo/ovo.lock"));
    }
}
