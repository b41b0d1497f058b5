//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// ovo - dependency resolution and fetching for native-code packages
#[derive(Parser)]
#[command(name = "ovo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Color output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: String,

    /// Run without network access
    #[arg(long, global = true)]
    pub offline: bool,

    /// Ignore any existing lockfile when resolving
    #[arg(long, global = true)]
    pub no_lockfile: bool,

    /// Override the cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Path to the lockfile (default: ./ovo.lock)
    #[arg(long, global = true)]
    pub lockfile: Option<PathBuf>,

    /// Registry base URL for `registry:` dependencies
    #[arg(long, global = true)]
    pub registry_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependencies and print the resulting package set
    Resolve(DepsArgs),

    /// Resolve ignoring the lockfile, fetch, and write a new lockfile
    Install(DepsArgs),

    /// Re-resolve every dependency to its latest compatible version
    Update(DepsArgs),

    /// Fetch (or reuse from cache) every resolved package without locking
    Fetch(DepsArgs),

    /// Evict cache entries past their TTL
    Clean,

    /// Re-hash locked packages on disk and report mismatches
    Verify,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// A set of dependencies, either as inline strings in the forms documented
/// by `ovo::manager::depstring` (e.g. `zlib@^1.3`, `git:https://.../repo.git`,
/// `path:../mylib`, `vcpkg:glfw3[wayland]`, `system:libcurl`), a parsed
/// manifest JSON file (see `ovo::core::Manifest`), or both at once.
#[derive(Args)]
pub struct DepsArgs {
    /// Dependency strings
    pub deps: Vec<String>,

    /// Load dependencies from a parsed manifest JSON file
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
