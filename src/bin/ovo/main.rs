//! ovo CLI - exercises the package core's resolve/install/update/fetch/
//! clean/verify operations end to end. Not a build system frontend: there
//! is no manifest parser here, so dependencies are passed as CLI arguments.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use ovo::util::{ColorChoice, Shell};
use ovo::{GlobalContext, ManagerConfig, PackageManager};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { EnvFilter::new("ovo=debug") } else { EnvFilter::new("ovo=info") };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();

    let color: ColorChoice = cli.color.parse().map_err(anyhow::Error::msg)?;
    let shell = Shell::new(cli.quiet, color);

    match cli.command {
        Commands::Completions(args) => commands::completions::execute(args),
        other => {
            let ctx = GlobalContext::new()?;
            let config = ManagerConfig {
                cache_dir: cli.cache_dir.unwrap_or_else(|| ctx.cache_dir()),
                lockfile_path: cli.lockfile.unwrap_or_else(|| ctx.lockfile_path()),
                use_lockfile: !cli.no_lockfile,
                offline: cli.offline,
                registry_url: cli.registry_url,
                ..ManagerConfig::default()
            };
            let manager = PackageManager::new(config);

            match other {
                Commands::Resolve(args) => commands::resolve::execute(&manager, &shell, args),
                Commands::Install(args) => commands::install::execute(&manager, &shell, args),
                Commands::Update(args) => commands::update::execute(&manager, &shell, args),
                Commands::Fetch(args) => commands::fetch::execute(&manager, &shell, args),
                Commands::Clean => commands::clean::execute(&manager, &shell),
                Commands::Verify => commands::verify::execute(&manager, &shell),
                Commands::Completions(_) => unreachable!("handled above"),
            }
        }
    }
}
