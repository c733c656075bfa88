//! tap: claim an iOS simulator per terminal session, then build, install, and run.
//!
//! Each terminal claims its own simulator once; every later command finds its
//! target through the claim, so parallel sessions never collide.
//!
//! ## Subcommands
//!
//! - `claim` / `release`: take or give up a simulator for this session
//! - `status` (default): list claims and flag stale ones
//! - `run`, `build`, `install`, `launch`: app lifecycle on the claimed simulator
//! - `logs`, `screenshot`: observe the claimed simulator
//! - `gc`: remove claims whose terminal is gone

mod commands;
mod logging;
mod picker;

use clap::{Parser, Subcommand};
use onetap_core::{StorageConfig, TapError};

use commands::claim::ClaimArgs;
use commands::gc::GcArgs;
use commands::logs::LogsArgs;
use commands::release::ReleaseArgs;
use commands::run::{BuildArgs, InstallArgs, LaunchArgs, RunArgs};
use commands::screenshot::ScreenshotArgs;
use commands::status::StatusArgs;
use commands::Context;

#[derive(Parser)]
#[command(name = "tap")]
#[command(about = "IDE-less iOS development. One tap to build, install, and run.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim a simulator for this terminal session
    Claim(ClaimArgs),

    /// Release the claimed simulator
    Release(ReleaseArgs),

    /// Show all active claims
    Status(StatusArgs),

    /// Build, install, and launch the app
    Run(RunArgs),

    /// Build the project for the claimed simulator
    Build(BuildArgs),

    /// Install an app bundle on the claimed simulator
    Install(InstallArgs),

    /// Launch an app on the claimed simulator
    Launch(LaunchArgs),

    /// Stream logs from the claimed simulator
    Logs(LogsArgs),

    /// Capture a screenshot from the claimed simulator
    Screenshot(ScreenshotArgs),

    /// Remove stale claims left by closed terminals
    Gc(GcArgs),
}

fn main() {
    let cli = Cli::parse();

    let storage = match StorageConfig::from_env() {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("tap: {}", e);
            std::process::exit(1);
        }
    };
    let _logging_guard = logging::init(&storage.logs_dir());

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Status(StatusArgs::default()));

    if let Err(e) = dispatch(&storage, command) {
        report(&e);
        std::process::exit(1);
    }
}

fn dispatch(storage: &StorageConfig, command: Commands) -> onetap_core::Result<()> {
    let ctx = Context::load(storage)?;

    match command {
        Commands::Claim(args) => commands::claim::run(&ctx, &args),
        Commands::Release(args) => commands::release::run(&ctx, &args),
        Commands::Status(args) => commands::status::run(&ctx, &args),
        Commands::Run(args) => commands::run::run(&ctx, &args),
        Commands::Build(args) => commands::run::build(&ctx, &args),
        Commands::Install(args) => commands::run::install(&ctx, &args),
        Commands::Launch(args) => commands::run::launch(&ctx, &args),
        Commands::Logs(args) => commands::logs::run(&ctx, &args),
        Commands::Screenshot(args) => commands::screenshot::run(&ctx, &args),
        Commands::Gc(args) => commands::gc::run(&ctx, &args),
    }
}

fn report(error: &TapError) {
    if error.is_recoverable() {
        eprintln!("{}", error);
    } else {
        tracing::error!(error = %error, "tap failed");
    }
}
