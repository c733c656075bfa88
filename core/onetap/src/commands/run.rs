//! `run`, `build`, `install`, `launch`: the app lifecycle on the claimed simulator.

use std::path::{Path, PathBuf};

use clap::Args;
use onetap_core::build::{self, BuildOutput, BuildRequest};
use onetap_core::{Claim, Result, TapError};

use super::Context;

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Scheme to build
    #[arg(short, long)]
    pub scheme: Option<String>,

    /// Build configuration (defaults to the configured one, usually Debug)
    #[arg(short, long)]
    pub configuration: Option<String>,

    /// Path to a project, workspace, or directory containing one
    #[arg(long)]
    pub project: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Leave a running instance of the app alone instead of restarting it
    #[arg(long)]
    pub no_restart: bool,

    /// Open Simulator.app and bring it to the front
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Path to the .app bundle
    pub app: PathBuf,
}

#[derive(Debug, Args)]
pub struct LaunchArgs {
    /// Bundle id of the app (defaults to the last one built or installed)
    pub bundle_id: Option<String>,

    /// Terminate the app first if it is running
    #[arg(long)]
    pub restart: bool,
}

/// Build, install, and launch in one go.
pub fn run(ctx: &Context, args: &RunArgs) -> Result<()> {
    let claim = ctx.require_claim()?;
    println!("Target: {}\n", claim.resource_label);

    let output = build_for(ctx, &claim, &args.build)?;

    ctx.ensure_booted(&claim)?;
    if args.show {
        ctx.simctl.open_simulator_app(&claim.resource_id)?;
    }
    if !args.no_restart {
        ctx.simctl.terminate(&claim.resource_id, &output.bundle_id);
    }

    println!("\nInstalling...");
    ctx.simctl.install(&claim.resource_id, &output.app_path)?;
    println!("Launching...");
    ctx.simctl.launch(&claim.resource_id, &output.bundle_id)?;
    ctx.record_artifact(&output.bundle_id)?;

    println!("\nRunning {} on {}", output.bundle_id, claim.resource_label);
    Ok(())
}

pub fn build(ctx: &Context, args: &BuildArgs) -> Result<()> {
    let claim = ctx.require_claim()?;
    let output = build_for(ctx, &claim, args)?;
    ctx.record_artifact(&output.bundle_id)?;

    println!("\nBuilt: {}", output.app_path.display());
    println!("   Bundle ID: {}", output.bundle_id);
    Ok(())
}

pub fn install(ctx: &Context, args: &InstallArgs) -> Result<()> {
    let claim = ctx.require_claim()?;
    if !args.app.exists() {
        return Err(TapError::InstallFailed(format!(
            "App not found at {}",
            args.app.display()
        )));
    }

    ctx.ensure_booted(&claim)?;
    println!("Installing to {}...", claim.resource_label);
    ctx.simctl.install(&claim.resource_id, &args.app)?;

    match note_install(ctx, &args.app)? {
        Some(bundle_id) => println!("Installed {}", bundle_id),
        None => println!("Installed"),
    }
    Ok(())
}

/// Marks the claim active after an install, remembering the bundle id when
/// the app has a readable one.
fn note_install(ctx: &Context, app: &Path) -> Result<Option<String>> {
    match build::read_bundle_id(app) {
        Ok(bundle_id) => {
            ctx.record_artifact(&bundle_id)?;
            Ok(Some(bundle_id))
        }
        Err(e) => {
            tracing::warn!(app = %app.display(), error = %e, "Installed app has no readable bundle id");
            ctx.registry.touch(&ctx.session)?;
            Ok(None)
        }
    }
}

pub fn launch(ctx: &Context, args: &LaunchArgs) -> Result<()> {
    let claim = ctx.require_claim()?;
    let bundle_id = match (&args.bundle_id, &claim.last_artifact_id) {
        (Some(explicit), _) => explicit.clone(),
        (None, Some(last)) => {
            println!("Using last installed app: {}", last);
            last.clone()
        }
        (None, None) => {
            return Err(TapError::LaunchFailed(
                "No bundle ID specified and no previous app installed".to_string(),
            ))
        }
    };

    ctx.ensure_booted(&claim)?;
    if args.restart {
        println!("Terminating existing instance...");
        ctx.simctl.terminate(&claim.resource_id, &bundle_id);
    }

    println!("Launching {}...", bundle_id);
    ctx.simctl.launch(&claim.resource_id, &bundle_id)?;
    ctx.record_artifact(&bundle_id)?;
    println!("Launched");
    Ok(())
}

fn build_for(ctx: &Context, claim: &Claim, args: &BuildArgs) -> Result<BuildOutput> {
    let project = build::resolve_project(args.project.as_deref())?;

    let scheme = match &args.scheme {
        Some(scheme) => scheme.clone(),
        None => {
            let schemes = build::list_schemes(&project)?;
            let picked = build::pick_scheme(&schemes)?;
            if schemes.len() > 1 {
                println!("Using scheme '{}' (use --scheme to specify)\n", picked);
            }
            picked
        }
    };

    let request = BuildRequest {
        project,
        scheme,
        udid: claim.resource_id.clone(),
        configuration: args
            .configuration
            .clone()
            .unwrap_or_else(|| ctx.config.build_configuration.clone()),
    };

    println!("Building {}...", request.scheme);
    let output = build::build(&request, &mut |line| println!("{}", line))?;
    println!("Build succeeded");
    Ok(output)
}
