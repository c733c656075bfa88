use clap::Args;
use onetap_core::session;
use onetap_core::{claim_device, ClaimRequest, DeviceChoice, DeviceDirectory, Result, SelectionOptions, TapError};

use super::Context;
use crate::picker;

#[derive(Debug, Args)]
pub struct ClaimArgs {
    /// Name for this session (e.g. 'auth-feature')
    #[arg(short, long)]
    pub name: Option<String>,

    /// Specific simulator UDID to claim
    #[arg(long, conflicts_with = "auto")]
    pub udid: Option<String>,

    /// Pick the best available simulator without prompting
    #[arg(long)]
    pub auto: bool,

    /// Boot the simulator and open Simulator.app
    #[arg(long)]
    pub boot: bool,

    /// Lowest runtime to consider with --auto (e.g. iOS-17-0)
    #[arg(long, value_name = "RUNTIME")]
    pub min_runtime: Option<String>,
}

pub fn run(ctx: &Context, args: &ClaimArgs) -> Result<()> {
    if let Some(existing) = ctx.registry.claim_for_session(&ctx.session)? {
        println!("You already have a claim on {}", existing.resource_label);
        println!("   Release it first with 'tap release'");
        return Ok(());
    }

    let choice = if let Some(udid) = &args.udid {
        DeviceChoice::Udid(udid.clone())
    } else if args.auto {
        DeviceChoice::Auto(SelectionOptions {
            prefer_booted: ctx.config.prefer_booted,
            minimum_runtime: args
                .min_runtime
                .clone()
                .or_else(|| ctx.config.minimum_runtime.clone()),
        })
    } else {
        if !session::is_interactive() {
            return Err(TapError::NotInteractive);
        }
        let devices = ctx.simctl.list_devices()?;
        let claimed = ctx.registry.load()?.claimed_resource_ids();
        let picked = picker::pick_device(&devices, &claimed)
            .map_err(|e| TapError::io("reading selection", e))?;
        match picked {
            Some(device) => DeviceChoice::Picked(device),
            None => {
                println!("No simulator selected");
                return Ok(());
            }
        }
    };

    let (claim, device) = claim_device(
        &ctx.registry,
        &ctx.simctl,
        ClaimRequest {
            session: ctx.session.clone(),
            owner_pid: session::owner_pid(&ctx.session),
            name: args.name.clone(),
            choice,
        },
    )?;

    println!("Claimed {}", device.name);
    println!("   Session: {}", claim.display_name());
    println!("   UDID: {}", device.udid);

    if args.boot && !device.state.is_booted() {
        println!("Booting simulator...");
        ctx.simctl.open_simulator_app(&device.udid)?;
        println!("Simulator booted");
    }
    Ok(())
}
