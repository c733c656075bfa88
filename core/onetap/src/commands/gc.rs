use clap::Args;
use onetap_core::{Result, TapError};

use super::Context;
use crate::picker;

#[derive(Debug, Args)]
pub struct GcArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,
}

pub fn run(ctx: &Context, args: &GcArgs) -> Result<()> {
    let policy = ctx.liveness();
    let stale = ctx.registry.find_stale(&policy)?;

    if stale.is_empty() {
        println!("No stale claims to clean up");
        return Ok(());
    }

    println!("Found {} stale claim(s):\n", stale.len());
    for claim in &stale {
        println!("   • {} → {}", claim.display_name(), claim.resource_label);
        println!("     PID {} is no longer running", claim.owner_process_id);
    }
    println!();

    if !args.force {
        let confirmed = picker::confirm("Remove these stale claims?")
            .map_err(|e| TapError::io("reading confirmation", e))?;
        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    // Liveness is re-checked under the lock; a claim touched since the
    // listing above survives.
    let removed = ctx.registry.garbage_collect_stale(&policy)?;
    println!("Removed {} stale claim(s)", removed.len());
    Ok(())
}
