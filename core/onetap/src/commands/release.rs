use clap::Args;
use onetap_core::Result;

use super::Context;

#[derive(Debug, Args)]
pub struct ReleaseArgs {
    /// Shut the simulator down after releasing it
    #[arg(long)]
    pub shutdown: bool,
}

pub fn run(ctx: &Context, args: &ReleaseArgs) -> Result<()> {
    let Some(claim) = ctx.registry.release(&ctx.session)? else {
        println!("No simulator claimed for this session");
        return Ok(());
    };

    println!("Released {}", claim.resource_label);

    if args.shutdown {
        println!("Shutting down simulator...");
        ctx.simctl.shutdown(&claim.resource_id)?;
        println!("Simulator shut down");
    }
    Ok(())
}
