use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Args;
use onetap_core::{LogStreamer, Result, TapError};
use signal_hook::consts::SIGINT;

use super::Context;

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Bundle id to filter by (defaults to the last app built or installed)
    #[arg(short, long)]
    pub bundle_id: Option<String>,

    /// Stream everything, without an app filter
    #[arg(short, long)]
    pub all: bool,
}

pub fn run(ctx: &Context, args: &LogsArgs) -> Result<()> {
    let claim = ctx.require_claim()?;
    ctx.ensure_booted(&claim)?;

    let filter = if args.all {
        println!("Streaming all logs from {}...", claim.resource_label);
        None
    } else if let Some(bundle_id) = args.bundle_id.as_deref().or(claim.last_artifact_id.as_deref()) {
        println!("Streaming logs for {}...", bundle_id);
        Some(bundle_id)
    } else {
        println!("Streaming all logs (no app filter, use --bundle-id to filter)...");
        None
    };
    println!("   Press Ctrl+C to stop\n");

    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&interrupted))
        .map_err(|e| TapError::io("installing SIGINT handler", e))?;

    let mut streamer = LogStreamer::new();
    streamer.start(
        ctx.simctl.log_stream_command(&claim.resource_id, filter),
        |line| println!("{}", line),
    )?;
    streamer.wait(&interrupted)?;

    if interrupted.load(Ordering::SeqCst) {
        println!("\nLog streaming stopped");
    }
    Ok(())
}
