use chrono::{DateTime, Utc};
use clap::Args;
use onetap_core::{Claim, Result, TapError};
use serde::Serialize;

use super::Context;

#[derive(Debug, Default, Args)]
pub struct StatusArgs {
    /// Show UDID, session, PID, and last app
    #[arg(long)]
    pub verbose: bool,

    /// Print claims as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusEntry<'a> {
    #[serde(flatten)]
    claim: &'a Claim,
    display_name: String,
    alive: bool,
    current: bool,
}

pub fn run(ctx: &Context, args: &StatusArgs) -> Result<()> {
    let claims = ctx.registry.claims()?;
    let policy = ctx.liveness();
    let now = Utc::now();

    let entries: Vec<StatusEntry<'_>> = claims
        .iter()
        .map(|claim| StatusEntry {
            claim,
            display_name: claim.display_name(),
            alive: policy.is_alive(claim, now),
            current: claim.session_id == ctx.session,
        })
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&entries).map_err(|e| TapError::Json {
            context: "serializing status".to_string(),
            source: e,
        })?;
        println!("{}", json);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No active claims");
        println!("   Run 'tap claim' to claim a simulator");
        return Ok(());
    }

    println!("Active Claims:\n");
    for entry in &entries {
        print!("{}", render_entry(entry, args.verbose, now));
        println!();
    }

    let stale = entries.iter().filter(|e| !e.alive).count();
    if stale > 0 {
        println!("{} stale claim(s) detected. Run 'tap gc' to clean up.", stale);
    }
    Ok(())
}

fn render_entry(entry: &StatusEntry<'_>, verbose: bool, now: DateTime<Utc>) -> String {
    let claim = entry.claim;
    let marker = if entry.current { "→" } else { " " };
    let liveness = if entry.alive { "●" } else { "✗" };

    let mut out = format!("{} {} {}\n", marker, liveness, entry.display_name);
    out.push_str(&format!("     Simulator: {}\n", claim.resource_label));
    if verbose {
        out.push_str(&format!("     UDID: {}\n", claim.resource_id));
        out.push_str(&format!("     Session: {}\n", claim.session_id.short_display()));
        out.push_str(&format!("     PID: {}\n", claim.owner_process_id));
    }
    out.push_str(&format!("     Uptime: {}\n", claim.uptime(now)));
    if verbose {
        if let Some(app) = &claim.last_artifact_id {
            out.push_str(&format!("     Last app: {}\n", app));
        }
    }
    out
}
