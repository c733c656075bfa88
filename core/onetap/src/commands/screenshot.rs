use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Args;
use onetap_core::{command, DeviceDirectory, Result, TapError};

use super::Context;

#[derive(Debug, Args)]
pub struct ScreenshotArgs {
    /// Output file (default: screenshot-<timestamp>.png)
    pub path: Option<PathBuf>,

    /// Open the screenshot after capturing
    #[arg(long)]
    pub open: bool,
}

pub fn run(ctx: &Context, args: &ScreenshotArgs) -> Result<()> {
    let claim = ctx.require_claim()?;

    let booted = ctx
        .simctl
        .find_device(&claim.resource_id)?
        .is_some_and(|d| d.state.is_booted());
    if !booted {
        return Err(TapError::DeviceNotBooted(claim.resource_label));
    }

    let path = with_png_extension(args.path.clone().unwrap_or_else(default_path));

    println!("Capturing screenshot...");
    ctx.simctl.screenshot(&claim.resource_id, &path)?;
    println!("Saved to {}", path.display());

    if args.open {
        let target = path.to_string_lossy();
        command::run("open", &[&*target])?;
    }
    Ok(())
}

fn default_path() -> PathBuf {
    PathBuf::from(format!(
        "screenshot-{}.png",
        Utc::now().format("%Y-%m-%dT%H-%M-%SZ")
    ))
}

/// Appends `.png` unless the path already ends in it.
fn with_png_extension(path: PathBuf) -> PathBuf {
    if has_png_extension(&path) {
        return path;
    }
    let mut raw = path.into_os_string();
    raw.push(".png");
    PathBuf::from(raw)
}

fn has_png_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "png")
}
