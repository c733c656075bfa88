//! Interactive prompts on the terminal.

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use onetap_core::Device;

/// Numbered list of unclaimed devices; returns the chosen one.
///
/// `q`, end of input, or an out-of-range answer yields `None`.
pub fn pick_device(devices: &[Device], claimed: &HashSet<String>) -> io::Result<Option<Device>> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    pick_device_from(devices, claimed, &mut stdin.lock(), &mut stdout.lock())
}

/// `[Y/n]` prompt; empty input or end of input means yes.
pub fn confirm(message: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    confirm_from(message, &mut stdin.lock(), &mut stdout.lock())
}

fn pick_device_from<R: BufRead, W: Write>(
    devices: &[Device],
    claimed: &HashSet<String>,
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<Device>> {
    let available: Vec<&Device> = devices.iter().filter(|d| !claimed.contains(&d.udid)).collect();
    if available.is_empty() {
        writeln!(output, "No available simulators")?;
        return Ok(None);
    }

    writeln!(output, "\nAvailable Simulators:\n")?;
    for (index, device) in available.iter().enumerate() {
        writeln!(output, "  {:>2}. {}", index + 1, device.display_string())?;
    }
    write!(output, "\n  Enter number (or 'q' to quit): ")?;
    output.flush()?;

    let Some(answer) = read_answer(input)? else {
        return Ok(None);
    };
    if answer.eq_ignore_ascii_case("q") {
        return Ok(None);
    }

    match answer.parse::<usize>() {
        Ok(n) if (1..=available.len()).contains(&n) => Ok(Some(available[n - 1].clone())),
        _ => {
            writeln!(output, "Invalid selection")?;
            Ok(None)
        }
    }
}

fn confirm_from<R: BufRead, W: Write>(message: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    write!(output, "{} [Y/n]: ", message)?;
    output.flush()?;

    Ok(match read_answer(input)? {
        None => true,
        Some(answer) if answer.is_empty() => true,
        Some(answer) => matches!(answer.to_lowercase().as_str(), "y" | "yes"),
    })
}

fn read_answer<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
