//! External command execution.
//!
//! Every collaborator (`xcrun simctl`, `xcodebuild`, `plutil`, `open`) goes
//! through here so that a non-zero exit always becomes
//! [`TapError::ExternalCommandFailed`] with the exit code and captured output.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::{Result, TapError};

/// Renders `program args...` for error messages and logs.
pub fn describe(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Runs to completion and returns stdout.
///
/// On failure the error carries stdout followed by stderr.
pub fn run(program: &str, args: &[&str]) -> Result<String> {
    let command_line = describe(program, args);
    tracing::debug!(command = %command_line, "Running external command");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| TapError::io(format!("spawning {}", command_line), e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(TapError::ExternalCommandFailed {
        command: command_line,
        code: output.status.code().unwrap_or(-1),
        output: format!("{}{}", stdout, stderr),
    })
}

/// Like [`run`], but hands each stdout line to `on_line` as it arrives.
///
/// Stderr is collected on a helper thread so neither pipe can fill up and
/// stall the child.
pub fn run_streaming(program: &str, args: &[&str], on_line: &mut dyn FnMut(&str)) -> Result<String> {
    let command_line = describe(program, args);
    tracing::debug!(command = %command_line, "Running external command (streaming)");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TapError::io(format!("spawning {}", command_line), e))?;

    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut collected = Vec::new();
            let _ = stderr.read_to_end(&mut collected);
            String::from_utf8_lossy(&collected).into_owned()
        })
    });

    let mut stdout_text = String::new();
    if let Some(stdout) = child.stdout.take() {
        let read = for_each_line(stdout, |line| {
            on_line(line);
            stdout_text.push_str(line);
            stdout_text.push('\n');
        });
        if let Err(e) = read {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TapError::io(format!("reading {}", command_line), e));
        }
    }

    let status = child
        .wait()
        .map_err(|e| TapError::io(format!("waiting for {}", command_line), e))?;
    let stderr_text = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if status.success() {
        return Ok(stdout_text);
    }

    Err(TapError::ExternalCommandFailed {
        command: command_line,
        code: status.code().unwrap_or(-1),
        output: format!("{}{}", stdout_text, stderr_text),
    })
}

/// Calls `f` with each line of `pipe` until end of input.
///
/// Invalid UTF-8 is replaced rather than treated as an error, so a stray byte
/// never stops the pipe from being drained.
pub fn for_each_line<R: Read>(pipe: R, mut f: impl FnMut(&str)) -> io::Result<()> {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        f(&String::from_utf8_lossy(&buf));
    }
}
