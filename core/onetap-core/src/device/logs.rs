//! Continuous log streaming as a cancellable background operation.
//!
//! ## Lifecycle
//!
//! 1. [`LogStreamer::start`] spawns the stream command and one reader thread
//!    per pipe; each line goes to the handler. Starting while a stream is
//!    active is a no-op.
//! 2. [`LogStreamer::wait`] returns when the stream ends on its own, or when
//!    the interrupt flag is raised (e.g. by a SIGINT handler), in which case
//!    the child is stopped first.
//! 3. [`LogStreamer::stop`] kills the child and joins the readers. Dropping
//!    the streamer does the same.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::command;
use crate::error::{Result, TapError};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

type LineHandler = Arc<Mutex<dyn FnMut(&str) + Send>>;

#[derive(Default)]
pub struct LogStreamer {
    child: Option<Child>,
    readers: Vec<JoinHandle<()>>,
}

impl LogStreamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn start<F>(&mut self, mut command: Command, handler: F) -> Result<()>
    where
        F: FnMut(&str) + Send + 'static,
    {
        if self.is_running() {
            tracing::debug!("Log stream already running, ignoring start");
            return Ok(());
        }

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TapError::io("spawning log stream", e))?;

        let handler: LineHandler = Arc::new(Mutex::new(handler));
        if let Some(stdout) = child.stdout.take() {
            self.readers.push(spawn_reader(stdout, Arc::clone(&handler)));
        }
        if let Some(stderr) = child.stderr.take() {
            self.readers.push(spawn_reader(stderr, handler));
        }

        tracing::debug!(pid = child.id(), "Log stream started");
        self.child = Some(child);
        Ok(())
    }

    /// Terminates the stream and releases its pipes. No-op when idle.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("Log stream stopped");
        }
        self.join_readers();
    }

    /// Blocks until the stream ends or `interrupt` is set.
    pub fn wait(&mut self, interrupt: &AtomicBool) -> Result<()> {
        loop {
            let Some(child) = self.child.as_mut() else {
                break;
            };
            if interrupt.load(Ordering::SeqCst) {
                self.stop();
                break;
            }
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(%status, "Log stream ended");
                    self.child = None;
                    break;
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    self.stop();
                    return Err(TapError::io("waiting for log stream", e));
                }
            }
        }
        self.join_readers();
        Ok(())
    }

    fn join_readers(&mut self) {
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
    }
}

impl Drop for LogStreamer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: R, handler: LineHandler) -> JoinHandle<()> {
    thread::spawn(move || {
        let drained = command::for_each_line(pipe, |line| {
            if let Ok(mut handler) = handler.lock() {
                (&mut *handler)(line);
            }
        });
        if let Err(e) = drained {
            tracing::debug!(error = %e, "Log stream reader stopped");
        }
    })
}
