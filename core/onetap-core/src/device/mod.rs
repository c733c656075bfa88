//! Simulator directory and control.
//!
//! - [`types`]: device model, state enum with unknown fallback, runtime versions
//! - [`simctl`]: listing and control via `xcrun simctl`
//! - [`logs`]: cancellable log streaming

pub mod logs;
pub mod simctl;
pub mod types;

pub use logs::LogStreamer;
pub use simctl::{parse_device_list, DeviceDirectory, Simctl};
pub use types::{Device, DeviceClass, DeviceState, RuntimeVersion};
