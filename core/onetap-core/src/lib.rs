//! # onetap-core
//!
//! Core library for `tap`: lets several terminal sessions each hold one iOS
//! simulator exclusively, so builds and launches from different sessions never
//! land on the same device.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. External tools are run as child processes.
//! - **File is the truth**: All cross-process state lives in `~/.onetap/state.json`
//!   behind an advisory lock; nothing is cached between calls.
//! - **Fail closed**: A corrupt state file is an error, never an empty registry.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use onetap_core::{session, ClaimRegistry, StorageConfig};
//!
//! let registry = ClaimRegistry::open(&StorageConfig::from_env()?)?;
//! let claim = registry.require_claim(&session::resolve())?;
//! println!("target: {}", claim.resource_label);
//! ```

pub mod assign;
pub mod build;
pub mod claim;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod liveness;
pub mod registry;
pub mod selection;
pub mod session;
pub mod storage;

pub use assign::{claim_device, ClaimRequest, DeviceChoice};
pub use claim::Claim;
pub use config::TapConfig;
pub use device::{Device, DeviceClass, DeviceDirectory, DeviceState, LogStreamer, Simctl};
pub use error::{Result, TapError};
pub use liveness::{LivenessPolicy, ProcessProbe, SystemProbe};
pub use registry::{ClaimRegistry, Snapshot};
pub use selection::{auto_select, SelectionOptions};
pub use session::SessionId;
pub use storage::StorageConfig;
