//! Claim registry: the durable, cross-process map of session → simulator.
//!
//! ```text
//! tap claim ──┐                        ┌── state.json  (snapshot, atomic replace)
//! tap run  ───┼─▶ ClaimRegistry ──────┤
//! tap gc   ───┘      modify()          └── state.lock  (flock, never read)
//! ```
//!
//! The file plus its lock *is* the shared state; nothing is cached in memory
//! between calls.
//!
//! # Module Structure
//!
//! - [`lock`]: scoped exclusive access (`flock` adapter)
//! - [`snapshot`]: the serialized state and pure mutation helpers
//! - [`store`]: load / modify / garbage-collect against the state file

pub mod lock;
mod snapshot;
mod store;

pub use lock::{ExclusiveAccess, FileLock, FileLockGuard};
pub use snapshot::{Snapshot, CURRENT_VERSION};
pub use store::ClaimRegistry;
