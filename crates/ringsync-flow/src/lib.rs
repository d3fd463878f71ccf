//! Ring-state synchronization workflow.
//!
//! [`SyncFlow`] sequences everything the tool does: fetching ring
//! artifacts from the shared store into a local workspace, creating
//! missing builders, reconciling the desired-device list, orchestrating
//! rebalances through the external builder (with the address-swap
//! workaround), and publishing the updated artifacts back with the
//! store's optimistic-concurrency guard.
//!
//! Every operation is independently invocable; the composite
//! [`SyncFlow::all`] chains them and aborts on the first failure.

mod error;
mod maintain;
mod rebalance;
mod reconcile;
mod sync;

pub use error::FlowError;
pub use sync::{SyncFlow, SyncOptions};
