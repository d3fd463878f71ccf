//! Error types for the synchronization workflow.

use ringsync_types::RingClass;

/// Errors that can occur while running a workflow operation.
///
/// Every failure aborts the whole invocation; there is no partial-success
/// reporting. Ring state placement is live data placement, so the
/// conservative stance wins everywhere.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Shared store access failed.
    #[error("store error: {0}")]
    Store(#[from] ringsync_store::StoreError),

    /// The external ring builder failed.
    #[error("builder error: {0}")]
    Builder(#[from] ringsync_builder::BuilderError),

    /// Bundle packing or unpacking failed.
    #[error("codec error: {0}")]
    Codec(#[from] ringsync_codec::CodecError),

    /// The desired-device list could not be parsed.
    #[error("device list error: {0}")]
    Parse(#[from] ringsync_types::ParseError),

    /// Workspace I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A ring file exists without its builder file.
    ///
    /// Creating a fresh builder here would silently discard the topology
    /// the ring file was compiled from, so `init` refuses instead.
    #[error("{ring} ring file exists without its builder; refusing to reinitialize")]
    InconsistentState {
        /// The ring with the orphaned ring file.
        ring: RingClass,
    },

    /// `push` found no compiled ring file for a ring.
    #[error("{ring} ring file missing from the workspace; rebalance before pushing")]
    MissingRingFile {
        /// The ring whose compiled file is absent.
        ring: RingClass,
    },

    /// The rebalance sequence failed with the builder still in swapped
    /// orientation.
    ///
    /// The address swap was applied but not reversed; the builder file
    /// must be inspected (and restored with `metaswap`) before retrying.
    #[error("{ring} rebalance aborted with device addresses still swapped, inspect the builder before retrying: {source}")]
    SwappedAbort {
        /// The ring whose builder is left swapped.
        ring: RingClass,
        /// The failure that interrupted the sequence.
        #[source]
        source: ringsync_builder::BuilderError,
    },
}
