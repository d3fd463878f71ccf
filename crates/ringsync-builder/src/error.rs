//! Error types for ring-builder operations.

/// Errors that can occur at the ring-builder boundary.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// The external program could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The external program ran and reported failure.
    ///
    /// Both output streams are preserved; the tool writes most of its
    /// diagnostics to stdout.
    #[error("{} {} exited with status {status}: {output}", program, args.join(" "))]
    CommandFailed {
        /// Program that was invoked.
        program: String,
        /// Arguments it was invoked with.
        args: Vec<String>,
        /// Exit code, `-1` when killed by a signal.
        status: i32,
        /// Combined stderr and stdout, trimmed.
        output: String,
    },

    /// The device-table bridge produced or received unusable JSON.
    #[error("device table bridge: {0}")]
    DeviceDump(String),

    /// A builder-state precondition failed (missing builder file, no
    /// matching device).
    #[error("builder state: {0}")]
    State(String),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
