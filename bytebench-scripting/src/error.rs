//! Typed error types for the macro engine.
//!
//! Structured errors so callers at the crate boundary can match on specific
//! variants instead of relying on opaque strings.

use thiserror::Error;

/// Top-level error type for macro compilation and execution.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The macro source could not be turned into something executable.
    #[error("invalid macro source: {0}")]
    Parse(String),

    /// The macro subprocess could not be started.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// Command that failed to launch.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The macro failed while running.
    #[error("macro runtime error: {0}")]
    Runtime(String),

    /// A protocol message could not be serialized or parsed.
    #[error("macro protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    /// I/O failure talking to the macro subprocess or the tab.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
