//! Typed error types for the tab engine.
//!
//! Structured errors so callers at the crate boundary can match on specific
//! variants instead of relying on opaque strings. Failures are always local
//! to one tab or one operation; nothing here is fatal to the process.

use thiserror::Error;

pub use bytebench_scripting::error::ScriptError;

/// Top-level error type for tab operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A macro is already running for this tab; the existing task keeps
    /// running and no new one is started.
    #[error("a macro is already running for this tab")]
    MacroBusy,

    /// `start_macro` was called with an empty macro source.
    #[error("macro source is empty")]
    EmptySource,

    /// Hex text could not be decoded back into bytes.
    #[error("invalid hex input at offset {position}")]
    InvalidHex {
        /// Byte offset of the offending character in the input text.
        position: usize,
    },

    /// Macro compilation or execution failed.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The transport rejected an outbound send.
    #[error("transport send failed: {0}")]
    Send(#[from] std::io::Error),
}
