//! Macro execution engine for the bytebench byte-stream workbench.
//!
//! Provides the [`script::Script`] capability boundary, a cancellable
//! background executor that streams live tab bytes to a running macro, and a
//! subprocess-backed script implementation speaking a JSON-lines protocol.

pub mod context;
pub mod error;
pub mod executor;
pub mod process;
pub mod protocol;
pub mod script;
