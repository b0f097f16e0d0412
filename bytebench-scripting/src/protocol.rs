//! JSON protocol types for communication between the engine and macro
//! subprocesses.
//!
//! Macro subprocesses read [`MacroEvent`] objects from stdin (one JSON object
//! per line) and write [`MacroCommand`] objects to stdout (one JSON object
//! per line). Payload bytes travel as JSON number arrays so arbitrary binary
//! values 0–255 survive the trip.

use serde::{Deserialize, Serialize};

/// An event sent from the engine to a macro subprocess (via stdin).
///
/// Tagged with `type` for easy JSON dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MacroEvent {
    /// First event of every run: snapshot of the tab buffer at start time.
    Start {
        /// Tab buffer contents when the macro was started.
        buffer: Vec<u8>,
    },

    /// A live byte arrived from the transport.
    Byte {
        /// The byte value.
        value: u8,
    },
}

/// A command sent from a macro subprocess to the engine (via stdout).
///
/// Tagged with `type` for easy JSON dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MacroCommand {
    /// Send bytes out through the tab's transport.
    Send {
        /// Bytes to transmit.
        data: Vec<u8>,
    },

    /// Replace the tab's buffer wholesale.
    SetBuffer {
        /// New buffer contents.
        data: Vec<u8>,
    },

    /// Log a message through the engine's logger.
    Log {
        /// Log level (e.g., "info", "warn", "error", "debug").
        level: String,
        /// Log message.
        message: String,
    },

    /// Finish the macro run normally, without waiting for process exit.
    Done {},
}
