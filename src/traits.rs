//! Shared trait definitions for bytebench collaborators.
//!
//! These traits document the contracts between the engine and the pieces it
//! deliberately does not implement — the communication transport and the
//! presentation layer — and enable mock implementations for unit testing
//! the tab engine without a live serial port or a UI toolkit.

use crate::tab::TabMode;

/// Outbound byte delivery.
///
/// Implemented by whatever owns the actual communication channel (serial,
/// TCP, a PTY, a loopback in tests). The engine only ever calls `send`;
/// inbound bytes are pushed into the engine via
/// [`Tab::append_byte`](crate::tab::Tab::append_byte) from the transport's
/// own reader.
pub trait Transport: Send + Sync {
    /// Deliver `bytes` to the remote end.
    ///
    /// # Errors
    /// I/O failure of the underlying channel. The engine surfaces the error
    /// to the caller of the triggering operation and carries on.
    fn send(&self, bytes: &[u8]) -> std::io::Result<()>;
}

/// Incremental display sink for live incoming bytes.
///
/// `show_incoming` is invoked from whichever thread calls `append_byte`, so
/// implementations must be thread-safe. Full-view refreshes go through
/// [`Tab::render`](crate::tab::Tab::render) instead; this trait only covers
/// the per-byte echo in EDIT mode (hex) and unfiltered FILTER mode (code
/// page text).
pub trait TabView: Send + Sync {
    /// Append `text` to the view for `mode`.
    fn show_incoming(&self, mode: TabMode, text: &str);
}
