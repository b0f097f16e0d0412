//! Execution context handed to a running macro.
//!
//! [`MacroContext`] bundles the three capabilities a macro is allowed to use:
//! the live byte queue fed by the tab's ingestion path, the tab surface
//! ([`TabHandle`]: send bytes, read/replace the buffer), and the cooperative
//! cancellation flag. Queue reads double as cancellation checkpoints.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// How often a blocking queue read wakes up to check the kill flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// The tab operations a macro may invoke.
///
/// Implemented by the engine; deliberately narrow (no mode switching, no
/// filter control, no access to other tabs).
pub trait TabHandle: Send + Sync {
    /// Hand bytes to the tab's transport for outbound delivery.
    ///
    /// # Errors
    /// Propagates the transport's I/O error.
    fn send(&self, bytes: &[u8]) -> std::io::Result<()>;

    /// Snapshot of the tab's current buffer.
    fn buffer(&self) -> Vec<u8>;

    /// Replace the tab's buffer wholesale.
    fn set_buffer(&self, bytes: Vec<u8>);
}

/// Per-run state owned by the macro worker thread.
pub struct MacroContext {
    /// Live byte queue; receives every byte the tab ingests while this
    /// macro is running, in arrival order.
    queue: Receiver<u8>,
    /// Cooperative cancellation flag shared with the owning handle.
    cancel: Arc<AtomicBool>,
    /// Capability surface onto the owning tab.
    tab: Arc<dyn TabHandle>,
}

impl MacroContext {
    pub(crate) fn new(queue: Receiver<u8>, cancel: Arc<AtomicBool>, tab: Arc<dyn TabHandle>) -> Self {
        Self { queue, cancel, tab }
    }

    /// Block until the next live byte arrives.
    ///
    /// Returns `None` once cancellation has been requested or the feeding
    /// side is gone; callers should unwind promptly in that case.
    pub fn recv_byte(&self) -> Option<u8> {
        loop {
            if self.cancelled() {
                return None;
            }
            match self.queue.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(byte) => return Some(byte),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Non-blocking queue read. `None` means no byte is pending (or the
    /// macro has been cancelled); it does not consume the cancellation state.
    pub fn try_recv_byte(&self) -> Option<u8> {
        if self.cancelled() {
            return None;
        }
        self.queue.try_recv().ok()
    }

    /// True once `kill()` has been requested on the owning handle.
    ///
    /// Long-running scripts should check this between steps.
    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Send bytes out through the tab's transport.
    ///
    /// # Errors
    /// Propagates the transport's I/O error.
    pub fn send(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.tab.send(bytes)
    }

    /// Snapshot of the tab's buffer.
    pub fn buffer(&self) -> Vec<u8> {
        self.tab.buffer()
    }

    /// Replace the tab's buffer.
    pub fn set_buffer(&self, bytes: Vec<u8>) {
        self.tab.set_buffer(bytes);
    }
}
