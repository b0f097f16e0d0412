//! One-shot background macro execution with cooperative cancellation.
//!
//! [`MacroExecutor::spawn`] runs a [`Script`] on a dedicated worker thread
//! and returns a [`MacroHandle`] immediately. The handle is the single point
//! of contact for the owning tab: it feeds live bytes to the worker's queue,
//! signals cancellation, and collects the final outcome.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::context::{MacroContext, TabHandle};
use crate::error::ScriptError;
use crate::script::Script;

/// Shared slot for the worker's final outcome.
type ResultSlot = Arc<Mutex<Option<Result<(), ScriptError>>>>;

/// Spawns macro worker threads.
pub struct MacroExecutor;

impl MacroExecutor {
    /// Start `script` on a new worker thread bound to `tab`.
    ///
    /// Returns immediately; the caller keeps the [`MacroHandle`] for the
    /// lifetime of the run.
    ///
    /// # Errors
    /// Returns an error only if the OS refuses to create the thread.
    pub fn spawn(
        mut script: Box<dyn Script>,
        tab: Arc<dyn TabHandle>,
    ) -> Result<MacroHandle, ScriptError> {
        let (queue_tx, queue_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let result: ResultSlot = Arc::new(Mutex::new(None));

        let worker_cancel = Arc::clone(&cancel);
        let worker_running = Arc::clone(&running);
        let worker_result = Arc::clone(&result);

        let thread = std::thread::Builder::new()
            .name("bytebench-macro".to_string())
            .spawn(move || {
                let mut ctx = MacroContext::new(queue_rx, worker_cancel, tab);
                // A panicking script must not take the engine down or leave
                // the tab looking busy forever.
                let outcome =
                    std::panic::catch_unwind(AssertUnwindSafe(|| script.run(&mut ctx)))
                        .unwrap_or_else(|_| {
                            Err(ScriptError::Runtime("macro panicked".to_string()))
                        });

                if let Err(e) = &outcome {
                    log::warn!("macro terminated with error: {e}");
                }

                let mut slot = worker_result.lock().unwrap_or_else(|e| {
                    log::warn!("macro result slot poisoned, recovering");
                    e.into_inner()
                });
                *slot = Some(outcome);
                drop(slot);

                worker_running.store(false, Ordering::SeqCst);
            })?;

        Ok(MacroHandle {
            queue_tx,
            cancel,
            running,
            result,
            thread: Some(thread),
        })
    }
}

/// Handle to a live (or finished) macro worker.
pub struct MacroHandle {
    /// Feeds live bytes into the worker's queue. Unbounded, so pushes never
    /// block the ingestion path.
    queue_tx: Sender<u8>,
    /// Cooperative kill flag observed at the worker's queue-read checkpoints.
    cancel: Arc<AtomicBool>,
    /// Cleared by the worker as its last action before exiting.
    running: Arc<AtomicBool>,
    /// Final outcome; populated exactly once when the worker finishes.
    result: ResultSlot,
    /// Join handle, consumed by `wait()`.
    thread: Option<JoinHandle<()>>,
}

impl MacroHandle {
    /// True while the worker thread is still executing the script.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Enqueue a live byte for the macro. Never blocks; silently dropped
    /// once the worker has terminated and released its receiver.
    pub fn push_byte(&self, byte: u8) {
        let _ = self.queue_tx.send(byte);
    }

    /// Request cooperative cancellation and return immediately.
    ///
    /// The worker observes the flag at its next queue-read checkpoint.
    /// Idempotent; a no-op once the worker has already terminated.
    pub fn kill(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Block until the worker thread has fully terminated.
    pub fn wait(&mut self) {
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::warn!("macro worker thread panicked during join");
        }
    }

    /// Take the final outcome, if the worker has produced one.
    ///
    /// One-shot: returns `Some` at most once per run.
    pub fn take_result(&self) -> Option<Result<(), ScriptError>> {
        let mut slot = self.result.lock().unwrap_or_else(|e| {
            log::warn!("macro result slot poisoned, recovering");
            e.into_inner()
        });
        slot.take()
    }
}

impl Drop for MacroHandle {
    fn drop(&mut self) {
        self.kill();
        self.wait();
    }
}
