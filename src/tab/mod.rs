//! Tab management for the multi-tab byte workbench.
//!
//! This module provides the core tab infrastructure:
//! - `Tab`: one unit of buffer + mode + configuration, with byte routing,
//!   filter invocation, and macro lifecycle
//! - `TabManager`: coordinates multiple tabs within a workbench
//! - `TabId`: unique identifier for each tab

mod manager;

pub use manager::TabManager;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::{code_page, hex};
use crate::error::{EngineError, ScriptError};
use crate::filter::FilterPipeline;
use crate::scripting::context::TabHandle;
use crate::scripting::executor::{MacroExecutor, MacroHandle};
use crate::scripting::process::ProcessScriptFactory;
use crate::scripting::script::ScriptFactory;
use crate::traits::{TabView, Transport};

/// Unique identifier for each tab.
pub type TabId = u64;

/// The active view/edit mode of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabMode {
    /// Raw byte editing as a hex dump.
    #[default]
    Edit,
    /// Read-only view of the buffer through the filter command.
    Filter,
    /// Automation script view.
    Macro,
}

impl TabMode {
    /// Human-readable mode name for tab headings.
    pub fn name(self) -> &'static str {
        match self {
            TabMode::Edit => "Editing",
            TabMode::Filter => "Filtered",
            TabMode::Macro => "Macro",
        }
    }
}

/// Byte buffer shared between the tab and a live macro worker.
type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// The capability surface handed to a macro worker: buffer access plus
/// outbound send, nothing else.
struct TabLink {
    buffer: SharedBuffer,
    transport: Arc<dyn Transport>,
}

impl TabHandle for TabLink {
    fn send(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.transport.send(bytes)
    }

    fn buffer(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    fn set_buffer(&self, bytes: Vec<u8>) {
        *self.buffer.lock() = bytes;
    }
}

/// One workbench tab: byte buffer, mode, per-mode configuration, and the
/// orchestration of filter runs and macro execution.
pub struct Tab {
    /// Unique identifier for this tab.
    pub id: TabId,
    /// Tab title ("Tab N" by default).
    pub title: String,
    /// Active mode; switched by the user, default EDIT.
    mode: TabMode,
    /// The byte buffer, shared with a live macro worker's `TabHandle`.
    buffer: SharedBuffer,
    /// Shell command for the filter pipeline; empty = pass-through decode.
    filter_command: String,
    /// Raw stdout of the most recent filter run, for buffer overwrite.
    last_filter_output: Option<Vec<u8>>,
    /// Key name that triggers macro execution; empty = no hotkey.
    macro_binding: String,
    /// The automation script source.
    macro_source: String,
    /// Handle to the live macro worker, if one is running (at most one).
    macro_task: Option<MacroHandle>,
    /// Outbound byte channel.
    transport: Arc<dyn Transport>,
    /// Incremental display sink for live bytes, if attached.
    view: Option<Arc<dyn TabView>>,
    /// Turns macro source text into executable scripts.
    script_factory: Arc<dyn ScriptFactory>,
}

impl Tab {
    /// Create a tab with an empty buffer and empty configuration.
    ///
    /// `tab_number` seeds the default "Tab N" title. The default script
    /// factory runs macros as isolated subprocesses; swap it with
    /// [`set_script_factory`](Self::set_script_factory).
    pub fn new(id: TabId, tab_number: usize, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            title: format!("Tab {tab_number}"),
            mode: TabMode::default(),
            buffer: Arc::new(Mutex::new(Vec::new())),
            filter_command: String::new(),
            last_filter_output: None,
            macro_binding: String::new(),
            macro_source: String::new(),
            macro_task: None,
            transport,
            view: None,
            script_factory: Arc::new(ProcessScriptFactory),
        }
    }

    /// Attach an incremental display sink for live bytes.
    pub fn set_view(&mut self, view: Arc<dyn TabView>) {
        self.view = Some(view);
    }

    /// Replace the scripting mechanism used by `start_macro`.
    pub fn set_script_factory(&mut self, factory: Arc<dyn ScriptFactory>) {
        self.script_factory = factory;
    }

    // ── Mode machine ─────────────────────────────────────────────────────

    /// Switch the active mode. Pure state change; the buffer is untouched.
    pub fn set_mode(&mut self, mode: TabMode) {
        self.mode = mode;
    }

    /// The currently active mode.
    pub fn mode(&self) -> TabMode {
        self.mode
    }

    // ── Byte ingestion ───────────────────────────────────────────────────

    /// Ingest one byte pushed from the transport.
    ///
    /// Appends to the buffer and, while a macro is live, enqueues the byte
    /// onto its queue under the same lock, so the buffer and the queue see
    /// the identical arrival order. Never blocks. Finally echoes the byte
    /// to the attached view: hex in EDIT mode, code page text in FILTER
    /// mode when no filter command is configured.
    pub fn append_byte(&mut self, byte: u8) {
        {
            let mut buffer = self.buffer.lock();
            buffer.push(byte);
            if let Some(task) = &self.macro_task
                && task.is_running()
            {
                task.push_byte(byte);
            }
        }

        if let Some(view) = &self.view {
            match self.mode {
                TabMode::Edit => view.show_incoming(TabMode::Edit, &format!("{byte:02x} ")),
                TabMode::Filter if self.filter_command.is_empty() => {
                    let mut text = String::new();
                    text.push(code_page::decode_byte(byte));
                    view.show_incoming(TabMode::Filter, &text);
                }
                _ => {}
            }
        }
    }

    // ── Buffer operations ────────────────────────────────────────────────

    /// Snapshot of the current buffer contents.
    pub fn buffer(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    /// Replace the buffer from edited hex text (EDIT-mode commit).
    ///
    /// A no-op outside EDIT mode; mode misuse never corrupts state.
    ///
    /// # Errors
    /// [`EngineError::InvalidHex`] when the text is not a valid hex dump;
    /// the buffer is left unchanged.
    pub fn commit_edit(&mut self, text: &str) -> Result<(), EngineError> {
        if self.mode != TabMode::Edit {
            return Ok(());
        }
        let bytes = hex::decode(text)?;
        *self.buffer.lock() = bytes;
        Ok(())
    }

    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.buffer.lock().clear();
    }

    /// Hand the current buffer to the transport for outbound delivery.
    ///
    /// # Errors
    /// Propagates the transport's I/O error.
    pub fn reply(&self) -> Result<(), EngineError> {
        let snapshot = self.buffer.lock().clone();
        self.transport.send(&snapshot)?;
        Ok(())
    }

    // ── Filter pipeline ──────────────────────────────────────────────────

    /// Set the filter shell command (empty = pass-through decode).
    pub fn set_filter_command(&mut self, command: impl Into<String>) {
        self.filter_command = command.into();
    }

    /// The configured filter command.
    pub fn filter_command(&self) -> &str {
        &self.filter_command
    }

    /// Run the filter pipeline over the current buffer and return the
    /// display text. Caches the raw output for a later
    /// [`overwrite_from_filter`](Self::overwrite_from_filter); a launch
    /// failure or pass-through run leaves the cache untouched.
    pub fn run_filter(&mut self) -> String {
        // Snapshot first: the filter may run for a long time and the
        // ingestion path must never wait on it.
        let snapshot = self.buffer.lock().clone();
        let outcome = FilterPipeline::run(&snapshot, &self.filter_command);
        if let Some(raw) = outcome.raw {
            self.last_filter_output = Some(raw);
        }
        outcome.text
    }

    /// Replace the buffer with the most recent filter output.
    ///
    /// A no-op outside FILTER mode, or when no filter has produced output.
    pub fn overwrite_from_filter(&mut self) {
        if self.mode != TabMode::Filter {
            return;
        }
        if let Some(output) = &self.last_filter_output
            && !output.is_empty()
        {
            *self.buffer.lock() = output.clone();
        }
    }

    /// Raw output of the most recent filter run, if any.
    pub fn last_filter_output(&self) -> Option<&[u8]> {
        self.last_filter_output.as_deref()
    }

    // ── Macro lifecycle ──────────────────────────────────────────────────

    /// Set the automation script source (MACRO-mode commit).
    pub fn set_macro_source(&mut self, source: impl Into<String>) {
        self.macro_source = source.into();
    }

    /// The automation script source.
    pub fn macro_source(&self) -> &str {
        &self.macro_source
    }

    /// Set the key name that triggers macro execution (empty = none).
    pub fn set_macro_binding(&mut self, binding: impl Into<String>) {
        self.macro_binding = binding.into();
    }

    /// True when `key` matches this tab's macro binding
    /// (case-insensitive; an empty binding matches nothing).
    pub fn matches_binding(&self, key: &str) -> bool {
        !self.macro_binding.is_empty() && self.macro_binding.eq_ignore_ascii_case(key)
    }

    /// True while a macro worker is live for this tab.
    pub fn macro_running(&self) -> bool {
        self.macro_task.as_ref().is_some_and(MacroHandle::is_running)
    }

    /// Start the macro from a snapshot of the current source.
    ///
    /// # Errors
    /// - [`EngineError::MacroBusy`] while a run is live (the existing task
    ///   keeps running, its handle untouched);
    /// - [`EngineError::EmptySource`] when there is nothing to run;
    /// - [`EngineError::Script`] when the source fails to compile or the
    ///   worker cannot be spawned.
    pub fn start_macro(&mut self) -> Result<(), EngineError> {
        if self.macro_running() {
            return Err(EngineError::MacroBusy);
        }
        if self.macro_source.trim().is_empty() {
            return Err(EngineError::EmptySource);
        }

        // A finished-but-unpolled handle is replaced below; its Drop joins
        // the dead worker.
        let script = self.script_factory.compile(&self.macro_source)?;
        let link = Arc::new(TabLink {
            buffer: Arc::clone(&self.buffer),
            transport: Arc::clone(&self.transport),
        });
        let handle = MacroExecutor::spawn(script, link)?;

        log::info!("tab {}: macro started", self.id);
        self.macro_task = Some(handle);
        Ok(())
    }

    /// Request cooperative cancellation of the live macro; no-op when idle.
    ///
    /// Returns immediately — termination is observed via
    /// [`macro_running`](Self::macro_running) / [`poll_macro`](Self::poll_macro).
    pub fn cancel_macro(&mut self) {
        if let Some(task) = &self.macro_task {
            log::info!("tab {}: macro cancellation requested", self.id);
            task.kill();
        }
    }

    /// Collect the outcome of a finished macro run.
    ///
    /// Returns `None` while the worker is still live (or none was started).
    /// Once the worker has terminated, joins it, clears the task slot so a
    /// fresh `start_macro` is permitted, and returns the run's result.
    pub fn poll_macro(&mut self) -> Option<Result<(), ScriptError>> {
        if self.macro_task.as_ref().is_some_and(MacroHandle::is_running) {
            return None;
        }
        let mut task = self.macro_task.take()?;
        task.wait();
        let result = task.take_result();
        if let Some(Err(e)) = &result {
            log::warn!("tab {}: macro failed: {e}", self.id);
        } else {
            log::debug!("tab {}: macro finished", self.id);
        }
        // A worker that was joined without ever storing a result still
        // counts as terminated.
        Some(result.unwrap_or(Ok(())))
    }

    // ── Rendering ────────────────────────────────────────────────────────

    /// Recompute the full display text for `mode` without mutating the
    /// buffer: EDIT renders the hex dump, FILTER runs the filter pipeline,
    /// MACRO shows the script source.
    pub fn render(&mut self, mode: TabMode) -> String {
        match mode {
            TabMode::Edit => hex::encode(&self.buffer.lock()),
            TabMode::Filter => self.run_filter(),
            TabMode::Macro => self.macro_source.clone(),
        }
    }
}

impl Drop for Tab {
    fn drop(&mut self) {
        if let Some(mut task) = self.macro_task.take() {
            log::info!("tab {}: cancelling macro on close", self.id);
            task.kill();
            // Confirmed termination before the buffer goes away; the
            // worker must not outlive the tab it writes into.
            task.wait();
        }
    }
}
