//! The capability boundary between the tab engine and macro logic.
//!
//! The engine never knows what a macro *is* — it only knows how to run one.
//! A [`ScriptFactory`] turns the tab's macro source text into a [`Script`],
//! and the executor drives the script on its own thread with a
//! [`MacroContext`](crate::context::MacroContext) as its only window onto the
//! tab.

use crate::context::MacroContext;
use crate::error::ScriptError;

/// Executable macro logic.
///
/// `run` is invoked once on a dedicated worker thread. Implementations must
/// treat the context's queue reads as cancellation checkpoints: when
/// [`MacroContext::recv_byte`](crate::context::MacroContext::recv_byte)
/// returns `None` the macro has been cancelled (or the tab is gone) and
/// `run` should return promptly.
pub trait Script: Send {
    /// Execute the macro against the given context.
    ///
    /// # Errors
    /// Returns a [`ScriptError`] on runtime failure; the executor reports it
    /// to the owning tab and the engine keeps running.
    fn run(&mut self, ctx: &mut MacroContext) -> Result<(), ScriptError>;
}

/// Compiles macro source text into executable [`Script`] logic.
///
/// The concrete scripting mechanism is pluggable; the default is
/// [`ProcessScriptFactory`](crate::process::ProcessScriptFactory), which runs
/// the source as an isolated subprocess.
pub trait ScriptFactory: Send + Sync {
    /// Turn `source` into a script ready to run.
    ///
    /// # Errors
    /// Returns [`ScriptError::Parse`] when the source is not usable.
    fn compile(&self, source: &str) -> Result<Box<dyn Script>, ScriptError>;
}
