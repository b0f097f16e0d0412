//! Subprocess-backed macro scripts.
//!
//! [`ProcessScript`] runs macro logic as an isolated child process speaking
//! the JSON-lines protocol from [`protocol`](crate::protocol): the engine
//! writes [`MacroEvent`]s to the child's stdin and executes [`MacroCommand`]s
//! read from its stdout. Stderr lines are collected for error reporting.
//!
//! This deliberately replaces in-process execution of raw script text: the
//! child only ever sees the event stream and can only act through the
//! command vocabulary, so a misbehaving macro cannot reach into the engine.

use std::io::{BufRead, BufReader, Read, Write};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::context::MacroContext;
use crate::error::ScriptError;
use crate::protocol::{MacroCommand, MacroEvent};
use crate::script::{Script, ScriptFactory};

/// How long the run loop sleeps between servicing passes.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Compiles macro source text into a [`ProcessScript`].
///
/// Two source shapes are accepted:
/// - a single command line, split with `shell-words`
///   (e.g. `python3 /path/to/macro.py --fast`);
/// - a full script body starting with `#!`, which is materialised to a
///   temporary file and handed to the shebang interpreter.
pub struct ProcessScriptFactory;

impl ScriptFactory for ProcessScriptFactory {
    fn compile(&self, source: &str) -> Result<Box<dyn Script>, ScriptError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(ScriptError::Parse("macro source is empty".to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix("#!") {
            let interpreter_line = rest.lines().next().unwrap_or("").trim();
            let mut argv = shell_words::split(interpreter_line)
                .map_err(|e| ScriptError::Parse(e.to_string()))?;
            if argv.is_empty() {
                return Err(ScriptError::Parse(
                    "shebang line names no interpreter".to_string(),
                ));
            }

            let mut file = tempfile::NamedTempFile::new()?;
            file.write_all(source.as_bytes())?;
            file.flush()?;

            argv.push(file.path().display().to_string());
            let command = argv.remove(0);
            Ok(Box::new(ProcessScript {
                command,
                args: argv,
                script_file: Some(file),
            }))
        } else {
            if trimmed.lines().count() > 1 {
                return Err(ScriptError::Parse(
                    "multi-line macro source requires a #! interpreter on the first line"
                        .to_string(),
                ));
            }
            let mut argv =
                shell_words::split(trimmed).map_err(|e| ScriptError::Parse(e.to_string()))?;
            if argv.is_empty() {
                return Err(ScriptError::Parse("macro source is empty".to_string()));
            }
            let command = argv.remove(0);
            Ok(Box::new(ProcessScript {
                command,
                args: argv,
                script_file: None,
            }))
        }
    }
}

/// A macro implemented as a child process speaking the JSON-lines protocol.
pub struct ProcessScript {
    /// Command to execute.
    command: String,
    /// Arguments to pass to the command.
    args: Vec<String>,
    /// Keeps a shebang script body alive on disk for the process lifetime.
    script_file: Option<tempfile::NamedTempFile>,
}

impl ProcessScript {
    /// Create a script that runs `command` with `args` directly.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            script_file: None,
        }
    }

    /// Execute one command from the child. Returns `true` on `Done`.
    fn apply(command: MacroCommand, ctx: &MacroContext) -> Result<bool, ScriptError> {
        match command {
            MacroCommand::Send { data } => {
                ctx.send(&data)?;
                Ok(false)
            }
            MacroCommand::SetBuffer { data } => {
                ctx.set_buffer(data);
                Ok(false)
            }
            MacroCommand::Log { level, message } => {
                match level.as_str() {
                    "error" => log::error!("macro: {message}"),
                    "warn" => log::warn!("macro: {message}"),
                    "debug" => log::debug!("macro: {message}"),
                    _ => log::info!("macro: {message}"),
                }
                Ok(false)
            }
            MacroCommand::Done {} => Ok(true),
        }
    }
}

impl Script for ProcessScript {
    fn run(&mut self, ctx: &mut MacroContext) -> Result<(), ScriptError> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so teardown can signal forked grandchildren
        // too; a shell's `sleep` must not keep the output pipes open after
        // the shell itself is gone.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| ScriptError::Spawn {
            command: self.command.clone(),
            source: e,
        })?;

        let mut stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScriptError::Runtime("failed to capture macro stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ScriptError::Runtime("failed to capture macro stderr".to_string()))?;

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let stdout_thread = spawn_stdout_reader(stdout, cmd_tx);

        let error_lines: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let stderr_thread = spawn_stderr_reader(stderr, Arc::clone(&error_lines));

        // The child sees the buffer as it was when the run started; live
        // bytes follow as individual events.
        if let Some(writer) = stdin.as_mut()
            && write_event(writer, &MacroEvent::Start { buffer: ctx.buffer() }).is_err()
        {
            stdin = None;
        }

        let mut finished_normally = false;
        let mut exit_status: Option<ExitStatus> = None;
        let mut run_error: Option<ScriptError> = None;

        loop {
            if ctx.cancelled() {
                break;
            }

            // Forward live bytes to the child. A write failure means the
            // child closed its stdin; the exit check below picks that up.
            while let Some(byte) = ctx.try_recv_byte() {
                let Some(writer) = stdin.as_mut() else { break };
                if write_event(writer, &MacroEvent::Byte { value: byte }).is_err() {
                    stdin = None;
                    break;
                }
            }

            // Command application failures do not return here: the child
            // must still go through teardown below.
            while let Ok(command) = cmd_rx.try_recv() {
                match Self::apply(command, ctx) {
                    Ok(true) => finished_normally = true,
                    Ok(false) => {}
                    Err(e) => {
                        run_error = Some(e);
                        break;
                    }
                }
            }
            if finished_normally || run_error.is_some() {
                break;
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    exit_status = Some(status);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    run_error = Some(ScriptError::Io(e));
                    break;
                }
            }

            std::thread::sleep(POLL_INTERVAL);
        }

        // Teardown: EOF the child's stdin, take down its process group, and
        // reap it. Killing the whole group (not just the direct child)
        // closes every inherited copy of the output pipes, so the reader
        // joins below cannot hang on a forked grandchild.
        drop(stdin.take());
        if exit_status.is_none() {
            kill_child_group(&mut child);
            exit_status = child.wait().ok();
        }
        if stdout_thread.join().is_err() {
            log::warn!("macro stdout reader thread panicked");
        }
        if stderr_thread.join().is_err() {
            log::warn!("macro stderr reader thread panicked");
        }

        if let Some(e) = run_error {
            return Err(e);
        }

        // Commands emitted just before exit may still be queued.
        if !ctx.cancelled() {
            while let Ok(command) = cmd_rx.try_recv() {
                if Self::apply(command, ctx)? {
                    finished_normally = true;
                }
            }
        }

        if ctx.cancelled() || finished_normally {
            return Ok(());
        }

        match exit_status {
            Some(status) if status.success() => Ok(()),
            Some(status) => {
                let errors = error_lines
                    .lock()
                    .unwrap_or_else(|e| {
                        log::warn!("macro stderr buffer poisoned, recovering");
                        e.into_inner()
                    })
                    .join("\n");
                Err(ScriptError::Runtime(format!(
                    "macro process exited with {status}: {errors}"
                )))
            }
            None => Ok(()),
        }
    }
}

/// Terminate the child and everything it forked.
///
/// The child was spawned as the leader of its own process group, so its pid
/// doubles as the pgid and signalling the group reaches grandchildren that
/// inherited the stdio pipes.
#[cfg(unix)]
fn kill_child_group(child: &mut Child) {
    let pgid = child.id() as i32;
    // SAFETY: plain syscall with no pointer arguments; a negative pid
    // addresses the process group.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_child_group(child: &mut Child) {
    let _ = child.kill();
}

/// Serialize an event and write it to the child as a JSON line.
fn write_event(writer: &mut impl Write, event: &MacroEvent) -> std::io::Result<()> {
    let json = serde_json::to_string(event).map_err(std::io::Error::other)?;
    writeln!(writer, "{json}")?;
    writer.flush()
}

/// Reader thread: parse JSON lines from the child's stdout into commands.
fn spawn_stdout_reader(
    stdout: impl Read + Send + 'static,
    commands: Sender<MacroCommand>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<MacroCommand>(&text) {
                        Ok(command) => {
                            if commands.send(command).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            log::warn!(
                                "macro stdout line is not a valid command: {e}: {text:?}"
                            );
                        }
                    }
                }
                Err(e) => {
                    log::warn!("error reading macro stdout: {e}");
                    break;
                }
            }
        }
    })
}

/// Reader thread: collect stderr lines for error reporting.
fn spawn_stderr_reader(
    stderr: impl Read + Send + 'static,
    buffer: Arc<Mutex<Vec<String>>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stderr).lines() {
            match line {
                Ok(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    let mut buf = buffer.lock().unwrap_or_else(|e| {
                        log::warn!("macro stderr buffer poisoned, recovering");
                        e.into_inner()
                    });
                    buf.push(text);
                }
                Err(e) => {
                    log::warn!("error reading macro stderr: {e}");
                    break;
                }
            }
        }
    })
}
