//! External-process filter pipeline.
//!
//! Transforms a tab's raw buffer through a user-configured shell command:
//! the buffer is written to the command's stdin while two reader threads
//! drain stdout and stderr concurrently, so a command that floods its
//! output pipe before consuming all of its input cannot deadlock against
//! the writer.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;

use crate::codec::code_page;

/// Result of one filter run.
pub struct FilterOutcome {
    /// Display text: decoded stdout, a newline, then decoded stderr.
    /// On a pass-through run, just the decoded buffer. On a launch
    /// failure, a `"Filter Error: ..."` description.
    pub text: String,
    /// Raw stdout bytes of the external command, kept so the buffer can
    /// later be overwritten with the filtered data. `None` when no command
    /// ran (pass-through or launch failure).
    pub raw: Option<Vec<u8>>,
}

/// Runs filter commands against byte buffers.
pub struct FilterPipeline;

impl FilterPipeline {
    /// Transform `buffer` through `command`.
    ///
    /// An empty (or blank) command decodes the buffer through the fixed
    /// code page instead of spawning anything. A command that cannot be
    /// started is reported in the display text, never raised; hung
    /// commands are the caller's trade-off (no timeout is imposed).
    pub fn run(buffer: &[u8], command: &str) -> FilterOutcome {
        if command.trim().is_empty() {
            return FilterOutcome {
                text: code_page::decode(buffer),
                raw: None,
            };
        }

        let mut child = match shell_command(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!("filter command {command:?} failed to start: {e}");
                return FilterOutcome {
                    text: format!("Filter Error: {e}"),
                    raw: None,
                };
            }
        };

        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return FilterOutcome {
                text: "Filter Error: failed to capture filter process pipes".to_string(),
                raw: None,
            };
        };

        // Drain both output pipes concurrently while this thread writes
        // stdin; see module docs for the deadlock this avoids.
        let stdout_thread = spawn_pipe_reader(stdout);
        let stderr_thread = spawn_pipe_reader(stderr);

        if let Err(e) = stdin.write_all(buffer) {
            // Commands like `head` legitimately stop reading early.
            log::debug!("filter command {command:?} closed stdin early: {e}");
        }
        drop(stdin);

        let raw = stdout_thread.join().unwrap_or_default();
        let errors = stderr_thread.join().unwrap_or_default();
        let status = child.wait().ok();

        // The shell reports a missing command itself (127 on POSIX sh,
        // 9009 on cmd.exe) instead of failing to spawn. Surface that as a
        // launch failure so stale filter output is never overwritten by
        // the empty stdout of a command that never existed. A filter that
        // produced output before propagating 127 from some sub-command is
        // a real run and keeps it.
        if raw.is_empty() && status.is_some_and(|s| matches!(s.code(), Some(127) | Some(9009))) {
            let cause = code_page::decode(&errors);
            return FilterOutcome {
                text: format!("Filter Error: {}", cause.trim()),
                raw: None,
            };
        }

        let mut text = code_page::decode(&raw);
        text.push('\n');
        text.push_str(&code_page::decode(&errors));

        FilterOutcome {
            text,
            raw: Some(raw),
        }
    }
}

/// Build the platform shell invocation for a filter command string.
#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

/// Reader thread collecting an entire pipe to a byte vector.
fn spawn_pipe_reader(mut pipe: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut data = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut data) {
            log::warn!("error draining filter pipe: {e}");
        }
        data
    })
}
