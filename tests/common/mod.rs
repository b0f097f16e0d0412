//! Shared test doubles for the engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytebench::scripting::context::{MacroContext, TabHandle};
use bytebench::scripting::error::ScriptError;
use bytebench::scripting::script::{Script, ScriptFactory};
use bytebench::tab::TabMode;
use bytebench::traits::{TabView, Transport};

/// Transport that records every outbound send.
pub struct RecordingTransport {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}

/// View sink that records every incremental echo.
pub struct RecordingView {
    echoes: Mutex<Vec<(TabMode, String)>>,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            echoes: Mutex::new(Vec::new()),
        })
    }

    pub fn echoes(&self) -> Vec<(TabMode, String)> {
        self.echoes.lock().unwrap().clone()
    }

    /// Concatenation of all echoed text, ignoring modes.
    pub fn text(&self) -> String {
        self.echoes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.as_str())
            .collect()
    }
}

impl TabView for RecordingView {
    fn show_incoming(&self, mode: TabMode, text: &str) {
        self.echoes.lock().unwrap().push((mode, text.to_string()));
    }
}

/// Standalone tab surface for driving the executor without a full `Tab`.
pub struct TestTabHandle {
    pub buffer: Mutex<Vec<u8>>,
    pub sent: Mutex<Vec<Vec<u8>>>,
}

impl TestTabHandle {
    pub fn new(initial: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            buffer: Mutex::new(initial),
            sent: Mutex::new(Vec::new()),
        })
    }
}

impl TabHandle for TestTabHandle {
    fn send(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn buffer(&self) -> Vec<u8> {
        self.buffer.lock().unwrap().clone()
    }

    fn set_buffer(&self, bytes: Vec<u8>) {
        *self.buffer.lock().unwrap() = bytes;
    }
}

/// Factory that hands out a single pre-built script, ignoring the source.
pub struct FixedFactory {
    script: Mutex<Option<Box<dyn Script>>>,
}

impl FixedFactory {
    pub fn new(script: Box<dyn Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Some(script)),
        })
    }
}

impl ScriptFactory for FixedFactory {
    fn compile(&self, _source: &str) -> Result<Box<dyn Script>, ScriptError> {
        self.script
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ScriptError::Parse("fixed factory already consumed".to_string()))
    }
}

/// Script that drains its byte queue into a shared record until cancelled.
pub struct DrainScript {
    pub seen: Arc<Mutex<Vec<u8>>>,
}

impl DrainScript {
    pub fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl Script for DrainScript {
    fn run(&mut self, ctx: &mut MacroContext) -> Result<(), ScriptError> {
        while let Some(byte) = ctx.recv_byte() {
            self.seen.lock().unwrap().push(byte);
        }
        Ok(())
    }
}

/// True while a process with the given pid exists (signal 0 probe).
#[cfg(unix)]
pub fn process_alive(pid: &str) -> bool {
    std::process::Command::new("kill")
        .args(["-0", pid])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
