mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytebench::scripting::context::MacroContext;
use bytebench::scripting::error::ScriptError;
use bytebench::scripting::executor::MacroExecutor;
use bytebench::scripting::script::Script;

use common::{DrainScript, TestTabHandle, wait_until};

#[test]
fn test_spawn_returns_immediately_and_finishes() {
    struct Immediate;
    impl Script for Immediate {
        fn run(&mut self, _ctx: &mut MacroContext) -> Result<(), ScriptError> {
            Ok(())
        }
    }

    let handle = MacroExecutor::spawn(Box::new(Immediate), TestTabHandle::new(vec![])).unwrap();
    assert!(wait_until(Duration::from_secs(2), || !handle.is_running()));

    let mut handle = handle;
    handle.wait();
    assert!(matches!(handle.take_result(), Some(Ok(()))));
    // One-shot: the outcome is consumed.
    assert!(handle.take_result().is_none());
}

#[test]
fn test_kill_is_observed_at_queue_checkpoints() {
    let (script, seen) = DrainScript::new();
    let handle = MacroExecutor::spawn(Box::new(script), TestTabHandle::new(vec![])).unwrap();
    assert!(handle.is_running());

    handle.push_byte(0x01);
    assert!(wait_until(Duration::from_secs(2), || {
        seen.lock().unwrap().len() == 1
    }));

    handle.kill();
    // kill() is a signal, not a join; termination follows promptly.
    assert!(wait_until(Duration::from_secs(2), || !handle.is_running()));

    // Killing a dead worker is a no-op.
    handle.kill();

    let mut handle = handle;
    handle.wait();
    assert!(matches!(handle.take_result(), Some(Ok(()))));
}

#[test]
fn test_queue_preserves_order_without_loss() {
    let (script, seen) = DrainScript::new();
    let handle = MacroExecutor::spawn(Box::new(script), TestTabHandle::new(vec![])).unwrap();

    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    for &byte in &payload {
        handle.push_byte(byte);
    }

    assert!(wait_until(Duration::from_secs(5), || {
        seen.lock().unwrap().len() == payload.len()
    }));
    assert_eq!(seen.lock().unwrap().as_slice(), payload.as_slice());

    handle.kill();
}

#[test]
fn test_panicking_script_reports_runtime_error() {
    struct Panicking;
    impl Script for Panicking {
        fn run(&mut self, _ctx: &mut MacroContext) -> Result<(), ScriptError> {
            panic!("script bug");
        }
    }

    let mut handle =
        MacroExecutor::spawn(Box::new(Panicking), TestTabHandle::new(vec![])).unwrap();
    assert!(wait_until(Duration::from_secs(2), || !handle.is_running()));
    handle.wait();
    match handle.take_result() {
        Some(Err(ScriptError::Runtime(msg))) => assert!(msg.contains("panicked")),
        other => panic!("expected runtime error, got: {other:?}"),
    }
}

#[test]
fn test_context_exposes_tab_capabilities() {
    struct Capabilities;
    impl Script for Capabilities {
        fn run(&mut self, ctx: &mut MacroContext) -> Result<(), ScriptError> {
            let mut buffer = ctx.buffer();
            buffer.reverse();
            ctx.set_buffer(buffer);
            ctx.send(&[0x42])?;
            Ok(())
        }
    }

    let tab = TestTabHandle::new(vec![1, 2, 3]);
    let mut handle = MacroExecutor::spawn(Box::new(Capabilities), tab.clone()).unwrap();
    handle.wait();
    assert!(matches!(handle.take_result(), Some(Ok(()))));
    assert_eq!(*tab.buffer.lock().unwrap(), vec![3, 2, 1]);
    assert_eq!(*tab.sent.lock().unwrap(), vec![vec![0x42]]);
}

#[test]
fn test_drop_cancels_and_joins() {
    struct UntilCancelled(Arc<AtomicBool>);
    impl Script for UntilCancelled {
        fn run(&mut self, ctx: &mut MacroContext) -> Result<(), ScriptError> {
            while ctx.recv_byte().is_some() {}
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    let exited = Arc::new(AtomicBool::new(false));
    let handle = MacroExecutor::spawn(
        Box::new(UntilCancelled(Arc::clone(&exited))),
        TestTabHandle::new(vec![]),
    )
    .unwrap();
    assert!(handle.is_running());

    drop(handle);
    assert!(
        exited.load(Ordering::SeqCst),
        "drop must block until the worker has terminated"
    );
}
