//! End-to-end tests for the sandbox core's isolation and relay contracts.
//!
//! These exercise the public API only: construct instances, run guest
//! source, and observe what the output callbacks receive.

use std::sync::Arc;
use std::time::Duration;

use playbox::prelude::*;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Build a scoped sandbox on a dedicated transport, collecting callback
/// deliveries into a channel.
fn test_sandbox(transport: &Transport) -> (Sandbox, mpsc::UnboundedReceiver<LogEntry>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let options = SandboxOptions::new(move |entry| {
        let _ = tx.send(entry);
    })
    .transport(transport.clone());
    (Sandbox::scoped(options), rx)
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<LogEntry>) -> LogEntry {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for log entry")
        .expect("callback channel closed")
}

async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<LogEntry>) {
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(rx.try_recv().is_err(), "unexpected log entry delivered");
}

/// Guest code cannot leak globals into another instance's context: each run
/// evaluates in a fresh, private execution context.
#[tokio::test]
async fn test_isolation_between_instances() {
    let transport = Transport::new(64);
    let (mut a, mut rx_a) = test_sandbox(&transport);
    let (mut b, mut rx_b) = test_sandbox(&transport);

    a.run("globalThis.leaked = 'secret'; console.log('planted')");
    assert_eq!(recv(&mut rx_a).await.message, "planted");

    b.run("console.log(typeof globalThis.leaked)");
    assert_eq!(recv(&mut rx_b).await.message, "undefined");
}

/// Output from instance A's guest code is delivered only to A's callback,
/// never B's, across interleaved runs on one shared transport.
#[tokio::test]
async fn test_token_correctness_under_concurrency() {
    let transport = Transport::new(256);
    let (mut a, mut rx_a) = test_sandbox(&transport);
    let (mut b, mut rx_b) = test_sandbox(&transport);

    a.run("console.log('a1')");
    assert_eq!(recv(&mut rx_a).await.message, "a1");
    b.run("console.log('b1')");
    assert_eq!(recv(&mut rx_b).await.message, "b1");
    a.run("console.log('a2')");
    assert_eq!(recv(&mut rx_a).await.message, "a2");

    assert_silent(&mut rx_a).await;
    assert_silent(&mut rx_b).await;
}

/// The §8 two-token scenario: `t1` logs arithmetic, `t2` in parallel emits
/// an error; each callback sees exactly its own instance's output.
#[tokio::test]
async fn test_parallel_instances_scenario() {
    let transport = Transport::new(64);
    let (mut t1, mut rx1) = test_sandbox(&transport);
    let (mut t2, mut rx2) = test_sandbox(&transport);

    t1.run("console.log(1 + 1)");
    t2.run("console.error('x')");

    let first = recv(&mut rx1).await;
    assert_eq!(first.level, LogLevel::Log);
    assert_eq!(first.message, "2");

    let second = recv(&mut rx2).await;
    assert_eq!(second.level, LogLevel::Error);
    assert_eq!(second.message, "x");

    assert_silent(&mut rx1).await;
    assert_silent(&mut rx2).await;
}

/// Logging `undefined`, `null`, a number and a plain object yields their
/// display-string forms; the capture shim itself never throws.
#[tokio::test]
async fn test_stringification_invariant() {
    let transport = Transport::new(64);
    let (mut sandbox, mut rx) = test_sandbox(&transport);

    sandbox.run("console.log(undefined); console.log(null); console.log(3.5); console.log({})");

    assert_eq!(recv(&mut rx).await.message, "undefined");
    assert_eq!(recv(&mut rx).await.message, "null");
    assert_eq!(recv(&mut rx).await.message, "3.5");
    assert_eq!(recv(&mut rx).await.message, "[object Object]");
}

/// Multiple arguments arrive as one entry with newline-joined message.
#[tokio::test]
async fn test_arguments_joined_by_newline() {
    let transport = Transport::new(64);
    let (mut sandbox, mut rx) = test_sandbox(&transport);

    sandbox.run("console.log('value:', 42)");
    assert_eq!(recv(&mut rx).await.message, "value:\n42");
}

/// Calling destroy twice produces no error and leaves no residual listener.
#[tokio::test]
async fn test_idempotent_teardown() {
    let transport = Transport::new(64);
    let (mut sandbox, mut rx) = test_sandbox(&transport);

    sandbox.run("console.log('before teardown')");
    assert_eq!(recv(&mut rx).await.message, "before teardown");

    sandbox.destroy();
    sandbox.destroy();

    sandbox.run("console.log('after teardown')");
    assert_silent(&mut rx).await;
}

/// Re-running with different source replaces the context outright: the
/// second run's output contains nothing only the first run's code produced.
#[tokio::test]
async fn test_full_reload_semantics() {
    let transport = Transport::new(64);
    let (mut sandbox, mut rx) = test_sandbox(&transport);

    sandbox.run("globalThis.marker = 'stale'; console.log('run-one')");
    assert_eq!(recv(&mut rx).await.message, "run-one");

    sandbox.run("console.log('run-two:' + typeof globalThis.marker)");
    assert_eq!(recv(&mut rx).await.message, "run-two:undefined");
    assert_silent(&mut rx).await;
}

/// A synchronous guest throw produces exactly one error entry carrying the
/// thrown message, and the host observes no uncaught exception.
#[tokio::test]
async fn test_error_capture() {
    let transport = Transport::new(64);
    let (mut sandbox, mut rx) = test_sandbox(&transport);

    sandbox.run("throw new Error('guest blew up')");

    let entry = recv(&mut rx).await;
    assert_eq!(entry.level, LogLevel::Error);
    assert_eq!(entry.message, "guest blew up");
    assert_silent(&mut rx).await;
}

/// Output produced before a throw is kept, in emission order.
#[tokio::test]
async fn test_partial_output_before_error() {
    let transport = Transport::new(64);
    let (mut sandbox, mut rx) = test_sandbox(&transport);

    sandbox.run("console.log('step 1'); console.warn('step 2'); missing_function()");

    assert_eq!(recv(&mut rx).await.message, "step 1");
    let warn = recv(&mut rx).await;
    assert_eq!(warn.level, LogLevel::Warn);
    assert_eq!(warn.message, "step 2");
    let error = recv(&mut rx).await;
    assert_eq!(error.level, LogLevel::Error);
    assert!(error.message.contains("missing_function"));
}

/// Unrelated payload shapes on the shared transport are ignored, not
/// treated as malformed input.
#[tokio::test]
async fn test_foreign_payloads_ignored() {
    let transport = Transport::new(64);
    let (mut sandbox, mut rx) = test_sandbox(&transport);

    transport.post(serde_json::json!({ "kind": "navigation", "href": "/about" }));
    transport.post(serde_json::json!([1, 2, 3]));

    sandbox.run("console.log('still works')");
    assert_eq!(recv(&mut rx).await.message, "still works");
    assert_silent(&mut rx).await;
}

/// `info` and `debug` display as `log` but keep their original method name.
#[tokio::test]
async fn test_method_preservation() {
    let transport = Transport::new(64);
    let (mut sandbox, mut rx) = test_sandbox(&transport);

    sandbox.run("console.info('details'); console.debug('internals')");

    let info = recv(&mut rx).await;
    assert_eq!(info.level, LogLevel::Log);
    assert_eq!(info.method, "info");
    let debug = recv(&mut rx).await;
    assert_eq!(debug.level, LogLevel::Log);
    assert_eq!(debug.method, "debug");
}

/// Tokens are unique across concurrently-live instances.
#[tokio::test]
async fn test_tokens_are_unique() {
    let transport = Transport::new(64);
    let sandboxes: Vec<_> = (0..8)
        .map(|_| {
            let options =
                SandboxOptions::new(|_entry| {}).transport(transport.clone());
            Sandbox::scoped(options)
        })
        .collect();

    let mut tokens: Vec<_> = sandboxes
        .iter()
        .map(|s| s.token().as_str().to_string())
        .collect();
    tokens.sort();
    tokens.dedup();
    assert_eq!(tokens.len(), 8);
}

/// Dropping a sandbox tears it down; pending matching events are not
/// delivered afterwards.
#[tokio::test]
async fn test_drop_releases_listener() {
    let transport = Transport::new(64);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let token;
    {
        let options = SandboxOptions::new(move |entry: LogEntry| {
            let _ = tx.send(entry);
        })
        .transport(transport.clone());
        let sandbox = Sandbox::scoped(options);
        token = sandbox.token().as_str().to_string();
    }

    transport.post(serde_json::json!({
        "kind": "console",
        "method": "log",
        "token": token,
        "args": ["posthumous"],
    }));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(rx.try_recv().is_err());
}

/// Many interleaved runs across two instances never cross-deliver.
#[tokio::test]
async fn test_interleaved_runs_stay_attributed() {
    let transport = Transport::new(512);
    let (mut a, mut rx_a) = test_sandbox(&transport);
    let (mut b, mut rx_b) = test_sandbox(&transport);

    for i in 0..5 {
        a.run(&format!("console.log('a-{i}')"));
        assert_eq!(recv(&mut rx_a).await.message, format!("a-{i}"));
        b.run(&format!("console.log('b-{i}')"));
        assert_eq!(recv(&mut rx_b).await.message, format!("b-{i}"));
    }
    assert_silent(&mut rx_a).await;
    assert_silent(&mut rx_b).await;
}

/// The widget-facing callback shape survives a shared Arc'd callback.
#[tokio::test]
async fn test_shared_callback() {
    let transport = Transport::new(64);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let tx = Arc::new(tx);
    let options = SandboxOptions::new({
        let tx = Arc::clone(&tx);
        move |entry: LogEntry| {
            let _ = tx.send(entry);
        }
    })
    .transport(transport.clone());
    let mut sandbox = Sandbox::scoped(options);

    sandbox.run("console.log('shared')");
    assert_eq!(recv(&mut rx).await.message, "shared");
}
