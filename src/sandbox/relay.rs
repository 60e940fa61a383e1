//! Output relay: the page-wide message transport and per-instance listeners.
//!
//! Every execution context posts its captured console calls onto one shared
//! transport. Each sandbox instance subscribes with its own listener that
//! filters by correlation token, so any number of concurrent instances can
//! share the transport without cross-talk. The relay itself keeps no
//! registry; a listener is just a task holding a receiver, released on
//! teardown.

use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{trace, warn};
use uuid::Uuid;

/// Payload kind for console-capture messages. Other kinds on the transport
/// belong to unrelated concerns and are ignored.
pub const CONSOLE_KIND: &str = "console";

/// Opaque per-instance correlation token.
///
/// Generated at sandbox construction and fixed for the instance's lifetime;
/// every event emitted by the instance's execution context carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Generate a fresh token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The token's string form, as embedded into bootstrap documents.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One captured console call crossing the isolation boundary.
///
/// All argument values are stringified inside the execution context before
/// the event is posted; object identity does not survive the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputEvent {
    /// Message kind discriminator; always `console` for this subsystem.
    pub kind: String,
    /// The console method the guest invoked (`log`, `error`, `warn`, ...).
    /// Preserved verbatim even for methods outside the display set.
    pub method: String,
    /// Correlation token of the emitting instance.
    pub token: String,
    /// Stringified call arguments, in order.
    pub args: Vec<String>,
}

impl OutputEvent {
    /// Build an `error`-method event, used for guest exceptions and for
    /// host-synthesized failures that must flow through the same path.
    pub fn error(token: &Token, message: impl Into<String>) -> Self {
        Self {
            kind: CONSOLE_KIND.to_string(),
            method: "error".to_string(),
            token: token.as_str().to_string(),
            args: vec![message.into()],
        }
    }
}

/// Display level of a log entry.
///
/// Methods outside the `log`/`warn`/`error` display set (e.g. `info`,
/// `debug`) collapse to [`LogLevel::Log`]; the original method name stays
/// available on [`LogEntry::method`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Log,
    Warn,
    Error,
}

impl LogLevel {
    fn from_method(method: &str) -> Self {
        match method {
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Log,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Log => "log",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// A validated output event as delivered to the owning widget's callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Display level.
    pub level: LogLevel,
    /// Original console method name.
    pub method: String,
    /// Arguments joined by newline.
    pub message: String,
}

impl From<OutputEvent> for LogEntry {
    fn from(event: OutputEvent) -> Self {
        Self {
            level: LogLevel::from_method(&event.method),
            message: event.args.join("\n"),
            method: event.method,
        }
    }
}

/// Callback invoked once per validated output event.
pub type OutputCallback = Arc<dyn Fn(LogEntry) + Send + Sync>;

/// Default capacity of a transport channel.
pub const DEFAULT_TRANSPORT_CAPACITY: usize = 256;

static PAGE_TRANSPORT: LazyLock<Transport> =
    LazyLock::new(|| Transport::new(DEFAULT_TRANSPORT_CAPACITY));

/// The shared cross-context message transport.
///
/// Carries loosely-typed JSON payloads: besides console-capture events,
/// unrelated message shapes may travel on the same channel and must be
/// ignored rather than treated as malformed. Cloning yields another handle
/// to the same channel.
#[derive(Clone)]
pub struct Transport {
    tx: broadcast::Sender<serde_json::Value>,
}

impl Transport {
    /// Create a dedicated transport with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// The process-wide transport shared by default between all sandboxes,
    /// analogous to the host page's global messaging primitive.
    pub fn page() -> Self {
        PAGE_TRANSPORT.clone()
    }

    /// Post a payload to every current subscriber.
    ///
    /// A transport with no live listeners swallows the payload, the same
    /// way a message posted to a page nobody listens on goes nowhere.
    pub fn post(&self, payload: serde_json::Value) {
        let _ = self.tx.send(payload);
    }

    /// Subscribe to all payloads posted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<serde_json::Value> {
        self.tx.subscribe()
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

/// Registration handle for one instance's relay subscription.
///
/// Must be released exactly once on teardown; releasing again is a no-op.
/// Dropping the handle releases it.
#[derive(Debug)]
pub struct ListenerHandle {
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Stop the listener. Idempotent.
    pub fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Attach a filtering listener for one sandbox instance.
///
/// The listener delivers events to `callback` in transport order. Payloads
/// whose kind is not `console`, that do not parse as an [`OutputEvent`], or
/// whose token does not match are dropped silently; they belong to other
/// concerns or other, possibly concurrent, instances.
pub fn listen(transport: &Transport, token: Token, callback: OutputCallback) -> ListenerHandle {
    let mut rx = transport.subscribe();
    let task = tokio::spawn(async move {
        loop {
            let payload = match rx.recv().await {
                Ok(payload) => payload,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "relay listener lagged, events skipped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            if payload.get("kind").and_then(|k| k.as_str()) != Some(CONSOLE_KIND) {
                continue;
            }
            let event: OutputEvent = match serde_json::from_value(payload) {
                Ok(event) => event,
                Err(err) => {
                    trace!(%err, "ignoring unparseable console payload");
                    continue;
                }
            };
            if event.token != token.as_str() {
                // Belongs to a different live instance; expected noise.
                trace!(token = %event.token, "dropping event for other instance");
                continue;
            }
            callback(LogEntry::from(event));
        }
    });
    ListenerHandle { task: Some(task) }
}
