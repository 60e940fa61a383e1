//! Isolated execution contexts.
//!
//! Each run of guest code gets a brand-new `boa_engine` context evaluated on
//! a blocking task. The context never sees host state; its only way back out
//! is the console-capture queue installed by the bootstrap prelude, which
//! the worker drains and posts onto the shared transport after evaluation.
//!
//! Replacing a context revokes the previous one: a superseded run may still
//! finish evaluating, but its events are discarded instead of posted. That
//! replacement is the de facto cancellation mechanism; there is no
//! cooperative cancellation signal and no timeout on guest code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use boa_engine::{Context, Source};
use tracing::{debug, trace};

use crate::sandbox::bootstrap::{BootstrapDocument, DRAIN_CALL};
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::relay::{OutputEvent, Token, Transport};

/// Exclusive handle to one running execution context.
///
/// Holds only the revocation flag; the evaluation itself is fire-and-forget
/// from the host's perspective.
#[derive(Debug)]
pub struct ContextHandle {
    revoked: Arc<AtomicBool>,
}

impl ContextHandle {
    /// Stop this context from posting any further events. Idempotent.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Whether the context has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}

/// Evaluate a bootstrap document in a fresh context and post its captured
/// output onto `transport`.
///
/// Returns immediately; evaluation happens on a blocking task. Guest
/// failures surface only as `error` output events, never as host-side
/// errors.
pub fn spawn(
    document: BootstrapDocument,
    token: Token,
    transport: Transport,
    config: SandboxConfig,
) -> ContextHandle {
    let revoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&revoked);

    tokio::task::spawn_blocking(move || {
        debug!(token = %token, "evaluating guest program");
        let events = evaluate(&document, &token, &config);
        for event in events {
            if flag.load(Ordering::SeqCst) {
                trace!(token = %token, "context revoked, discarding remaining events");
                break;
            }
            match serde_json::to_value(&event) {
                Ok(payload) => transport.post(payload),
                Err(err) => trace!(%err, "failed to serialize output event"),
            }
        }
    });

    ContextHandle { revoked }
}

/// Run one bootstrap document to completion and collect its output events.
///
/// The prelude and the guarded guest region are evaluated in order in the
/// same fresh context. A failure of the guarded region itself (a syntax
/// error in the embedded source, which aborts the region before its catch
/// clause exists) is reported as a synthetic `error` event after whatever
/// output the guest managed to produce.
fn evaluate(document: &BootstrapDocument, token: &Token, config: &SandboxConfig) -> Vec<OutputEvent> {
    let mut context = Context::default();

    if let Err(err) = context.eval(Source::from_bytes(document.prelude())) {
        return vec![OutputEvent::error(
            token,
            format!("sandbox bootstrap failed: {err}"),
        )];
    }

    let eval_failure = context
        .eval(Source::from_bytes(document.guarded()))
        .err()
        .map(|err| OutputEvent::error(token, err.to_string()));

    if config.run_jobs {
        context.run_jobs();
    }

    let mut events = drain(&mut context, token);
    events.extend(eval_failure);
    events
}

/// Pull the recorded event queue out of the context.
fn drain(context: &mut Context, token: &Token) -> Vec<OutputEvent> {
    let value = match context.eval(Source::from_bytes(DRAIN_CALL)) {
        Ok(value) => value,
        Err(err) => {
            return vec![OutputEvent::error(
                token,
                format!("sandbox drain failed: {err}"),
            )];
        }
    };
    let Some(json) = value.as_string().map(|s| s.to_std_string_escaped()) else {
        return Vec::new();
    };
    serde_json::from_str(&json).unwrap_or_default()
}
