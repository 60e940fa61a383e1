//! # Playbox
//!
//! The sandboxed execution and output-capture core behind interactive
//! code-playground widgets.
//!
//! User-supplied script runs inside an isolated JavaScript context (Boa)
//! where it cannot touch host state; its console output is captured by an
//! injected bootstrap, posted across the isolation boundary as structured
//! events, and routed back to the owning widget in real time. Any number of
//! sandbox instances can coexist on one shared transport:
//!
//! - **Correlation tokens**: every instance stamps its events with an opaque
//!   per-instance token; mismatches are dropped silently
//! - **Full-reload runs**: each run replaces the execution context outright,
//!   discarding timers and listeners from the previous run by construction
//! - **Captured failures**: guest exceptions become `error` log entries,
//!   never host-side panics
//! - **Idempotent teardown**: destroying an instance releases its listener
//!   and context exactly once
//!
//! ## Example
//!
//! ```rust,ignore
//! use playbox::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = SandboxOptions::new(|entry: LogEntry| {
//!         println!("[{}] {}", entry.level, entry.message);
//!     });
//!     let mut sandbox = Sandbox::scoped(options);
//!
//!     // Fire-and-forget: output arrives through the callback.
//!     sandbox.run("console.log(1 + 1)");
//!
//!     sandbox.destroy();
//! }
//! ```
//!
//! ## Isolation model
//!
//! Each run evaluates in a brand-new engine context with no host bindings
//! beyond the console-capture shim. This is an isolation boundary for
//! cooperating code, not a hardened adversarial sandbox; no timeout or
//! resource cap is enforced on guest execution.
//!
//! ## Runtime requirement
//!
//! Sandbox construction spawns the relay listener and `run()` hands
//! evaluation to a blocking task, so [`Sandbox`] and the widget
//! controllers must be used from within a Tokio runtime.

pub mod error;
pub mod prelude;
pub mod sandbox;
pub mod widget;

// Re-export main types at crate root for convenience
pub use error::{PlaygroundError, Result};
pub use sandbox::config::{SandboxConfig, SandboxConfigBuilder};
pub use sandbox::host::{Sandbox, SandboxOptions};
pub use sandbox::relay::{LogEntry, LogLevel, OutputEvent, Token, Transport};
pub use widget::diagram::{DiagramRenderer, DiagramViewer, Svg};
pub use widget::playground::{CodePlayground, Editor, EditorLoader, Tab};
