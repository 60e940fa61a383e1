//! Isolation host: lifecycle of one sandbox instance.
//!
//! A [`Sandbox`] binds a mount point, a correlation token, and a relay
//! listener together. Committing code replaces the mount's execution
//! context wholesale; tearing the instance down releases its listener and
//! context exactly once.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use tracing::{debug, warn};

use crate::sandbox::bootstrap::BootstrapDocument;
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::context::{self, ContextHandle};
use crate::sandbox::relay::{
    self, ListenerHandle, LogEntry, OutputCallback, OutputEvent, Token, Transport,
};

/// A mount point that holds at most one live execution context.
///
/// Page-level mounts live in a process-wide registry keyed by id and are
/// reused across sandbox constructions; scoped mounts are anonymous and
/// owned by a single widget.
#[derive(Debug)]
pub struct Mount {
    id: Option<String>,
    occupant: Mutex<Option<ContextHandle>>,
}

impl Mount {
    fn new(id: Option<String>) -> Self {
        Self {
            id,
            occupant: Mutex::new(None),
        }
    }

    /// The registry id, for page-level mounts.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Install a new context, revoking whichever one occupied the mount.
    fn commit(&self, handle: ContextHandle) {
        let mut occupant = self.occupant.lock().unwrap();
        if let Some(previous) = occupant.take() {
            previous.revoke();
        }
        *occupant = Some(handle);
    }

    /// Revoke and discard the current context, if any. Idempotent.
    fn release(&self) {
        if let Some(handle) = self.occupant.lock().unwrap().take() {
            handle.revoke();
        }
    }
}

static PAGE_MOUNTS: LazyLock<Mutex<HashMap<String, Arc<Mount>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Look up a page-level mount by id, creating it on first use.
fn page_mount(id: &str) -> Arc<Mount> {
    let mut mounts = PAGE_MOUNTS.lock().unwrap();
    Arc::clone(
        mounts
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mount::new(Some(id.to_string())))),
    )
}

/// Construction options for a sandbox instance.
///
/// The output callback is mandatory; transport and config fall back to the
/// page-wide transport and defaults.
pub struct SandboxOptions {
    callback: OutputCallback,
    transport: Option<Transport>,
    config: SandboxConfig,
}

impl SandboxOptions {
    /// Create options with the given output callback.
    pub fn new(callback: impl Fn(LogEntry) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
            transport: None,
            config: SandboxConfig::default(),
        }
    }

    /// Use a dedicated transport instead of the page-wide one.
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Override the sandbox configuration.
    pub fn config(mut self, config: SandboxConfig) -> Self {
        self.config = config;
        self
    }
}

/// One sandbox instance: an isolated execution context bound to a widget.
///
/// Construction registers the relay listener and `run()` spawns the
/// evaluation task, so instances must be created and driven from within a
/// Tokio runtime.
#[derive(Debug)]
pub struct Sandbox {
    token: Token,
    mount: Arc<Mount>,
    listener: ListenerHandle,
    transport: Transport,
    config: SandboxConfig,
    destroyed: bool,
}

impl Sandbox {
    /// Create an instance backed by the hidden page-level mount with the
    /// given id. The mount is created once and reused by later instances
    /// addressing the same id.
    pub fn page_level(id: &str, options: SandboxOptions) -> Self {
        Self::create(page_mount(id), options)
    }

    /// Create an instance with a fresh mount of its own, never shared with
    /// other widgets.
    pub fn scoped(options: SandboxOptions) -> Self {
        Self::create(Arc::new(Mount::new(None)), options)
    }

    fn create(mount: Arc<Mount>, options: SandboxOptions) -> Self {
        let token = Token::generate();
        let transport = options.transport.unwrap_or_else(Transport::page);
        let listener = relay::listen(&transport, token.clone(), options.callback);
        debug!(token = %token, mount = ?mount.id(), "sandbox created");
        Self {
            token,
            mount,
            listener,
            transport,
            config: options.config,
            destroyed: false,
        }
    }

    /// This instance's correlation token.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// The mount this instance is bound to.
    pub fn mount(&self) -> &Arc<Mount> {
        &self.mount
    }

    /// Run `source` in a fresh execution context, replacing the previous
    /// one. Fire-and-forget: output arrives later through the callback, and
    /// guest failures arrive as `error` entries rather than being returned.
    pub fn run(&mut self, source: &str) {
        if self.destroyed {
            warn!(token = %self.token, "run() on destroyed sandbox ignored");
            return;
        }
        if source.len() > self.config.max_source_len {
            let event = OutputEvent::error(
                &self.token,
                format!(
                    "source of {} bytes exceeds the {} byte limit",
                    source.len(),
                    self.config.max_source_len
                ),
            );
            if let Ok(payload) = serde_json::to_value(&event) {
                self.transport.post(payload);
            }
            return;
        }

        let document = BootstrapDocument::new(&self.token, source);
        let handle = context::spawn(
            document,
            self.token.clone(),
            self.transport.clone(),
            self.config.clone(),
        );
        self.mount.commit(handle);
    }

    /// Release the relay subscription and the execution context. Idempotent:
    /// a second call is a no-op and never errors.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.listener.release();
        self.mount.release();
        debug!(token = %self.token, "sandbox destroyed");
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        self.destroy();
    }
}
