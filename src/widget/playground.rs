//! Code playground widget: editor pane, tabbed preview/logs pane, and the
//! scoped sandbox instance that executes the edited source.
//!
//! The editor is an external dependency reached through the [`Editor`] and
//! [`EditorLoader`] seams; the widget only reads the current text on change
//! and never inspects editor internals. The embedder routes the editor's
//! change notifications to [`CodePlayground::handle_edit`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::PlaygroundError;
use crate::sandbox::host::{Sandbox, SandboxOptions};
use crate::sandbox::relay::{LogEntry, Transport};
use crate::widget::decode_code_attr;

/// An attached editor instance.
pub trait Editor: Send {
    /// Current text content.
    fn value(&self) -> String;
    /// Replace the text content.
    fn set_value(&mut self, text: &str);
    /// Release the editor's resources.
    fn dispose(&mut self);
}

/// Deferred loader for the editor dependency; loaded on mount, not eagerly.
#[async_trait]
pub trait EditorLoader: Send + Sync {
    /// Load the editor and create an instance holding `initial` text.
    async fn load(&self, initial: &str) -> anyhow::Result<Box<dyn Editor>>;
}

/// Output-pane tabs; exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Preview,
    Logs,
}

/// Playground widget controller.
pub struct CodePlayground {
    editor: Option<Box<dyn Editor>>,
    sandbox: Option<Sandbox>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    active_tab: Tab,
    rendered: bool,
    load_error: Option<String>,
    transport: Option<Transport>,
}

impl CodePlayground {
    /// Create an unmounted playground using the page-wide transport.
    pub fn new() -> Self {
        Self {
            editor: None,
            sandbox: None,
            logs: Arc::new(Mutex::new(Vec::new())),
            active_tab: Tab::Preview,
            rendered: false,
            load_error: None,
            transport: None,
        }
    }

    /// Create an unmounted playground bound to a dedicated transport.
    pub fn with_transport(transport: Transport) -> Self {
        let mut playground = Self::new();
        playground.transport = Some(transport);
        playground
    }

    /// Mount the widget: decode the `code` attribute, load the editor
    /// dependency, construct the scoped sandbox, and run the initial source.
    ///
    /// A second mount of an already-rendered widget is a no-op. Setup
    /// failures are surfaced through [`CodePlayground::load_error`] as an
    /// inline error block, never propagated to the caller.
    pub async fn mount(&mut self, encoded_code: &str, loader: &dyn EditorLoader) {
        if self.rendered {
            return;
        }

        // Skeleton state: preview tab active, empty log pane.
        self.active_tab = Tab::Preview;
        self.logs.lock().unwrap().clear();
        self.load_error = None;

        let initial = match decode_code_attr(encoded_code) {
            Ok(code) => code,
            Err(err) => {
                self.load_error = Some(err.to_string());
                return;
            }
        };

        let editor = match loader.load(&initial).await {
            Ok(editor) => editor,
            Err(err) => {
                self.load_error = Some(PlaygroundError::EditorLoad(err).to_string());
                return;
            }
        };
        self.editor = Some(editor);

        let logs = Arc::clone(&self.logs);
        let options = SandboxOptions::new(move |entry| {
            logs.lock().unwrap().push(entry);
        });
        let options = match &self.transport {
            Some(transport) => options.transport(transport.clone()),
            None => options,
        };
        let mut sandbox = Sandbox::scoped(options);

        debug!("playground mounted, running initial source");
        sandbox.run(&initial);
        self.sandbox = Some(sandbox);
        self.rendered = true;
    }

    /// React to an editor change: clear the accumulated log entries and
    /// re-run the full current source (full reload, not an incremental
    /// patch).
    pub fn handle_edit(&mut self) {
        self.clear_logs();
        let Some(source) = self.editor.as_ref().map(|editor| editor.value()) else {
            return;
        };
        if let Some(sandbox) = self.sandbox.as_mut() {
            sandbox.run(&source);
        }
    }

    /// Switch the active output tab.
    pub fn select_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    /// The currently active output tab.
    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    /// Snapshot of the accumulated log entries, in delivery order.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().unwrap().clone()
    }

    /// Remove all accumulated log entries.
    pub fn clear_logs(&self) {
        self.logs.lock().unwrap().clear();
    }

    /// Render the log pane as display lines, one per entry, with the
    /// message HTML-escaped.
    pub fn log_lines(&self) -> Vec<String> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .map(|entry| format!("[ {} ] : {}", entry.level, escape_html(&entry.message)))
            .collect()
    }

    /// The inline error block shown when mount setup failed.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Whether the widget completed a mount.
    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// Unmount the widget: dispose the editor and destroy the sandbox.
    /// Safe to call on a widget that never mounted.
    pub fn unmount(&mut self) {
        if let Some(mut editor) = self.editor.take() {
            editor.dispose();
        }
        if let Some(mut sandbox) = self.sandbox.take() {
            sandbox.destroy();
        }
    }
}

impl Default for CodePlayground {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CodePlayground {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
