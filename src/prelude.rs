//! Prelude module for convenient imports.

pub use crate::error::{PlaygroundError, Result};
pub use crate::sandbox::{
    config::SandboxConfig,
    host::{Sandbox, SandboxOptions},
    relay::{LogEntry, LogLevel, Transport},
};
pub use crate::widget::{
    diagram::{DiagramRenderer, DiagramViewer, Svg},
    playground::{CodePlayground, Editor, EditorLoader, Tab},
};
