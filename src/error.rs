//! Error types for the playground core.

use thiserror::Error;

/// Errors that can occur while setting up or driving a playground widget.
///
/// Guest-side failures never appear here: an exception thrown by submitted
/// code is captured inside the execution context and delivered as an
/// `error`-method output event instead.
#[derive(Error, Debug)]
pub enum PlaygroundError {
    /// The `code` attribute could not be percent-decoded.
    #[error("failed to decode code attribute: {0}")]
    Decode(String),

    /// The editor dependency failed to load or initialize.
    #[error("failed to load editor dependency: {0}")]
    EditorLoad(#[source] anyhow::Error),

    /// The diagram renderer rejected the source text.
    #[error("diagram rendering failed: {0}")]
    Render(String),
}

impl PlaygroundError {
    /// Check if this error came from decoding the mount attribute.
    pub fn is_decode(&self) -> bool {
        matches!(self, PlaygroundError::Decode(_))
    }

    /// Check if this error came from the editor dependency.
    pub fn is_editor_load(&self) -> bool {
        matches!(self, PlaygroundError::EditorLoad(_))
    }

    /// Check if this error came from the diagram renderer.
    pub fn is_render(&self) -> bool {
        matches!(self, PlaygroundError::Render(_))
    }
}

/// Result type alias for playground operations.
pub type Result<T> = std::result::Result<T, PlaygroundError>;
