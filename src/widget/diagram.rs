//! Diagram viewer widget: a pure request/response path to an external
//! renderer, with idempotent connect and recoverable failure.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::PlaygroundError;
use crate::widget::decode_code_attr;

/// A successful render result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Svg {
    /// The rendered markup.
    pub svg: String,
}

/// External diagram-rendering dependency.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Render `source` under the given per-render instance id, resolving to
    /// rendered markup or an error carrying a human-readable message.
    async fn render(&self, instance_id: &str, source: &str) -> anyhow::Result<Svg>;
}

/// What the viewer currently displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramContent {
    /// Placeholder shown before the renderer resolves.
    Loading,
    /// The rendered diagram markup.
    Rendered(String),
    /// Inline error block with the renderer's message.
    Failed(String),
}

/// Diagram widget controller.
#[derive(Debug)]
pub struct DiagramViewer {
    rendered: bool,
    content: DiagramContent,
}

impl DiagramViewer {
    /// Create a disconnected viewer.
    pub fn new() -> Self {
        Self {
            rendered: false,
            content: DiagramContent::Loading,
        }
    }

    /// Connect the widget: decode the `code` attribute and feed it to the
    /// renderer. A second connect on an already-rendered viewer is a no-op;
    /// a failed viewer stays re-triggerable on reconnect.
    pub async fn connect(&mut self, encoded_code: &str, renderer: &dyn DiagramRenderer) {
        if self.rendered {
            return;
        }

        let source = match decode_code_attr(encoded_code) {
            Ok(source) => source,
            Err(err) => {
                self.content = DiagramContent::Failed(err.to_string());
                return;
            }
        };

        self.content = DiagramContent::Loading;
        let instance_id = format!("diagram-{}", Uuid::new_v4().simple());
        match renderer.render(&instance_id, &source).await {
            Ok(Svg { svg }) => {
                debug!(%instance_id, "diagram rendered");
                self.content = DiagramContent::Rendered(svg);
                self.rendered = true;
            }
            Err(err) => {
                let err = PlaygroundError::Render(err.to_string());
                self.content = DiagramContent::Failed(err.to_string());
            }
        }
    }

    /// Whether a render has completed successfully.
    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// The current display content.
    pub fn content(&self) -> &DiagramContent {
        &self.content
    }
}

impl Default for DiagramViewer {
    fn default() -> Self {
        Self::new()
    }
}
