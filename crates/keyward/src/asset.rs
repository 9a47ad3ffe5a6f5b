//! Gated textual assets.

use keyward_core::{gate, Level};

/// Kind of textual asset served through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Script,
    Stylesheet,
}

impl AssetKind {
    /// Content type to serve the gated text with.
    pub const fn content_type(&self) -> &'static str {
        match self {
            AssetKind::Script => "text/javascript",
            AssetKind::Stylesheet => "text/css",
        }
    }
}

/// Gated asset text ready to hand back to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedAsset {
    pub content_type: &'static str,
    pub body: String,
}

impl ServedAsset {
    /// Gate `source` for a requester at `level`.
    ///
    /// Scripts and stylesheets are gated identically; only the content type
    /// differs.
    pub fn render(kind: AssetKind, source: &str, level: Level) -> Self {
        Self {
            content_type: kind.content_type(),
            body: gate(source, level),
        }
    }
}
