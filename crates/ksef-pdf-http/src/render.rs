//! The PDF renderer boundary.
//!
//! Layout and typesetting live outside this crate. A [`PdfRenderer`] receives
//! the normalized document tree and returns finished PDF bytes.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use ksef_pdf_xml::XmlNode;
use serde::Serialize;

/// Which document the renderer should lay out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A structured e-invoice.
    Invoice,
    /// An official submission receipt (UPO).
    Upo,
}

impl DocumentKind {
    /// Returns the kind as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Upo => "upo",
        }
    }

    /// File name offered to the client for a PDF generated at `millis`.
    #[must_use]
    pub fn pdf_filename(&self, millis: i64) -> String {
        format!("{}-{millis}.pdf", self.as_str())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input handed to a [`PdfRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Document kind.
    pub kind: DocumentKind,
    /// The prefix-free document tree.
    pub document: XmlNode,
    /// Caller supplied extra data. Always empty for UPO documents.
    pub additional_data: serde_json::Map<String, serde_json::Value>,
}

impl RenderRequest {
    /// Build a request without additional data.
    #[must_use]
    pub fn new(kind: DocumentKind, document: XmlNode) -> Self {
        Self {
            kind,
            document,
            additional_data: serde_json::Map::new(),
        }
    }

    /// Attach additional data.
    #[must_use]
    pub fn with_additional_data(
        mut self,
        additional_data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.additional_data = additional_data;
        self
    }
}

/// Errors reported by a renderer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// No renderer is available.
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
    /// The renderer ran but rejected the document.
    #[error("rendering failed: {0}")]
    Failed(String),
    /// The renderer exceeded its time budget (seconds).
    #[error("rendering timed out after {0}s")]
    Timeout(u64),
}

/// Future returned by [`PdfRenderer::render`].
pub type RenderFuture = Pin<Box<dyn Future<Output = Result<Bytes, RenderError>> + Send>>;

/// Produces a PDF for a normalized document.
///
/// Implementations must be cheap to share; the service holds them in an `Arc`
/// and calls `render` concurrently from every connection.
pub trait PdfRenderer: Send + Sync + 'static {
    /// Render the document and return the PDF bytes.
    fn render(&self, request: RenderRequest) -> RenderFuture;
}

/// A renderer that rejects every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotImplementedRenderer;

impl PdfRenderer for NotImplementedRenderer {
    fn render(&self, request: RenderRequest) -> RenderFuture {
        Box::pin(async move {
            Err(RenderError::Unavailable(format!(
                "no renderer configured for {} documents",
                request.kind
            )))
        })
    }
}
