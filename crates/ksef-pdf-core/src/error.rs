//! Error types for the KSeF PDF core.

/// Core error type for KSeF PDF infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum KsefPdfError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for KSeF PDF operations.
pub type KsefPdfResult<T> = Result<T, KsefPdfError>;
