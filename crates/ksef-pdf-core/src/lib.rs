//! Configuration and core error types for the KSeF PDF service.
//!
//! This crate holds the pieces shared by the HTTP layer and the server binary:
//! environment-driven configuration and the infrastructure error type.

mod config;
mod error;

pub use config::KsefPdfConfig;
pub use error::{KsefPdfError, KsefPdfResult};
