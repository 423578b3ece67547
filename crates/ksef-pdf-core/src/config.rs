//! Configuration management for the KSeF PDF service.
//!
//! All configuration is driven by environment variables.

use std::net::SocketAddr;

use crate::error::{KsefPdfError, KsefPdfResult};

/// Default upper bound for a buffered request body (10 MiB).
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Global configuration for the KSeF PDF service.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KsefPdfConfig {
    /// Bind address for the HTTP gateway.
    pub gateway_listen: String,
    /// Log level.
    pub log_level: String,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// External program that turns a normalized document into a PDF.
    pub renderer_command: Option<String>,
    /// Extra arguments passed to the renderer program.
    pub renderer_args: Vec<String>,
    /// How long a single render may take before it is aborted.
    pub renderer_timeout_secs: u64,
}

impl Default for KsefPdfConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:3000".to_owned(),
            log_level: "info".to_owned(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            renderer_command: None,
            renderer_args: Vec::new(),
            renderer_timeout_secs: 30,
        }
    }
}

impl KsefPdfConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// `PORT` only changes the port of the default bind address;
    /// `GATEWAY_LISTEN` replaces the whole address and wins over `PORT`.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("PORT") {
            config.gateway_listen = format!("0.0.0.0:{}", v.trim());
        }
        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("MAX_BODY_BYTES") {
            match v.trim().parse() {
                Ok(n) => config.max_body_bytes = n,
                Err(e) => {
                    tracing::warn!(value = %v, error = %e, "ignoring invalid MAX_BODY_BYTES");
                }
            }
        }
        if let Some(v) = lookup("RENDERER_COMMAND") {
            let v = v.trim();
            if !v.is_empty() {
                config.renderer_command = Some(v.to_owned());
            }
        }
        if let Some(v) = lookup("RENDERER_ARGS") {
            config.renderer_args = v.split_whitespace().map(str::to_owned).collect();
        }
        if let Some(v) = lookup("RENDERER_TIMEOUT_SECS") {
            match v.trim().parse() {
                Ok(n) => config.renderer_timeout_secs = n,
                Err(e) => {
                    tracing::warn!(value = %v, error = %e, "ignoring invalid RENDERER_TIMEOUT_SECS");
                }
            }
        }

        config
    }

    /// Parse the configured bind address.
    pub fn listen_addr(&self) -> KsefPdfResult<SocketAddr> {
        self.gateway_listen.parse().map_err(|e| {
            KsefPdfError::Config(format!(
                "invalid bind address {}: {e}",
                self.gateway_listen
            ))
        })
    }

    /// Check the values that cannot be validated while loading.
    pub fn validate(&self) -> KsefPdfResult<()> {
        self.listen_addr()?;
        if self.max_body_bytes == 0 {
            return Err(KsefPdfError::Config(
                "MAX_BODY_BYTES must be greater than zero".to_owned(),
            ));
        }
        if self.renderer_timeout_secs == 0 {
            return Err(KsefPdfError::Config(
                "RENDERER_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}
