//! Request routing.
//!
//! The service exposes a health probe and two generate endpoints. The direct
//! HTTP server matches paths exactly (ignoring a trailing `/`). Behind an API
//! Gateway proxy the path may carry a stage prefix (`/prod/generate-invoice`),
//! so [`Router::proxy`] matches on containment instead.

use std::fmt;

use crate::error::ApiError;
use crate::render::DocumentKind;

const HEALTH_PATH: &str = "/health";
const INVOICE_PATH: &str = "/generate-invoice";
const UPO_PATH: &str = "/generate-upo";

/// A resolved route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /health`.
    Health,
    /// `OPTIONS` on any path.
    Preflight,
    /// `POST` on a generate endpoint.
    Generate(DocumentKind),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Health => f.write_str("health"),
            Self::Preflight => f.write_str("preflight"),
            Self::Generate(kind) => write!(f, "generate-{kind}"),
        }
    }
}

/// How request paths are compared against the known endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMatch {
    /// The path equals the endpoint.
    #[default]
    Exact,
    /// The path contains the endpoint anywhere.
    Contains,
}

/// Maps a method and path to a [`Route`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Router {
    matching: PathMatch,
}

impl Router {
    /// Router for the standalone HTTP server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matching: PathMatch::Exact,
        }
    }

    /// Router for API Gateway proxy events.
    #[must_use]
    pub fn proxy() -> Self {
        Self {
            matching: PathMatch::Contains,
        }
    }

    /// Resolve a request to a route.
    ///
    /// Returns `MethodNotAllowed` when the path is known but the method is not
    /// accepted, and `NotFound` otherwise.
    pub fn resolve(&self, method: &http::Method, path: &str) -> Result<Route, ApiError> {
        if *method == http::Method::OPTIONS {
            return Ok(Route::Preflight);
        }

        let path = normalize_path(path);
        if path == HEALTH_PATH {
            return if *method == http::Method::GET {
                Ok(Route::Health)
            } else {
                Err(ApiError::method_not_allowed())
            };
        }

        let kind = if self.matches(path, INVOICE_PATH) {
            DocumentKind::Invoice
        } else if self.matches(path, UPO_PATH) {
            DocumentKind::Upo
        } else {
            return Err(ApiError::not_found());
        };

        if *method == http::Method::POST {
            Ok(Route::Generate(kind))
        } else {
            Err(ApiError::method_not_allowed())
        }
    }

    fn matches(&self, path: &str, endpoint: &str) -> bool {
        match self.matching {
            PathMatch::Exact => path == endpoint,
            PathMatch::Contains => path.contains(endpoint),
        }
    }
}

fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
