//! The main HTTP service implementing hyper's `Service` trait.
//!
//! [`KsefPdfService`] ties routing, body collection, the generate pipeline and
//! response formatting into a single hyper-compatible service. It handles:
//!
//! 1. Routing via [`Router`] (health, CORS preflight, generate endpoints)
//! 2. Request body collection, bounded by [`HttpConfig::max_body_bytes`]
//! 3. Document decoding and rendering via [`generate_pdf`]
//! 4. Common response headers (`x-request-id`, `Server`, CORS)
//! 5. JSON error responses

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::service::Service;
use ksef_pdf_core::KsefPdfConfig;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiErrorCode};
use crate::generate::generate_pdf;
use crate::render::PdfRenderer;
use crate::response::{
    ResponseBody, add_common_headers, cors_preflight_response, error_to_response, health_check_response,
    pdf_response,
};
use crate::router::{Route, Router};

/// Default upper bound on request bodies (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl From<&KsefPdfConfig> for HttpConfig {
    fn from(config: &KsefPdfConfig) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// The HTTP service that implements hyper's `Service` trait.
///
/// # Type Parameters
///
/// - `R`: The PDF renderer implementing [`PdfRenderer`].
#[derive(Debug)]
pub struct KsefPdfService<R: PdfRenderer> {
    renderer: Arc<R>,
    router: Router,
    config: Arc<HttpConfig>,
}

impl<R: PdfRenderer> KsefPdfService<R> {
    /// Create a new service with the given renderer and configuration.
    #[must_use]
    pub fn new(renderer: R, config: HttpConfig) -> Self {
        Self::from_shared(Arc::new(renderer), config)
    }

    /// Create a new service from an `Arc<R>` renderer and configuration.
    #[must_use]
    pub fn from_shared(renderer: Arc<R>, config: HttpConfig) -> Self {
        Self {
            renderer,
            router: Router::new(),
            config: Arc::new(config),
        }
    }
}

impl<R: PdfRenderer> Clone for KsefPdfService<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            router: self.router,
            config: Arc::clone(&self.config),
        }
    }
}

impl<R, B> Service<http::Request<B>> for KsefPdfService<R>
where
    R: PdfRenderer,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let renderer = Arc::clone(&self.renderer);
        let router = self.router;
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response =
                process_request(req, renderer.as_ref(), router, &config, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

async fn process_request<R, B>(
    req: http::Request<B>,
    renderer: &R,
    router: Router,
    config: &HttpConfig,
    request_id: &str,
) -> http::Response<ResponseBody>
where
    R: PdfRenderer + ?Sized,
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    debug!(%method, %path, request_id, "processing request");

    let route = match router.resolve(&method, &path) {
        Ok(route) => route,
        Err(err) => return finish(Err(err), request_id),
    };

    let (parts, incoming) = req.into_parts();
    let body = match route {
        Route::Generate(_) => match collect_body(incoming, config.max_body_bytes).await {
            Ok(body) => body,
            Err(err) => return finish(Err(err), request_id),
        },
        Route::Health | Route::Preflight => Bytes::new(),
    };

    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    finish(
        respond(renderer, route, content_type, &body, request_id).await,
        request_id,
    )
}

/// Produce the response for a resolved route.
pub(crate) async fn respond<R>(
    renderer: &R,
    route: Route,
    content_type: Option<&str>,
    body: &[u8],
    request_id: &str,
) -> Result<http::Response<ResponseBody>, ApiError>
where
    R: PdfRenderer + ?Sized,
{
    match route {
        Route::Health => Ok(health_check_response()),
        Route::Preflight => Ok(cors_preflight_response()),
        Route::Generate(kind) => {
            info!(%route, size = body.len(), request_id, "generating PDF");
            let pdf = generate_pdf(renderer, kind, content_type, body).await?;
            pdf_response(pdf.data, &pdf.filename)
        }
    }
}

/// Turn a handler result into a response, logging failures.
pub(crate) fn finish(
    result: Result<http::Response<ResponseBody>, ApiError>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    match result {
        Ok(response) => response,
        Err(err) => {
            if err.status_code.is_server_error() {
                error!(code = %err.code, details = ?err.details, request_id, "request failed");
            } else {
                warn!(code = %err.code, details = ?err.details, request_id, "request rejected");
            }
            error_to_response(&err)
        }
    }
}

/// Collect a request body, failing with `PayloadTooLarge` past `limit` bytes.
async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, ApiError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::new(ApiErrorCode::PayloadTooLarge)
                .with_details(format!("limit is {limit} bytes")))
        }
        Err(err) => Err(ApiError::internal_error(format!(
            "failed to read request body: {err}"
        ))),
    }
}
