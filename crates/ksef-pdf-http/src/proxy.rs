//! API Gateway REST proxy adapter.
//!
//! Lets the same pipeline run behind an API Gateway proxy integration, where
//! the request arrives as a JSON event and binary bodies travel base64 encoded
//! in both directions.

use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiErrorCode};
use crate::render::PdfRenderer;
use crate::response::{ResponseBody, add_common_headers};
use crate::router::{Route, Router};
use crate::service::{HttpConfig, finish, respond};

/// An API Gateway REST proxy request event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// Request path, possibly stage prefixed.
    #[serde(default)]
    pub path: Option<String>,
    /// Resource template, used when `path` is absent.
    #[serde(default)]
    pub resource: Option<String>,
    /// HTTP method.
    pub http_method: String,
    /// Request headers with the client's casing.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// Request body.
    #[serde(default)]
    pub body: Option<String>,
    /// Whether `body` is base64 encoded.
    #[serde(default)]
    pub is_base64_encoded: bool,
}

/// An API Gateway REST proxy response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Response body, base64 encoded when `is_base64_encoded` is set.
    pub body: String,
    /// Whether `body` is base64 encoded.
    pub is_base64_encoded: bool,
}

impl ProxyRequest {
    /// The path to route on.
    #[must_use]
    pub fn route_path(&self) -> &str {
        self.path
            .as_deref()
            .or(self.resource.as_deref())
            .unwrap_or("/")
    }

    /// Headers as a case-insensitive map. Entries that are not valid HTTP
    /// headers are skipped.
    #[must_use]
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in self.headers.iter().flatten() {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                map.insert(name, value);
            }
        }
        map
    }

    /// The raw body bytes.
    pub fn body_bytes(&self) -> Result<Bytes, ApiError> {
        let body = self.body.as_deref().unwrap_or_default();
        if self.is_base64_encoded {
            STANDARD.decode(body).map(Bytes::from).map_err(|e| {
                ApiError::new(ApiErrorCode::MalformedMultipart)
                    .with_details(format!("invalid base64 body: {e}"))
            })
        } else {
            Ok(Bytes::copy_from_slice(body.as_bytes()))
        }
    }
}

/// Handle an API Gateway proxy event.
pub async fn handle_proxy_event<R>(
    renderer: &R,
    config: &HttpConfig,
    event: &ProxyRequest,
) -> ProxyResponse
where
    R: PdfRenderer + ?Sized,
{
    let request_id = Uuid::new_v4().to_string();
    let path = event.route_path();
    debug!(method = %event.http_method, path, %request_id, "processing proxy event");

    let result = match http::Method::from_bytes(event.http_method.as_bytes()) {
        Ok(method) => match Router::proxy().resolve(&method, path) {
            Ok(route) => dispatch(renderer, config, event, route, &request_id).await,
            Err(err) => Err(err),
        },
        Err(_) => Err(ApiError::method_not_allowed()),
    };

    let response = add_common_headers(finish(result, &request_id), &request_id);
    into_proxy_response(response).await
}

async fn dispatch<R>(
    renderer: &R,
    config: &HttpConfig,
    event: &ProxyRequest,
    route: Route,
    request_id: &str,
) -> Result<http::Response<ResponseBody>, ApiError>
where
    R: PdfRenderer + ?Sized,
{
    let body = match route {
        Route::Generate(_) => event.body_bytes()?,
        Route::Health | Route::Preflight => Bytes::new(),
    };
    if body.len() > config.max_body_bytes {
        return Err(ApiError::new(ApiErrorCode::PayloadTooLarge)
            .with_details(format!("limit is {} bytes", config.max_body_bytes)));
    }

    let headers = event.header_map();
    let content_type = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    respond(renderer, route, content_type, &body, request_id).await
}

/// Convert an HTTP response into its proxy form.
///
/// Textual bodies (JSON) are passed through; anything else is base64 encoded.
pub async fn into_proxy_response(response: http::Response<ResponseBody>) -> ProxyResponse {
    let (parts, body) = response.into_parts();
    let bytes = body
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();

    let headers: BTreeMap<String, String> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();

    let is_text = headers
        .get(http::header::CONTENT_TYPE.as_str())
        .is_none_or(|ct| ct.starts_with("application/json") || ct.starts_with("text/"));

    let (body, is_base64_encoded) = match (is_text, String::from_utf8(bytes.to_vec())) {
        (true, Ok(text)) => (text, false),
        _ => (STANDARD.encode(&bytes), true),
    };

    ProxyResponse {
        status_code: parts.status.as_u16(),
        headers,
        body,
        is_base64_encoded,
    }
}
