//! HTTP response construction.

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http_body_util::Full;

use crate::error::ApiError;

/// Body of every response: a buffered payload, empty for CORS preflight.
pub type ResponseBody = Full<Bytes>;

/// Value of the `Server` header.
pub const SERVER_NAME: &str = "KsefPdf";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const HEALTH_MESSAGE: &str = "KSeF PDF Generator is running";

fn json_response(
    status: http::StatusCode,
    value: &serde_json::Value,
) -> http::Response<ResponseBody> {
    let mut response = http::Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Convert an [`ApiError`] into a JSON error response.
#[must_use]
pub fn error_to_response(err: &ApiError) -> http::Response<ResponseBody> {
    json_response(err.status_code, &err.to_json())
}

/// Produce the health check response.
#[must_use]
pub fn health_check_response() -> http::Response<ResponseBody> {
    json_response(
        http::StatusCode::OK,
        &serde_json::json!({ "status": "ok", "message": HEALTH_MESSAGE }),
    )
}

/// Produce a CORS preflight response.
#[must_use]
pub fn cors_preflight_response() -> http::Response<ResponseBody> {
    let mut response = http::Response::new(Full::default());
    *response.status_mut() = http::StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*, Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

/// Produce a PDF attachment response.
///
/// Returns an error when `filename` cannot be used in a header value.
pub fn pdf_response(
    pdf: Bytes,
    filename: &str,
) -> Result<http::Response<ResponseBody>, ApiError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| ApiError::internal_error(format!("invalid PDF file name: {e}")))?;

    let mut response = http::Response::new(Full::new(pdf));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// Add the headers every response carries.
#[must_use]
pub fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("x-request-id, Content-Disposition"),
    );

    response
}
