//! API error type returned by every request-handling step.

use std::fmt;

use crate::multipart::MultipartError;
use crate::render::RenderError;

/// Well-known API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    /// The request is not `multipart/form-data` with a boundary.
    InvalidContentType,
    /// The multipart body cannot be decoded.
    MalformedMultipart,
    /// A required form field is absent.
    MissingField,
    /// The uploaded file is not an XML document.
    InvalidFileType,
    /// The `additionalData` field is not a JSON object.
    InvalidAdditionalData,
    /// The uploaded XML cannot be parsed.
    MalformedXml,
    /// The request body exceeds the configured limit.
    PayloadTooLarge,
    /// The route does not accept this method.
    MethodNotAllowed,
    /// No such route.
    NotFound,
    /// The renderer rejected the document.
    RenderFailed,
    /// The renderer did not finish in time.
    RenderTimeout,
    /// No renderer is configured.
    NotImplemented,
    /// Unexpected server-side failure.
    InternalError,
}

impl ApiErrorCode {
    /// Returns the error code as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidContentType => "InvalidContentType",
            Self::MalformedMultipart => "MalformedMultipart",
            Self::MissingField => "MissingField",
            Self::InvalidFileType => "InvalidFileType",
            Self::InvalidAdditionalData => "InvalidAdditionalData",
            Self::MalformedXml => "MalformedXml",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NotFound => "NotFound",
            Self::RenderFailed => "RenderFailed",
            Self::RenderTimeout => "RenderTimeout",
            Self::NotImplemented => "NotImplemented",
            Self::InternalError => "InternalError",
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::InvalidContentType
            | Self::MalformedMultipart
            | Self::MissingField
            | Self::InvalidFileType
            | Self::InvalidAdditionalData
            | Self::MalformedXml => http::StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => http::StatusCode::PAYLOAD_TOO_LARGE,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::RenderFailed | Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::RenderTimeout => http::StatusCode::GATEWAY_TIMEOUT,
            Self::NotImplemented => http::StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// Returns the default message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidContentType => "Invalid Content-Type. Expected multipart/form-data",
            Self::MalformedMultipart => "The multipart body could not be decoded",
            Self::MissingField => {
                "Missing XML file. Send the file as \"xml\" in a multipart/form-data form"
            }
            Self::InvalidFileType => "Invalid file format. An XML file is required",
            Self::InvalidAdditionalData => "additionalData must be a JSON object",
            Self::MalformedXml => "The uploaded XML document could not be parsed",
            Self::PayloadTooLarge => "The request body is too large",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::NotFound => "Not Found",
            Self::RenderFailed => "Error while generating the PDF",
            Self::RenderTimeout => "PDF generation timed out",
            Self::NotImplemented => "PDF rendering is not configured",
            Self::InternalError => "Internal Server Error",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API error response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ApiError({code}): {message}")]
pub struct ApiError {
    /// The error code.
    pub code: ApiErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// Extra detail, typically the underlying error.
    pub details: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
}

impl ApiError {
    /// Create a new ApiError from an error code.
    #[must_use]
    pub fn new(code: ApiErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Create a new ApiError with a custom message.
    #[must_use]
    pub fn with_message(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            details: None,
        }
    }

    /// Attach extra detail.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Create a NotFound error.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ApiErrorCode::NotFound)
    }

    /// Create a MethodNotAllowed error.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(ApiErrorCode::MethodNotAllowed)
    }

    /// Create an InternalError with detail.
    #[must_use]
    pub fn internal_error(details: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError).with_details(details)
    }

    /// Serialize into the JSON error body.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.message,
            "code": self.code.as_str(),
        });
        if let Some(details) = &self.details {
            body["details"] = serde_json::Value::String(details.clone());
        }
        body
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        match err {
            MultipartError::MalformedMultipart(_) => {
                Self::new(ApiErrorCode::MalformedMultipart).with_details(err.to_string())
            }
            MultipartError::MissingField(_) => {
                Self::new(ApiErrorCode::MissingField).with_details(err.to_string())
            }
        }
    }
}

impl From<ksef_pdf_xml::XmlError> for ApiError {
    fn from(err: ksef_pdf_xml::XmlError) -> Self {
        Self::new(ApiErrorCode::MalformedXml).with_details(err.to_string())
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        let code = match err {
            RenderError::Unavailable(_) => ApiErrorCode::NotImplemented,
            RenderError::Timeout(_) => ApiErrorCode::RenderTimeout,
            RenderError::Failed(_) => ApiErrorCode::RenderFailed,
        };
        Self::new(code).with_details(err.to_string())
    }
}
