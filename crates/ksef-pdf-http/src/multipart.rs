//! Multipart form data decoder for document uploads.
//!
//! Decodes `multipart/form-data` bodies into a [`ParsedForm`] of named text
//! fields and file attachments. This is a synchronous decoder that works on the
//! already-collected body bytes; it never assumes the transport validated the
//! body.
//!
//! Decoding is lenient per part and strict per body: a part without a header
//! separator or without a usable `Content-Disposition` is dropped, while a body
//! that cannot be split by the boundary at all is rejected.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{ApiError, ApiErrorCode};
use crate::header::PartHeaders;

/// Content type recorded for uploaded files that do not declare one.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors produced while decoding or inspecting a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    /// The body cannot be segmented by the given boundary.
    #[error("malformed multipart body: {0}")]
    MalformedMultipart(String),

    /// A required field is absent from the decoded form.
    #[error("missing form field: {0}")]
    MissingField(String),
}

/// An uploaded file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// The client-supplied file name.
    pub filename: String,
    /// The part's declared content type, or [`DEFAULT_FILE_CONTENT_TYPE`].
    pub content_type: String,
    /// The exact bytes submitted.
    pub data: Bytes,
}

/// The value of a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A plain form field, trimmed of surrounding whitespace.
    Text(String),
    /// A file attachment.
    File(UploadedFile),
}

impl FieldValue {
    /// Borrow the text of a text field.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::File(_) => None,
        }
    }

    /// Borrow the attachment of a file field.
    #[must_use]
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(f) => Some(f),
            Self::Text(_) => None,
        }
    }
}

/// A decoded multipart submission.
///
/// Field names are unique; when a name repeats in the body the last part wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedForm {
    fields: HashMap<String, FieldValue>,
}

impl ParsedForm {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Look up a text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Look up a file field.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.get(name).and_then(FieldValue::as_file)
    }

    /// Look up a file field that the caller cannot do without.
    pub fn require_file(&self, name: &str) -> Result<&UploadedFile, MultipartError> {
        self.file(name)
            .ok_or_else(|| MultipartError::MissingField(name.to_owned()))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the form has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Extract the boundary string from a `Content-Type: multipart/form-data; boundary=...` header.
///
/// # Errors
///
/// Returns an error if the Content-Type is not multipart/form-data or the
/// boundary parameter is absent or empty.
pub fn extract_boundary(content_type: &str) -> Result<String, ApiError> {
    let mime: mime::Mime = content_type.trim().parse().map_err(|_| {
        ApiError::with_message(
            ApiErrorCode::InvalidContentType,
            format!("Invalid Content-Type. Expected multipart/form-data, got: {content_type}"),
        )
    })?;

    if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
        return Err(ApiError::with_message(
            ApiErrorCode::InvalidContentType,
            format!("Invalid Content-Type. Expected multipart/form-data, got: {content_type}"),
        ));
    }

    match mime.get_param(mime::BOUNDARY) {
        Some(boundary) if !boundary.as_str().is_empty() => Ok(boundary.as_str().to_owned()),
        Some(_) => Err(ApiError::with_message(
            ApiErrorCode::InvalidContentType,
            "Empty boundary in Content-Type",
        )),
        None => Err(ApiError::with_message(
            ApiErrorCode::InvalidContentType,
            "Missing boundary in Content-Type",
        )),
    }
}

/// Decode a multipart/form-data body into its fields.
///
/// The body is split on `--<boundary>`. Everything before the first delimiter
/// is preamble and everything after the closing `--<boundary>--` is epilogue;
/// both are ignored. Each part is split at its first blank line into headers
/// and payload, so blank lines inside a file never cut it short.
///
/// # Errors
///
/// Returns [`MultipartError::MalformedMultipart`] if the boundary is unusable or
/// never occurs in the body. Individual malformed parts are skipped instead.
pub fn decode(body: impl AsRef<[u8]>, boundary: &str) -> Result<ParsedForm, MultipartError> {
    let body = body.as_ref();
    validate_boundary(boundary)?;

    let delimiter = format!("--{boundary}");
    let pieces = split_on(body, delimiter.as_bytes());
    if pieces.len() < 2 {
        return Err(MultipartError::MalformedMultipart(
            "body does not contain the boundary delimiter".to_owned(),
        ));
    }

    let mut form = ParsedForm::new();

    // The first piece is the preamble.
    for (piece, terminated) in pieces.into_iter().skip(1) {
        let trimmed = piece.trim_ascii();
        if trimmed.is_empty() || trimmed == b"--" {
            continue;
        }
        // Close delimiter: the rest is epilogue.
        if piece.starts_with(b"--") {
            break;
        }

        if let Some((name, value)) = decode_part(piece, terminated) {
            if form.insert(name.clone(), value).is_some() {
                tracing::debug!(field = %name, "repeated form field, keeping the last value");
            }
        }
    }

    Ok(form)
}

fn validate_boundary(boundary: &str) -> Result<(), MultipartError> {
    if boundary.is_empty() {
        return Err(MultipartError::MalformedMultipart(
            "empty boundary".to_owned(),
        ));
    }
    if boundary.contains(['\r', '\n']) {
        return Err(MultipartError::MalformedMultipart(
            "boundary contains a line break".to_owned(),
        ));
    }
    Ok(())
}

/// Decode one part into its field name and value.
///
/// `terminated` is false for a trailing part that no delimiter closes; its
/// payload is kept as is. Returns `None` for parts that cannot be addressed.
fn decode_part(part: &[u8], terminated: bool) -> Option<(String, FieldValue)> {
    let Some((headers_section, payload)) = split_headers_body(part) else {
        tracing::debug!(len = part.len(), "skipping part without header separator");
        return None;
    };

    let headers = PartHeaders::parse(headers_section);
    let Some(disposition) = headers.content_disposition() else {
        tracing::debug!("skipping part without a form-data name");
        return None;
    };

    let payload = if terminated {
        strip_delimiter_artifact(payload)
    } else {
        payload
    };

    let value = match disposition.filename {
        Some(filename) => FieldValue::File(UploadedFile {
            filename,
            content_type: headers
                .content_type()
                .unwrap_or(DEFAULT_FILE_CONTENT_TYPE)
                .to_owned(),
            data: Bytes::copy_from_slice(payload),
        }),
        None => FieldValue::Text(String::from_utf8_lossy(payload).trim().to_owned()),
    };

    Some((disposition.name, value))
}

/// Split a part into headers and payload at the first blank line.
///
/// CRLF line endings are standard; bare LF is tolerated. Whichever separator
/// comes first ends the headers.
fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let crlf = find_bytes(part, b"\r\n\r\n").map(|pos| (pos, 4));
    let lf = find_bytes(part, b"\n\n").map(|pos| (pos, 2));

    let (pos, len) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };

    Some((&part[..pos], &part[pos + len..]))
}

/// Remove what the next delimiter left behind at the end of a payload.
///
/// The line break before `--<boundary>` belongs to the delimiter, not to the
/// payload. A dangling `\r\n--` is removed as well.
fn strip_delimiter_artifact(payload: &[u8]) -> &[u8] {
    if let Some(stripped) = payload.strip_suffix(b"\r\n--") {
        return stripped;
    }
    if let Some(stripped) = payload.strip_suffix(b"\r\n") {
        return stripped;
    }
    payload.strip_suffix(b"\n").unwrap_or(payload)
}

/// Split a haystack on every occurrence of the needle.
///
/// Each piece is paired with whether a needle followed it; only the last
/// piece is unterminated.
fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<(&'a [u8], bool)> {
    let mut pieces = Vec::new();
    let mut remaining = haystack;
    while let Some(pos) = find_bytes(remaining, needle) {
        pieces.push((&remaining[..pos], true));
        remaining = &remaining[pos + needle.len()..];
    }
    pieces.push((remaining, false));
    pieces
}

/// Find the position of a needle in a haystack.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
