//! The document-to-PDF pipeline shared by the HTTP service and the proxy adapter.
//!
//! ```text
//! Content-Type -> boundary -> ParsedForm -> "xml" file -> XmlNode -> strip_prefixes
//!   -> PdfRenderer -> PDF bytes
//! ```

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{ApiError, ApiErrorCode};
use crate::multipart::{self, ParsedForm};
use crate::render::{DocumentKind, PdfRenderer, RenderRequest};

/// Form field carrying the uploaded XML document.
pub const XML_FIELD: &str = "xml";

/// Optional form field carrying a JSON object of extra invoice data.
pub const ADDITIONAL_DATA_FIELD: &str = "additionalData";

/// A rendered PDF ready to be sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPdf {
    /// File name offered in `Content-Disposition`.
    pub filename: String,
    /// The PDF bytes.
    pub data: Bytes,
}

/// Decode an upload, normalize its XML and render it.
///
/// `content_type` is the request's `Content-Type` header, if any.
///
/// ```
/// use ksef_pdf_http::{ApiErrorCode, DocumentKind, NotImplementedRenderer, generate_pdf};
///
/// # tokio_test::block_on(async {
/// let err = generate_pdf(&NotImplementedRenderer, DocumentKind::Upo, Some("text/plain"), b"")
///     .await
///     .unwrap_err();
/// assert_eq!(err.code, ApiErrorCode::InvalidContentType);
/// # });
/// ```
pub async fn generate_pdf<R>(
    renderer: &R,
    kind: DocumentKind,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<GeneratedPdf, ApiError>
where
    R: PdfRenderer + ?Sized,
{
    let boundary = multipart::extract_boundary(content_type.unwrap_or_default())?;
    let form = multipart::decode(body, &boundary)?;
    debug!(fields = form.len(), %kind, "decoded multipart form");

    let request = build_render_request(kind, &form)?;
    let data = renderer.render(request).await?;

    let filename = kind.pdf_filename(chrono::Utc::now().timestamp_millis());
    info!(%kind, %filename, size = data.len(), "rendered PDF");
    Ok(GeneratedPdf { filename, data })
}

/// Validate a decoded form and turn it into a renderer request.
pub fn build_render_request(
    kind: DocumentKind,
    form: &ParsedForm,
) -> Result<RenderRequest, ApiError> {
    let xml = form.require_file(XML_FIELD)?;
    if !has_xml_extension(&xml.filename) {
        return Err(ApiError::new(ApiErrorCode::InvalidFileType)
            .with_details(format!("unexpected file name: {}", xml.filename)));
    }

    let additional_data = match kind {
        DocumentKind::Invoice => parse_additional_data(form.text(ADDITIONAL_DATA_FIELD))?,
        DocumentKind::Upo => serde_json::Map::new(),
    };

    let document = ksef_pdf_xml::parse_document(&xml.data)?;
    Ok(RenderRequest::new(kind, document).with_additional_data(additional_data))
}

fn has_xml_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("xml"))
}

/// Parse the optional `additionalData` field. Absent or blank means no data.
fn parse_additional_data(
    raw: Option<&str>,
) -> Result<serde_json::Map<String, serde_json::Value>, ApiError> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(serde_json::Map::new());
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(ApiError::new(ApiErrorCode::InvalidAdditionalData)
            .with_details(format!("expected a JSON object, got {}", json_type_name(&other)))),
        Err(e) => Err(ApiError::new(ApiErrorCode::InvalidAdditionalData).with_details(e.to_string())),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ksef_pdf_xml::XmlNode;

    use super::*;
    use crate::multipart::{FieldValue, UploadedFile};
    use crate::render::{NotImplementedRenderer, RenderError, RenderFuture};

    const BOUNDARY: &str = "XyZ";
    const INVOICE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tns:Faktura xmlns:tns="http://crd.gov.pl/wzor/2023/06/29/12648/">
  <tns:Fa><tns:P_15>123.00</tns:P_15></tns:Fa>
</tns:Faktura>"#;

    #[derive(Default)]
    struct RecordingRenderer {
        seen: Mutex<Vec<RenderRequest>>,
    }

    impl PdfRenderer for RecordingRenderer {
        fn render(&self, request: RenderRequest) -> RenderFuture {
            self.seen.lock().expect("lock").push(request);
            Box::pin(async { Ok(Bytes::from_static(b"%PDF-1.7 fake")) })
        }
    }

    struct FailingRenderer;

    impl PdfRenderer for FailingRenderer {
        fn render(&self, _request: RenderRequest) -> RenderFuture {
            Box::pin(async { Err(RenderError::Failed("bad layout".to_owned())) })
        }
    }

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    fn body(filename: &str, xml: &str, additional: Option<&str>) -> Vec<u8> {
        let mut out = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"xml\"; filename=\"{filename}\"\r\nContent-Type: text/xml\r\n\r\n{xml}\r\n"
        );
        if let Some(data) = additional {
            out.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"additionalData\"\r\n\r\n{data}\r\n"
            ));
        }
        out.push_str(&format!("--{BOUNDARY}--\r\n"));
        out.into_bytes()
    }

    fn form_with_file(filename: &str, data: &str) -> ParsedForm {
        let mut form = ParsedForm::new();
        form.insert(
            XML_FIELD,
            FieldValue::File(UploadedFile {
                filename: filename.to_owned(),
                content_type: "text/xml".to_owned(),
                data: Bytes::copy_from_slice(data.as_bytes()),
            }),
        );
        form
    }

    #[tokio::test]
    async fn test_should_render_normalized_invoice() {
        let renderer = RecordingRenderer::default();
        let pdf = generate_pdf(
            &renderer,
            DocumentKind::Invoice,
            Some(&content_type()),
            &body("faktura.xml", INVOICE_XML, Some(r#"{"nrKSeF":"1-2-3"}"#)),
        )
        .await
        .expect("pdf");

        assert!(pdf.filename.starts_with("invoice-"));
        assert!(pdf.filename.ends_with(".pdf"));
        assert_eq!(&pdf.data[..], b"%PDF-1.7 fake");

        let seen = renderer.seen.lock().expect("lock");
        let request = &seen[0];
        assert_eq!(request.kind, DocumentKind::Invoice);
        assert_eq!(
            request
                .document
                .pointer(&["Faktura", "Fa", "P_15", "_text"])
                .and_then(XmlNode::as_text),
            Some("123.00")
        );
        assert_eq!(request.additional_data["nrKSeF"], "1-2-3");
    }

    #[tokio::test]
    async fn test_should_name_upo_files_and_ignore_additional_data() {
        let renderer = RecordingRenderer::default();
        let pdf = generate_pdf(
            &renderer,
            DocumentKind::Upo,
            Some(&content_type()),
            &body("upo.XML", "<Potwierdzenie/>", Some("not json")),
        )
        .await
        .expect("pdf");

        assert!(pdf.filename.starts_with("upo-"));
        assert!(renderer.seen.lock().expect("lock")[0].additional_data.is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_missing_content_type() {
        let err = generate_pdf(&NotImplementedRenderer, DocumentKind::Invoice, None, b"")
            .await
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::InvalidContentType);
    }

    #[tokio::test]
    async fn test_should_map_renderer_failure() {
        let err = generate_pdf(
            &FailingRenderer,
            DocumentKind::Invoice,
            Some(&content_type()),
            &body("f.xml", INVOICE_XML, None),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::RenderFailed);
        assert_eq!(err.details.as_deref(), Some("rendering failed: bad layout"));
    }

    #[test]
    fn test_should_require_xml_file() {
        let mut form = ParsedForm::new();
        form.insert(XML_FIELD, FieldValue::Text("<a/>".to_owned()));
        let err = build_render_request(DocumentKind::Invoice, &form).unwrap_err();
        assert_eq!(err.code, ApiErrorCode::MissingField);
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_reject_non_xml_file_names() {
        for name in ["invoice.pdf", "xml", ".xml", "invoice.xml.txt"] {
            let err = build_render_request(DocumentKind::Upo, &form_with_file(name, "<a/>"))
                .unwrap_err();
            assert_eq!(err.code, ApiErrorCode::InvalidFileType, "{name}");
        }
    }

    #[test]
    fn test_should_reject_malformed_xml() {
        let err = build_render_request(DocumentKind::Upo, &form_with_file("a.xml", "<a><b></a>"))
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::MalformedXml);
    }

    #[test]
    fn test_should_reject_non_object_additional_data() {
        for raw in ["[1,2]", "42", "{broken"] {
            let mut form = form_with_file("a.xml", "<a/>");
            form.insert(ADDITIONAL_DATA_FIELD, FieldValue::Text(raw.to_owned()));
            let err = build_render_request(DocumentKind::Invoice, &form).unwrap_err();
            assert_eq!(err.code, ApiErrorCode::InvalidAdditionalData, "{raw}");
        }
    }

    #[test]
    fn test_should_treat_blank_additional_data_as_empty() {
        let mut form = form_with_file("a.xml", "<a/>");
        form.insert(ADDITIONAL_DATA_FIELD, FieldValue::Text(String::new()));
        let request = build_render_request(DocumentKind::Invoice, &form).expect("request");
        assert!(request.additional_data.is_empty());
    }
}
