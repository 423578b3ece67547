//! Integration tests for the KSeF PDF server.
//!
//! These tests require a running server at `localhost:3000`, started with
//! `cat` as its renderer so that the "PDF" it returns is the render request
//! itself:
//!
//! ```text
//! RENDERER_COMMAND=cat cargo run -p ksef-pdf-server
//! cargo test -p ksef-pdf-integration -- --ignored
//! ```

use std::sync::Once;

use reqwest::multipart::{Form, Part};

static INIT: Once = Once::new();

/// A small invoice with namespace prefixes.
pub const INVOICE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tns:Faktura xmlns:tns="http://crd.gov.pl/wzor/2023/06/29/12648/">
  <tns:Naglowek><tns:KodFormularza kodSystemowy="FA (2)">FA</tns:KodFormularza></tns:Naglowek>
  <tns:Fa>
    <tns:P_2>FV/2024/001</tns:P_2>
    <tns:FaWiersz><tns:P_7>Widget</tns:P_7></tns:FaWiersz>
    <tns:FaWiersz><tns:P_7>Gadget</tns:P_7></tns:FaWiersz>
  </tns:Fa>
</tns:Faktura>"#;

/// A small UPO receipt.
pub const UPO_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<upo:Potwierdzenie xmlns:upo="http://upo.schematy.mf.gov.pl/KSeF/v2">
  <upo:NumerReferencyjnySesji>20240101-SE-0000000000-0000000000-00</upo:NumerReferencyjnySesji>
</upo:Potwierdzenie>"#;

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Base URL of the server under test.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("KSEF_PDF_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Absolute URL for `path`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", endpoint_url())
}

/// Create an HTTP client.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Build a form with the `xml` file field.
pub fn xml_form(filename: &str, xml: &str) -> anyhow::Result<Form> {
    let part = Part::bytes(xml.as_bytes().to_vec())
        .file_name(filename.to_owned())
        .mime_str("text/xml")?;
    Ok(Form::new().part("xml", part))
}

/// POST a form to `path` and return status and body.
pub async fn post_form(path: &str, form: Form) -> anyhow::Result<(reqwest::StatusCode, Vec<u8>)> {
    let response = client().post(url(path)).multipart(form).send().await?;
    let status = response.status();
    let body = response.bytes().await?.to_vec();
    tracing::debug!(path, %status, size = body.len(), "posted form");
    Ok((status, body))
}

mod test_errors;
mod test_generate;
mod test_health;
