//! HTTP layer of the KSeF PDF service.
//!
//! This crate turns uploaded XML documents into PDFs. It handles:
//!
//! - **Multipart decoding** ([`multipart`], [`header`]): recovers named text
//!   fields and file attachments from a raw `multipart/form-data` body.
//!
//! - **Routing** ([`router`]): maps method and path to the health probe, CORS
//!   preflight or one of the generate endpoints.
//!
//! - **Pipeline** ([`generate`]): validates the upload, converts the XML into
//!   a prefix-free tree and hands it to the renderer.
//!
//! - **Renderer boundary** ([`render`]): the [`PdfRenderer`] trait.
//!
//! - **Service** ([`service`]): the hyper [`KsefPdfService`].
//!
//! - **Proxy adapter** ([`proxy`]): runs the same pipeline for API Gateway
//!   proxy events.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request / proxy event
//!   -> Router (health, preflight, generate-invoice, generate-upo)
//!   -> Body collection (size limited)
//!   -> multipart::decode -> "xml" file + optional "additionalData"
//!   -> ksef_pdf_xml::parse_document (convert + strip prefixes)
//!   -> PdfRenderer
//!   -> Common response headers (x-request-id, Server, CORS)
//! <- PDF or JSON error
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use ksef_pdf_http::render::NotImplementedRenderer;
//! use ksef_pdf_http::service::{HttpConfig, KsefPdfService};
//!
//! let service = KsefPdfService::new(NotImplementedRenderer, HttpConfig::default());
//! // Use `service` with hyper server.
//! ```

// ApiError is returned from every pipeline step and carries an owned message
// and details; boxing it in each Result buys nothing on this request path.
#![allow(clippy::result_large_err)]

pub mod error;
pub mod generate;
pub mod header;
pub mod multipart;
pub mod proxy;
pub mod render;
pub mod response;
pub mod router;
pub mod service;

pub use error::{ApiError, ApiErrorCode};
pub use generate::{GeneratedPdf, generate_pdf};
pub use multipart::{FieldValue, MultipartError, ParsedForm, UploadedFile};
pub use proxy::{ProxyRequest, ProxyResponse, handle_proxy_event};
pub use render::{DocumentKind, NotImplementedRenderer, PdfRenderer, RenderError, RenderRequest};
pub use response::ResponseBody;
pub use router::{Route, Router};
pub use service::{HttpConfig, KsefPdfService};
