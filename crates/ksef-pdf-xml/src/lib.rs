//! XML document handling for the KSeF PDF service.
//!
//! Uploaded invoices and UPO receipts arrive as XML. Before they reach the PDF
//! renderer they are converted into a generic [`XmlNode`] tree and every
//! namespace prefix is removed from its keys, so the renderer can address
//! `Faktura/Fa/P_15` no matter whether the author wrote `tns:Faktura` or
//! `ns2:Faktura`.
//!
//! # Key components
//!
//! - [`XmlNode`] and [`XmlMap`]: the tree shape (scalar, sequence, mapping)
//! - [`from_xml`]: compact XML-to-tree conversion
//! - [`strip_prefixes`]: recursive namespace-prefix normalization
//! - [`parse_document`]: both steps in one call
//!
//! # Compact conventions
//!
//! - Attributes: `_attributes`
//! - Text content: `_text`; CDATA: `_cdata`; comments: `_comment`
//! - XML declaration: `_declaration`
//! - Repeated child elements collapse into a sequence

pub mod deserialize;
pub mod error;
pub mod node;
pub mod normalize;

pub use deserialize::{from_xml, parse_document};
pub use error::XmlError;
pub use node::{XmlMap, XmlNode};
pub use normalize::{local_name, strip_prefixes};
