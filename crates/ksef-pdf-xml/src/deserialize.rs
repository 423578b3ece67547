//! Compact XML-to-tree conversion.
//!
//! [`from_xml`] turns an XML document into an [`XmlNode`] mapping using the
//! compact layout: every element becomes a mapping keyed by its child element
//! names, attributes go under `_attributes`, text under `_text`. A child name
//! that occurs more than once becomes a sequence in document order.
//!
//! ```text
//! <tns:Faktura xmlns:tns="urn:fa">          {"tns:Faktura": {
//!   <tns:P_1>2024-01-31</tns:P_1>     ->      "_attributes": {"xmlns:tns": "urn:fa"},
//!   <tns:Row>1</tns:Row>                       "tns:P_1": {"_text": "2024-01-31"},
//!   <tns:Row>2</tns:Row>                       "tns:Row": [{"_text": "1"}, {"_text": "2"}]
//! </tns:Faktura>                             }}
//! ```
//!
//! Element and attribute names are kept verbatim, prefixes included; removing
//! them is the job of [`strip_prefixes`](crate::strip_prefixes).

use quick_xml::Reader;
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesDecl, BytesStart, Event};

use crate::error::XmlError;
use crate::node::{XmlMap, XmlNode};
use crate::normalize::strip_prefixes;

const ATTRIBUTES_KEY: &str = "_attributes";
const TEXT_KEY: &str = "_text";
const CDATA_KEY: &str = "_cdata";
const COMMENT_KEY: &str = "_comment";
const DECLARATION_KEY: &str = "_declaration";
const INSTRUCTION_KEY: &str = "_instruction";
const DOCTYPE_KEY: &str = "_doctype";

/// Convert a UTF-8 XML document into a compact [`XmlNode`] tree.
///
/// The returned node is always a mapping holding the declaration (if any) and
/// the root element.
///
/// # Errors
///
/// Returns `XmlError` if the document is not UTF-8, is malformed, or has no
/// root element.
pub fn from_xml(xml: &[u8]) -> Result<XmlNode, XmlError> {
    let text = std::str::from_utf8(xml)?;
    let text = text.trim_start_matches('\u{feff}');

    let mut reader = Reader::from_str(text);

    // Open elements: (qualified name, children collected so far).
    let mut stack: Vec<(String, XmlMap)> = Vec::new();
    let mut document = XmlMap::new();
    // Character data is reported in pieces around entity references.
    let mut pending_text = String::new();
    let mut saw_root = false;

    loop {
        let event = reader.read_event()?;
        if !matches!(event, Event::Text(_) | Event::GeneralRef(_)) {
            flush_text(&mut stack, &mut pending_text);
        }

        match event {
            Event::Start(e) => {
                let name = element_name(&e)?;
                let map = read_attributes(e.attributes())?;
                stack.push((name, map));
            }
            Event::Empty(e) => {
                let name = element_name(&e)?;
                let map = read_attributes(e.attributes())?;
                saw_root |= stack.is_empty();
                current(&mut stack, &mut document).append(name, XmlNode::Mapping(map));
            }
            Event::End(_) => {
                let (name, map) = stack.pop().ok_or_else(|| {
                    XmlError::UnexpectedElement("closing tag without opening tag".to_owned())
                })?;
                saw_root |= stack.is_empty();
                current(&mut stack, &mut document).append(name, XmlNode::Mapping(map));
            }
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                pending_text.push_str(&unescaped);
            }
            Event::GeneralRef(e) => {
                let name = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let reference = format!("&{name};");
                let resolved = quick_xml::escape::unescape(&reference)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                pending_text.push_str(&resolved);
            }
            Event::CData(e) => {
                let data = std::str::from_utf8(&e)?;
                if let Some((_, map)) = stack.last_mut() {
                    map.append(CDATA_KEY, XmlNode::text(data));
                }
            }
            Event::Comment(e) => {
                let comment = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                current(&mut stack, &mut document).append(COMMENT_KEY, XmlNode::text(comment));
            }
            Event::Decl(e) => {
                document.insert(DECLARATION_KEY, read_declaration(&e)?);
            }
            Event::PI(e) => {
                let target = std::str::from_utf8(e.target())?.to_owned();
                let content = std::str::from_utf8(e.content())?.trim().to_owned();
                let mut instruction = XmlMap::new();
                instruction.insert(target, XmlNode::text(content));
                current(&mut stack, &mut document)
                    .append(INSTRUCTION_KEY, XmlNode::Mapping(instruction));
            }
            Event::DocType(e) => {
                let doctype = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                document.insert(DOCTYPE_KEY, XmlNode::text(doctype.trim()));
            }
            Event::Eof => break,
        }
    }

    if let Some((name, _)) = stack.last() {
        return Err(XmlError::UnexpectedElement(format!(
            "unexpected EOF inside <{name}>"
        )));
    }
    if !saw_root {
        return Err(XmlError::MissingElement("root element".to_owned()));
    }

    tracing::trace!(entries = document.len(), "converted XML document");
    Ok(XmlNode::Mapping(document))
}

/// Convert an XML document and strip every namespace prefix from its keys.
///
/// # Errors
///
/// Returns `XmlError` if the document cannot be converted.
pub fn parse_document(xml: &[u8]) -> Result<XmlNode, XmlError> {
    from_xml(xml).map(strip_prefixes)
}

/// The mapping new children go into: the innermost open element, or the document.
fn current<'a>(stack: &'a mut [(String, XmlMap)], document: &'a mut XmlMap) -> &'a mut XmlMap {
    match stack.last_mut() {
        Some((_, map)) => map,
        None => document,
    }
}

/// Move buffered character data into the innermost open element.
///
/// Whitespace-only runs between elements are not content and are dropped.
fn flush_text(stack: &mut [(String, XmlMap)], pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let text = std::mem::take(pending);
    if text.trim().is_empty() {
        return;
    }
    if let Some((_, map)) = stack.last_mut() {
        map.append(TEXT_KEY, XmlNode::Text(text));
    }
}

fn element_name(e: &BytesStart<'_>) -> Result<String, XmlError> {
    let name = e.name();
    Ok(std::str::from_utf8(name.as_ref())?.to_owned())
}

/// Read the attributes of an element into a fresh child mapping.
fn read_attributes(attributes: Attributes<'_>) -> Result<XmlMap, XmlError> {
    let mut attrs = XmlMap::new();
    for attr in attributes {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_owned();
        let raw = std::str::from_utf8(&attr.value)?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|err| XmlError::ParseError(err.to_string()))?;
        attrs.insert(key, XmlNode::text(value));
    }

    let mut map = XmlMap::new();
    if !attrs.is_empty() {
        map.insert(ATTRIBUTES_KEY, XmlNode::Mapping(attrs));
    }
    Ok(map)
}

fn read_declaration(decl: &BytesDecl<'_>) -> Result<XmlNode, XmlError> {
    let mut attrs = XmlMap::new();
    let version = decl.version()?;
    attrs.insert("version", XmlNode::text(std::str::from_utf8(&version)?));
    if let Some(encoding) = decl.encoding() {
        let encoding = encoding?;
        attrs.insert("encoding", XmlNode::text(std::str::from_utf8(&encoding)?));
    }
    if let Some(standalone) = decl.standalone() {
        let standalone = standalone?;
        attrs.insert("standalone", XmlNode::text(std::str::from_utf8(&standalone)?));
    }

    let mut map = XmlMap::new();
    map.insert(ATTRIBUTES_KEY, XmlNode::Mapping(attrs));
    Ok(XmlNode::Mapping(map))
}
