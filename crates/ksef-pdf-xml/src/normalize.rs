//! Namespace-prefix normalization of converted XML trees.
//!
//! Invoice producers are free to pick any namespace prefix (`tns:Faktura`,
//! `ns2:Faktura`) or none at all. [`strip_prefixes`] rewrites every mapping key
//! to its local name so that consumers can address fields by a stable name.
//!
//! Two keys that only differ in their prefix (`a:x`, `b:x`) collapse into one
//! entry. The value of the key that comes later in the mapping wins, and the
//! entry keeps the position of the earlier key.

use crate::node::{XmlMap, XmlNode};

/// Remove the namespace prefix from every mapping key in the tree.
///
/// Scalars are returned unchanged and sequences keep their length and order;
/// only mapping keys are rewritten. Applying it twice gives the same tree as
/// applying it once.
#[must_use]
pub fn strip_prefixes(node: XmlNode) -> XmlNode {
    match node {
        XmlNode::Sequence(items) => {
            XmlNode::Sequence(items.into_iter().map(strip_prefixes).collect())
        }
        XmlNode::Mapping(map) => XmlNode::Mapping(
            map.into_iter()
                .map(|(key, value)| (strip_key(key), strip_prefixes(value)))
                .collect::<XmlMap>(),
        ),
        scalar @ (XmlNode::Null | XmlNode::Text(_) | XmlNode::Number(_)) => scalar,
    }
}

/// The local part of a possibly prefixed key.
///
/// The local part is the segment that follows the first `:`, up to any further
/// `:`. Keys without a `:` are returned as-is.
///
/// ```
/// use ksef_pdf_xml::local_name;
///
/// assert_eq!(local_name("tns:Invoice"), "Invoice");
/// assert_eq!(local_name("Invoice"), "Invoice");
/// ```
#[must_use]
pub fn local_name(key: &str) -> &str {
    match key.split_once(':') {
        Some((_, rest)) => rest.split_once(':').map_or(rest, |(local, _)| local),
        None => key,
    }
}

fn strip_key(key: String) -> String {
    if key.contains(':') {
        local_name(&key).to_owned()
    } else {
        key
    }
}
