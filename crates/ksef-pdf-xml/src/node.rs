//! The generic document tree produced from XML input.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A node of a converted XML document.
///
/// The tree mirrors the JSON-like shape of a compact XML conversion: elements
/// become mappings, repeated elements become sequences, and text ends up in
/// scalars.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum XmlNode {
    /// Absent value.
    #[default]
    Null,
    /// Text scalar.
    Text(String),
    /// Numeric scalar.
    Number(f64),
    /// Ordered sequence of nodes.
    Sequence(Vec<XmlNode>),
    /// Keyed children in insertion order.
    Mapping(XmlMap),
}

impl XmlNode {
    /// Create a text scalar.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Borrow the text of a text scalar.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the mapping of a mapping node.
    #[must_use]
    pub fn as_mapping(&self) -> Option<&XmlMap> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the items of a sequence node.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[XmlNode]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a child of a mapping node by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&XmlNode> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Follow a path of mapping keys from this node.
    ///
    /// ```
    /// use ksef_pdf_xml::{XmlMap, XmlNode};
    ///
    /// let amount = XmlNode::Mapping(XmlMap::from_iter([("Amount".to_owned(), XmlNode::text("10"))]));
    /// let root = XmlNode::Mapping(XmlMap::from_iter([("Invoice".to_owned(), amount)]));
    /// assert_eq!(root.pointer(&["Invoice", "Amount"]).and_then(XmlNode::as_text), Some("10"));
    /// ```
    #[must_use]
    pub fn pointer(&self, path: &[&str]) -> Option<&XmlNode> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }
}

impl From<&str> for XmlNode {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for XmlNode {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for XmlNode {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<XmlNode>> for XmlNode {
    fn from(items: Vec<XmlNode>) -> Self {
        Self::Sequence(items)
    }
}

impl From<XmlMap> for XmlNode {
    fn from(map: XmlMap) -> Self {
        Self::Mapping(map)
    }
}

impl Serialize for XmlNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(map) => map.serialize(serializer),
        }
    }
}

/// An insertion-ordered string-keyed map of [`XmlNode`]s.
///
/// Keys are unique. [`insert`](Self::insert) on an existing key replaces the
/// value but keeps the key at its original position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlMap {
    entries: Vec<(String, XmlNode)>,
}

impl XmlMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&XmlNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: XmlNode) -> Option<XmlNode> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Insert a value, turning the entry into a sequence if the key already exists.
    ///
    /// This is how repeated sibling elements accumulate during conversion.
    pub fn append(&mut self, key: impl Into<String>, value: XmlNode) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, XmlNode::Sequence(items))) => items.push(value),
            Some((_, slot)) => {
                let first = std::mem::take(slot);
                *slot = XmlNode::Sequence(vec![first, value]);
            }
            None => self.entries.push((key, value)),
        }
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, XmlNode)> for XmlMap {
    fn from_iter<I: IntoIterator<Item = (String, XmlNode)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for XmlMap {
    type Item = (String, XmlNode);
    type IntoIter = std::vec::IntoIter<(String, XmlNode)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for XmlMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_replace_value_in_place_on_insert() {
        let mut map = XmlMap::new();
        map.insert("a", XmlNode::text("1"));
        map.insert("b", XmlNode::text("2"));
        let previous = map.insert("a", XmlNode::text("3"));

        assert_eq!(previous, Some(XmlNode::text("1")));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&XmlNode::text("3")));
    }

    #[test]
    fn test_should_collect_repeated_keys_into_sequence_on_append() {
        let mut map = XmlMap::new();
        map.append("Row", XmlNode::text("1"));
        map.append("Row", XmlNode::text("2"));
        map.append("Row", XmlNode::text("3"));

        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("Row"),
            Some(&XmlNode::Sequence(vec![
                XmlNode::text("1"),
                XmlNode::text("2"),
                XmlNode::text("3"),
            ]))
        );
    }

    #[test]
    fn test_should_serialize_to_plain_json_shape() {
        let mut inner = XmlMap::new();
        inner.insert("_text", XmlNode::text("10"));
        let mut root = XmlMap::new();
        root.insert("Amount", XmlNode::Mapping(inner));
        root.insert("Rate", XmlNode::Number(0.23));
        root.insert("Lines", XmlNode::Sequence(vec![XmlNode::Null]));

        let json = serde_json::to_string(&XmlNode::Mapping(root)).expect("serializable");
        assert_eq!(
            json,
            r#"{"Amount":{"_text":"10"},"Rate":0.23,"Lines":[null]}"#
        );
    }

    #[test]
    fn test_should_follow_pointer_through_mappings() {
        let mut inner = XmlMap::new();
        inner.insert("P_15", XmlNode::text("123.00"));
        let mut root = XmlMap::new();
        root.insert("Fa", XmlNode::Mapping(inner));
        let root = XmlNode::Mapping(root);

        assert_eq!(
            root.pointer(&["Fa", "P_15"]).and_then(XmlNode::as_text),
            Some("123.00")
        );
        assert!(root.pointer(&["Fa", "Missing"]).is_none());
        assert!(XmlNode::text("x").get("Fa").is_none());
    }
}
