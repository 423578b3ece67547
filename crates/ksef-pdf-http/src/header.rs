//! Header-field parsing for multipart part headers.
//!
//! Part headers such as
//!
//! ```text
//! Content-Disposition: form-data; name="xml"; filename="invoice.xml"
//! ```
//!
//! follow a small grammar:
//!
//! ```text
//! header-value = token *( OWS ";" OWS parameter )
//! parameter    = attribute OWS "=" OWS ( token / quoted-string )
//! ```
//!
//! Attribute names are case-insensitive; the first occurrence of a repeated
//! attribute wins. Inside a quoted string `\"` and `\\` are escapes, any other
//! backslash is kept as-is so raw Windows paths in `filename` survive.

use std::borrow::Cow;

/// Why a header value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderParseError {
    /// The value has no leading token.
    #[error("header value is empty")]
    EmptyValue,

    /// A parameter has no attribute name.
    #[error("empty parameter name at byte {0}")]
    EmptyParameterName(usize),

    /// A parameter has a name but no `=value`.
    #[error("parameter '{0}' has no value")]
    MissingValue(String),

    /// A quoted string is not closed.
    #[error("unterminated quoted string at byte {0}")]
    UnterminatedQuote(usize),

    /// Garbage after a quoted parameter value.
    #[error("unexpected character '{0}' at byte {1}")]
    UnexpectedCharacter(char, usize),
}

/// A parsed `token; attr=value; ...` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedValue {
    value: String,
    params: Vec<(String, String)>,
}

impl ParameterizedValue {
    /// Parse a header value according to the module grammar.
    pub fn parse(input: &str) -> Result<Self, HeaderParseError> {
        let (value, rest) = input.split_once(';').unwrap_or((input, ""));
        let value = value.trim();
        if value.is_empty() {
            return Err(HeaderParseError::EmptyValue);
        }

        let mut params: Vec<(String, String)> = Vec::new();
        let offset = input.len() - rest.len();
        let mut cursor = Cursor::new(rest, offset);

        loop {
            cursor.skip_whitespace_and(';');
            if cursor.is_done() {
                break;
            }

            let start = cursor.position();
            let attribute = cursor.take_until(|c| c == '=' || c == ';').trim();
            if attribute.is_empty() {
                return Err(HeaderParseError::EmptyParameterName(start));
            }
            if !cursor.eat('=') {
                return Err(HeaderParseError::MissingValue(attribute.to_owned()));
            }
            cursor.skip_whitespace();

            let attr_value = if cursor.peek() == Some('"') {
                let quoted = cursor.take_quoted()?;
                cursor.skip_whitespace();
                match cursor.peek() {
                    None | Some(';') => {}
                    Some(c) => {
                        return Err(HeaderParseError::UnexpectedCharacter(c, cursor.position()));
                    }
                }
                quoted.into_owned()
            } else {
                cursor.take_until(|c| c == ';').trim().to_owned()
            };

            let attribute = attribute.to_ascii_lowercase();
            if !params.iter().any(|(name, _)| *name == attribute) {
                params.push((attribute, attr_value));
            }
        }

        Ok(Self {
            value: value.to_owned(),
            params,
        })
    }

    /// The leading token, e.g. `form-data`.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Look up a parameter by case-insensitive name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The `Content-Disposition` of a `multipart/form-data` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Form field name.
    pub name: String,
    /// Original file name, for file uploads.
    pub filename: Option<String>,
}

impl ContentDisposition {
    /// Interpret a parsed header value as a form-data disposition.
    ///
    /// Returns `None` unless the disposition type is `form-data` with a
    /// non-empty `name`. An empty `filename` counts as no filename.
    #[must_use]
    pub fn from_value(value: &ParameterizedValue) -> Option<Self> {
        if !value.value().eq_ignore_ascii_case("form-data") {
            return None;
        }
        let name = value.param("name").filter(|n| !n.is_empty())?;
        let filename = value
            .param("filename")
            .filter(|f| !f.is_empty())
            .map(str::to_owned);
        Some(Self {
            name: name.to_owned(),
            filename,
        })
    }
}

/// The header lines of a single multipart part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    fields: Vec<(String, String)>,
}

impl PartHeaders {
    /// Parse a raw header section.
    ///
    /// Lines may end in CRLF or LF. Lines starting with whitespace continue
    /// the previous header; lines without a `:` are ignored.
    #[must_use]
    pub fn parse(section: &[u8]) -> Self {
        let text = String::from_utf8_lossy(section);
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = fields.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                fields.push((name.trim().to_owned(), value.trim().to_owned()));
            }
        }

        Self { fields }
    }

    /// First value of a header, by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The form-data disposition of the part, if present and well-formed.
    #[must_use]
    pub fn content_disposition(&self) -> Option<ContentDisposition> {
        let raw = self.get("content-disposition")?;
        match ParameterizedValue::parse(raw) {
            Ok(value) => ContentDisposition::from_value(&value),
            Err(e) => {
                tracing::debug!(header = raw, error = %e, "unparseable Content-Disposition");
                None
            }
        }
    }

    /// The part's `Content-Type`, if present and non-empty.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type").filter(|v| !v.is_empty())
    }
}

/// Character cursor over the parameter list, tracking byte offsets for errors.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str, offset: usize) -> Self {
        Self {
            input,
            pos: 0,
            offset,
        }
    }

    fn position(&self) -> usize {
        self.offset + self.pos
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn is_done(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn skip_whitespace_and(&mut self, separator: char) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == separator {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn take_until(&mut self, stop: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(stop).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    /// Consume a quoted string starting at the opening quote.
    fn take_quoted(&mut self) -> Result<Cow<'a, str>, HeaderParseError> {
        let start = self.position();
        self.pos += 1;
        let rest = self.rest();

        let mut out: Option<String> = None;
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(match out {
                        Some(s) => Cow::Owned(s),
                        None => Cow::Borrowed(&rest[..i]),
                    });
                }
                '\\' if matches!(chars.peek(), Some((_, '"' | '\\'))) => {
                    let buf = out.get_or_insert_with(|| rest[..i].to_owned());
                    if let Some((_, escaped)) = chars.next() {
                        buf.push(escaped);
                    }
                }
                _ => {
                    if let Some(buf) = out.as_mut() {
                        buf.push(c);
                    }
                }
            }
        }

        Err(HeaderParseError::UnterminatedQuote(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_value_and_quoted_params() {
        let v = ParameterizedValue::parse(r#"form-data; name="xml"; filename="invoice.xml""#)
            .expect("should parse");
        assert_eq!(v.value(), "form-data");
        assert_eq!(v.param("name"), Some("xml"));
        assert_eq!(v.param("filename"), Some("invoice.xml"));
        assert_eq!(v.param("missing"), None);
    }

    #[test]
    fn test_should_parse_unquoted_params_and_case_insensitive_names() {
        let v = ParameterizedValue::parse("Form-Data ;NAME=field ; Filename = a.xml ")
            .expect("should parse");
        assert_eq!(v.value(), "Form-Data");
        assert_eq!(v.param("name"), Some("field"));
        assert_eq!(v.param("filename"), Some("a.xml"));
    }

    #[test]
    fn test_should_keep_semicolons_inside_quotes() {
        let v = ParameterizedValue::parse(r#"form-data; name="a;b"; filename="x.xml""#)
            .expect("should parse");
        assert_eq!(v.param("name"), Some("a;b"));
        assert_eq!(v.param("filename"), Some("x.xml"));
    }

    #[test]
    fn test_should_unescape_quotes_and_keep_other_backslashes() {
        let v = ParameterizedValue::parse(r#"form-data; name="say \"hi\""; filename="C:\Users\a.xml""#)
            .expect("should parse");
        assert_eq!(v.param("name"), Some(r#"say "hi""#));
        assert_eq!(v.param("filename"), Some(r"C:\Users\a.xml"));
    }

    #[test]
    fn test_should_keep_first_repeated_param() {
        let v = ParameterizedValue::parse(r#"form-data; name="first"; name="second""#)
            .expect("should parse");
        assert_eq!(v.param("name"), Some("first"));
    }

    #[test]
    fn test_should_reject_malformed_values() {
        assert_eq!(
            ParameterizedValue::parse("  ; name=x"),
            Err(HeaderParseError::EmptyValue)
        );
        assert_eq!(
            ParameterizedValue::parse("form-data; name"),
            Err(HeaderParseError::MissingValue("name".to_owned()))
        );
        assert!(matches!(
            ParameterizedValue::parse(r#"form-data; name="open"#),
            Err(HeaderParseError::UnterminatedQuote(_))
        ));
        assert!(matches!(
            ParameterizedValue::parse(r#"form-data; name="a"b"#),
            Err(HeaderParseError::UnexpectedCharacter('b', _))
        ));
        assert!(matches!(
            ParameterizedValue::parse("form-data; =x"),
            Err(HeaderParseError::EmptyParameterName(_))
        ));
    }

    #[test]
    fn test_should_build_form_data_disposition() {
        let v = ParameterizedValue::parse(r#"form-data; name="xml"; filename="""#)
            .expect("should parse");
        let d = ContentDisposition::from_value(&v).expect("form-data");
        assert_eq!(d.name, "xml");
        assert_eq!(d.filename, None);

        let attachment = ParameterizedValue::parse(r#"attachment; name="xml""#).expect("parse");
        assert!(ContentDisposition::from_value(&attachment).is_none());

        let unnamed = ParameterizedValue::parse(r#"form-data; filename="a.xml""#).expect("parse");
        assert!(ContentDisposition::from_value(&unnamed).is_none());
    }

    #[test]
    fn test_should_parse_part_headers() {
        let headers = PartHeaders::parse(
            b"\r\ncontent-disposition: form-data;\r\n name=\"xml\"; filename=\"f.xml\"\r\nContent-Type:  text/xml \r\nbogus line",
        );
        let d = headers.content_disposition().expect("disposition");
        assert_eq!(d.name, "xml");
        assert_eq!(d.filename.as_deref(), Some("f.xml"));
        assert_eq!(headers.content_type(), Some("text/xml"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/xml"));
    }

    #[test]
    fn test_should_treat_empty_content_type_as_absent() {
        let headers = PartHeaders::parse(b"Content-Type:\r\n");
        assert_eq!(headers.content_type(), None);
    }
}
