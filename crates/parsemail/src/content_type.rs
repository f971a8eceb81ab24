//! MIME content type and content disposition handling.
//!
//! Both headers share the RFC 2045 grammar `token[/token] *(; name=value)`,
//! with RFC 2231 extended (`name*=charset'lang'%XX`) and continued
//! (`name*0=`, `name*1*=`) parameters.

use crate::error::{Error, Result};
use crate::transcode::decode_labelled;
use std::collections::HashMap;
use std::fmt;

/// Multipart container kinds the tree walker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// `multipart/mixed`, and `multipart/signed` which is walked the same way.
    Mixed,
    /// `multipart/alternative`.
    Alternative,
    /// `multipart/related`.
    Related,
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mixed => write!(f, "multipart/mixed"),
            Self::Alternative => write!(f, "multipart/alternative"),
            Self::Related => write!(f, "multipart/related"),
        }
    }
}

/// Routing class of a media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A multipart container.
    Multipart(Container),
    /// `text/plain`.
    PlainText,
    /// `text/html`.
    HtmlText,
    /// Anything else.
    Other,
}

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// Creates the `text/plain` content type assumed when the header is absent.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Returns a parameter value by (lowercase) name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present and non-empty.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is `message/rfc822`.
    #[must_use]
    pub fn is_message_rfc822(&self) -> bool {
        self.main_type == "message" && self.sub_type == "rfc822"
    }

    /// Classifies the media type for routing.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        match (self.main_type.as_str(), self.sub_type.as_str()) {
            ("multipart", "mixed" | "signed") => MediaKind::Multipart(Container::Mixed),
            ("multipart", "alternative") => MediaKind::Multipart(Container::Alternative),
            ("multipart", "related") => MediaKind::Multipart(Container::Related),
            ("text", "plain") => MediaKind::PlainText,
            ("text", "html") => MediaKind::HtmlText,
            _ => MediaKind::Other,
        }
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the media type or any parameter is malformed.
    pub fn parse(s: &str) -> Result<Self> {
        let (media, parameters) = parse_media_value(s)?;
        let (main_type, sub_type) = media
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("missing subtype in {s:?}")))?;

        Ok(Self {
            main_type: main_type.to_string(),
            sub_type: sub_type.to_string(),
            parameters,
        })
    }

    /// Parses an optional header value, defaulting to `text/plain`.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value is malformed.
    pub fn parse_or_default(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::text_plain()),
            Some(value) => Self::parse(value),
        }
    }
}

/// Parsed `Content-Disposition` header (RFC 2183).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// Disposition type, lowercased (e.g., "attachment", "inline").
    pub kind: String,
    /// Parameters (e.g., filename).
    pub parameters: HashMap<String, String>,
}

impl Disposition {
    /// Parses a content disposition string.
    ///
    /// # Errors
    ///
    /// Returns an error if the disposition type or a parameter is malformed,
    /// e.g. `inline; xxx`.
    pub fn parse(s: &str) -> Result<Self> {
        let (kind, parameters) = parse_media_value(s)?;
        Ok(Self { kind, parameters })
    }

    /// Checks whether the disposition type is `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// Returns the filename parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

/// Parses `token[/token] *(; name=value)` into a lowercased media value and
/// its parameters.
fn parse_media_value(s: &str) -> Result<(String, HashMap<String, String>)> {
    let invalid = |what: &str| Error::InvalidContentType(format!("{what} in {s:?}"));

    let (media, mut rest) = s.split_at(s.find(';').unwrap_or(s.len()));
    let media = media.trim().to_ascii_lowercase();
    if media.is_empty() {
        return Err(invalid("no media type"));
    }
    let well_formed = match media.split_once('/') {
        Some((main, sub)) => is_token(main) && is_token(sub),
        None => is_token(&media),
    };
    if !well_formed {
        return Err(invalid("malformed media type"));
    }

    let mut raw = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        rest = rest
            .strip_prefix(';')
            .ok_or_else(|| invalid("expected ';'"))?
            .trim_start();
        if rest.is_empty() {
            // Trailing semicolon.
            break;
        }

        let name_len = rest.find(|c: char| !is_token_char(c)).unwrap_or(rest.len());
        if name_len == 0 {
            return Err(invalid("invalid media parameter"));
        }
        let name = rest[..name_len].to_ascii_lowercase();
        rest = rest[name_len..]
            .trim_start()
            .strip_prefix('=')
            .ok_or_else(|| invalid("invalid media parameter"))?
            .trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let (value, after) =
                take_quoted(quoted).ok_or_else(|| invalid("unterminated quoted string"))?;
            rest = after;
            value
        } else {
            let len = rest
                .find(|c: char| c.is_whitespace() || c == ';' || c == '"')
                .unwrap_or(rest.len());
            if len == 0 {
                return Err(invalid("empty parameter value"));
            }
            let value = rest[..len].to_string();
            rest = &rest[len..];
            value
        };

        if raw.iter().any(|(existing, _)| *existing == name) {
            return Err(invalid("duplicate parameter name"));
        }
        raw.push((name, value));
    }

    Ok((media, assemble_parameters(raw)))
}

/// Reads a quoted string body (after the opening quote), returning the
/// unescaped value and the input after the closing quote.
fn take_quoted(s: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, &s[i + 1..])),
            '\\' => value.push(chars.next()?.1),
            c => value.push(c),
        }
    }
    None
}

struct Section {
    index: u32,
    extended: bool,
    value: String,
}

/// Applies RFC 2231: `name*` values are charset-decoded and `name*N` sections
/// are joined in order. Extended forms take precedence over plain ones.
fn assemble_parameters(raw: Vec<(String, String)>) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    let mut sections: HashMap<String, Vec<Section>> = HashMap::new();
    let mut extended = Vec::new();

    for (name, value) in raw {
        match name.split_once('*') {
            None => {
                parameters.insert(name, value);
            }
            Some((base, "")) => extended.push((base.to_string(), value)),
            Some((base, section)) => {
                let (number, is_extended) = section
                    .strip_suffix('*')
                    .map_or((section, false), |number| (number, true));
                if let Ok(index) = number.parse() {
                    sections.entry(base.to_string()).or_default().push(Section {
                        index,
                        extended: is_extended,
                        value,
                    });
                }
            }
        }
    }

    for (base, mut parts) in sections {
        parts.sort_by_key(|part| part.index);
        if let Some(value) = join_sections(&parts) {
            parameters.insert(base, value);
        }
    }

    for (base, value) in extended {
        if let Some(value) = decode_extended(&value) {
            parameters.insert(base, value);
        }
    }

    parameters
}

fn join_sections(parts: &[Section]) -> Option<String> {
    if parts.first().map(|part| part.index) != Some(0) {
        return None;
    }

    let mut label = None;
    let mut bytes = Vec::new();

    for (expected, part) in (0..).zip(parts) {
        if part.index != expected {
            break;
        }
        if part.extended {
            let mut encoded = part.value.as_str();
            if expected == 0 {
                let mut pieces = encoded.splitn(3, '\'');
                let (charset, _language, data) = (pieces.next()?, pieces.next()?, pieces.next()?);
                label = Some(charset.to_string());
                encoded = data;
            }
            bytes.extend(percent_decode(encoded)?);
        } else {
            bytes.extend_from_slice(part.value.as_bytes());
        }
    }

    match label.as_deref() {
        Some(label) if !label.is_empty() => decode_labelled(label, &bytes),
        _ => String::from_utf8(bytes).ok(),
    }
}

fn decode_extended(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let (charset, _language, data) = (pieces.next()?, pieces.next()?, pieces.next()?);
    let bytes = percent_decode(data)?;
    if charset.is_empty() {
        return String::from_utf8(bytes).ok();
    }
    decode_labelled(charset, &bytes)
}

fn percent_decode(s: &str) -> Option<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    Some(decoded)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.kind(), MediaKind::PlainText);
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert_eq!(ct.main_type, "multipart");
        assert_eq!(ct.sub_type, "mixed");
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
        assert_eq!(ct.kind(), MediaKind::Multipart(Container::Mixed));
    }

    #[test]
    fn test_content_type_parse_case_and_spacing() {
        let ct = ContentType::parse("Multipart/Alternative ;\tBoundary = \"a;b\" ;").unwrap();
        assert_eq!(ct.essence(), "multipart/alternative");
        assert_eq!(ct.boundary(), Some("a;b"));
    }

    #[test]
    fn test_content_type_unquoted_value_with_equals() {
        let ct = ContentType::parse("multipart/related; boundary=----=_NextPart_000").unwrap();
        assert_eq!(ct.boundary(), Some("----=_NextPart_000"));
    }

    #[test]
    fn test_content_type_kinds() {
        let kind = |s: &str| ContentType::parse(s).unwrap().kind();
        assert_eq!(kind("multipart/signed; boundary=x"), MediaKind::Multipart(Container::Mixed));
        assert_eq!(kind("multipart/related; boundary=x"), MediaKind::Multipart(Container::Related));
        assert_eq!(kind("TEXT/HTML"), MediaKind::HtmlText);
        assert_eq!(kind("image/png"), MediaKind::Other);
        assert_eq!(kind("multipart/report; boundary=x"), MediaKind::Other);
    }

    #[test]
    fn test_content_type_rejects_malformed() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("text/").is_err());
        assert!(ContentType::parse("text/plain; charset").is_err());
        assert!(ContentType::parse("text/plain; charset=\"utf-8").is_err());
        assert!(ContentType::parse("text/plain; a=1; a=2").is_err());
    }

    #[test]
    fn test_content_type_default() {
        let ct = ContentType::parse_or_default(None).unwrap();
        assert_eq!(ct.essence(), "text/plain");
        let ct = ContentType::parse_or_default(Some("  ")).unwrap();
        assert_eq!(ct.kind(), MediaKind::PlainText);
        assert!(ContentType::parse_or_default(Some("bogus")).is_err());
    }

    #[test]
    fn test_rfc2231_extended() {
        let d = Disposition::parse("attachment; filename*=utf-8''na%C3%AFve%20file.txt").unwrap();
        assert_eq!(d.filename(), Some("naïve file.txt"));
    }

    #[test]
    fn test_rfc2231_continuations() {
        let d = Disposition::parse(
            "attachment; filename*0*=iso-8859-1'en'caf%E9; filename*1=\"_menu\"; filename*2=.pdf",
        )
        .unwrap();
        assert_eq!(d.filename(), Some("café_menu.pdf"));
    }

    #[test]
    fn test_rfc2231_overrides_plain() {
        let d = Disposition::parse("attachment; filename=plain.txt; filename*=utf-8''fancy.txt")
            .unwrap();
        assert_eq!(d.filename(), Some("fancy.txt"));
    }

    #[test]
    fn test_disposition_parse() {
        let d = Disposition::parse("Attachment;\r\n    filename=test.txt").unwrap();
        assert!(d.is_attachment());
        assert_eq!(d.filename(), Some("test.txt"));

        let d = Disposition::parse("inline").unwrap();
        assert_eq!(d.kind, "inline");
        assert!(!d.is_attachment());
        assert_eq!(d.filename(), None);
    }

    #[test]
    fn test_disposition_missing_separator() {
        assert!(Disposition::parse("inline; xxx").is_err());
    }

    #[test]
    fn test_container_display() {
        assert_eq!(Container::Mixed.to_string(), "multipart/mixed");
        assert_eq!(Container::Alternative.to_string(), "multipart/alternative");
        assert_eq!(Container::Related.to_string(), "multipart/related");
    }
}
