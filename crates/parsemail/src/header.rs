//! MIME header handling.

use crate::error::{Error, Result};
use crate::rfc2047::decode_sentence;
use charset::decode_latin1;
use std::borrow::Cow;
use std::fmt;

/// Ordered, case-insensitive header multimap.
///
/// Keys keep the order and spelling of their first occurrence. Repeated
/// headers keep every value in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.values(name)
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values(name).is_some()
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs, grouped by name in
    /// order of first occurrence.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Returns a copy with every value run through the encoded-word decoder.
    #[must_use]
    pub fn decoded(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(name, values)| {
                let values = values.iter().map(|v| decode_sentence(v)).collect();
                (name.clone(), values)
            })
            .collect();
        Self { entries }
    }

    fn values(&self, name: &str) -> Option<&Vec<String>> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values)
    }

    /// Parses a header block from raw bytes.
    ///
    /// Continuation lines (starting with space or tab) are unfolded into the
    /// previous value with a single space. Parsing stops after the first empty
    /// line; the returned offset points at the first byte after it, or at the
    /// end of the input when there is no empty line.
    ///
    /// # Errors
    ///
    /// Returns an error if a line is neither a continuation nor `name: value`.
    pub fn parse(raw: &[u8]) -> Result<(Self, usize)> {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;
        let mut pos = 0;

        while pos < raw.len() {
            let (line, next) = match memchr::memchr(b'\n', &raw[pos..]) {
                Some(i) => (&raw[pos..pos + i], pos + i + 1),
                None => (&raw[pos..], raw.len()),
            };
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            pos = next;

            if line.is_empty() {
                break;
            }

            let text = line_text(line);
            if text.starts_with(' ') || text.starts_with('\t') {
                let (_, value) = current.as_mut().ok_or_else(|| {
                    Error::InvalidHeader(format!("continuation without header: {}", text.trim()))
                })?;
                let piece = text.trim();
                if !piece.is_empty() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(piece);
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            let (name, value) = text
                .split_once(':')
                .ok_or_else(|| Error::InvalidHeader(text.to_string()))?;
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(Error::InvalidHeader(text.to_string()));
            }
            current = Some((name.to_string(), value.trim().to_string()));
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        Ok((headers, pos))
    }
}

/// Header bytes are UTF-8 when valid, Latin-1 otherwise.
fn line_text(line: &[u8]) -> Cow<'_, str> {
    std::str::from_utf8(line).map_or_else(|_| decode_latin1(line), Cow::Borrowed)
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
        assert!(headers.contains("CONTENT-TYPE"));
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_keep_duplicates_in_order() {
        let mut headers = Headers::new();
        headers.add("Received", "first");
        headers.add("Subject", "Hi");
        headers.add("received", "second");

        assert_eq!(headers.get_all("Received"), vec!["first", "second"]);
        assert_eq!(headers.len(), 2);

        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Received", "Received", "Subject"]);
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "body"
        );

        let (headers, offset) = Headers::parse(text.as_bytes()).unwrap();
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(&text.as_bytes()[offset..], b"body");
    }

    #[test]
    fn test_headers_parse_lf_and_tabs() {
        let text = "Received: from a\n\tby b\nX-Empty:\n\nrest";
        let (headers, offset) = Headers::parse(text.as_bytes()).unwrap();
        assert_eq!(headers.get("Received"), Some("from a by b"));
        assert_eq!(headers.get("X-Empty"), Some(""));
        assert_eq!(&text[offset..], "rest");
    }

    #[test]
    fn test_headers_parse_without_body() {
        let text = "Subject: only headers";
        let (headers, offset) = Headers::parse(text.as_bytes()).unwrap();
        assert_eq!(headers.get("Subject"), Some("only headers"));
        assert_eq!(offset, text.len());
    }

    #[test]
    fn test_headers_parse_latin1() {
        let raw = b"Subject: caf\xe9\r\n\r\n";
        let (headers, _) = Headers::parse(raw).unwrap();
        assert_eq!(headers.get("Subject"), Some("café"));
    }

    #[test]
    fn test_headers_parse_rejects_garbage() {
        assert!(Headers::parse(b"not a header\r\n\r\n").is_err());
        assert!(Headers::parse(b" leading continuation\r\n\r\n").is_err());
    }

    #[test]
    fn test_headers_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?SMOpbGxv?=");
        headers.add("X-Plain", "plain value");

        let decoded = headers.decoded();
        assert_eq!(decoded.get("subject"), Some("Héllo"));
        assert_eq!(decoded.get("x-plain"), Some("plain value"));
        assert_eq!(headers.get("subject"), Some("=?utf-8?B?SMOpbGxv?="));
    }

    #[test]
    fn test_headers_display() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");

        let s = headers.to_string();
        assert_eq!(s, "From: sender@example.com\nTo: recipient@example.com\n");
    }
}
