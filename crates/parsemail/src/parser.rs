//! Top-level message parsing.

use crate::config::Config;
use crate::content_type::MediaKind;
use crate::data::Data;
use crate::email::Email;
use crate::error::{Error, Result};
use crate::fields::HeaderFields;
use crate::message::Part;
use crate::walker::{self, Bodies, Walker};
use bytes::Bytes;
use std::io::Read;

/// Email parser.
///
/// # Example
///
/// ```
/// use parsemail::{Config, Parser};
///
/// let parser = Parser::new(Config::builder().max_depth(8).build());
/// let email = parser
///     .parse_bytes(&b"Subject: Hi\r\n\r\nHello!\r\n"[..])
///     .unwrap();
/// assert_eq!(email.subject, "Hi");
/// assert_eq!(email.text_body, "Hello!");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser {
    config: Config,
}

impl Parser {
    /// Creates a parser with the given configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns the parser configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Reads a whole message from `reader` and parses it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the message cannot be parsed.
    pub fn parse<R: Read>(&self, mut reader: R) -> Result<Email> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        self.parse_bytes(raw)
    }

    /// Parses a message held in memory.
    ///
    /// Header field errors are reported only when the body parsed cleanly.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be parsed.
    pub fn parse_bytes(&self, raw: impl Into<Bytes>) -> Result<Email> {
        let message = Part::parse(raw.into())?;
        let fields = HeaderFields::resolve(&message.headers);
        let headers = if self.config.decode_headers {
            message.headers.decoded()
        } else {
            message.headers.clone()
        };
        let declared_type = message.header("content-type").to_string();

        let (bodies, content) = self.parse_body(message)?;

        let mut email = Email::with_fields(headers, fields?);
        email.content_type = declared_type;
        email.content = content;
        email.text_body = bodies.text;
        email.html_body = bodies.html;
        email.attachments = bodies.attachments;
        email.embedded_files = bodies.embedded_files;

        tracing::debug!(
            attachments = email.attachments.len(),
            embedded_files = email.embedded_files.len(),
            "parsed message"
        );
        Ok(email)
    }

    fn parse_body(&self, message: Part) -> Result<(Bodies, Option<Data>)> {
        let content_type = message.content_type()?;
        let mut bodies = Bodies::default();

        match content_type.kind() {
            MediaKind::Multipart(container) => {
                let boundary = content_type
                    .boundary()
                    .ok_or(Error::MissingBoundary(container))?;
                bodies = Walker::new(self.config.max_depth).walk(
                    message.body,
                    boundary,
                    container,
                    1,
                )?;
            }
            MediaKind::PlainText => {
                bodies.text = walker::decode_text_leaf(&message, &content_type)?;
            }
            MediaKind::HtmlText => {
                bodies.html = walker::decode_text_leaf(&message, &content_type)?;
            }
            MediaKind::Other => {
                tracing::debug!(content_type = %content_type.essence(), "opaque message body");
                let encoding = message.transfer_encoding()?;
                return Ok((bodies, Some(Data::encoded(message.body, encoding))));
            }
        }

        Ok((bodies, None))
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
    fn test_parse_plain_text() {
        let raw = "From: Alice <alice@example.com>\r\n\
Subject: =?utf-8?q?Gr=C3=BC=C3=9Fe?=\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hallo\r\n";
        let email = Parser::default().parse_bytes(raw).unwrap();
        assert_eq!(email.subject, "Grüße");
        assert_eq!(email.from[0].address, "alice@example.com");
        assert_eq!(email.content_type, "text/plain; charset=utf-8");
        assert_eq!(email.text_body, "Hallo");
        assert!(email.html_body.is_empty());
        assert!(email.content.is_none());
    }

    #[test]
    fn test_missing_content_type_is_text() {
        let email = Parser::default().parse_bytes("Subject: x\n\nbody\n").unwrap();
        assert_eq!(email.content_type, "");
        assert_eq!(email.text_body, "body");
    }

    #[test]
    fn test_html_body() {
        let raw = "Content-Type: text/html\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
PHA+aGk8L3A+\r\n";
        let email = Parser::default().parse_bytes(raw).unwrap();
        assert_eq!(email.html_body, "<p>hi</p>");
        assert!(email.text_body.is_empty());
    }

    #[test]
    fn test_opaque_content() {
        let raw = "Content-Type: application/pdf\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0=\r\n";
        let email = Parser::default().parse_bytes(raw).unwrap();
        let content = email.content.unwrap();
        assert_eq!(content.into_vec().unwrap(), b"%PDF-");
    }

    #[test]
    fn test_decoded_headers_copy() {
        let raw = "X-Custom: =?utf-8?b?w6k=?=\r\n\r\nbody";
        let email = Parser::default().parse_bytes(raw).unwrap();
        assert_eq!(email.headers.get("x-custom"), Some("é"));

        let parser = Parser::new(Config::builder().decode_headers(false).build());
        let email = parser.parse_bytes(raw).unwrap();
        assert_eq!(email.headers.get("x-custom"), Some("=?utf-8?b?w6k=?="));
    }

    #[test]
    fn test_body_error_wins_over_header_error() {
        let raw = "Date: not a date\r\n\
Content-Type: text/plain\r\n\
Content-Transfer-Encoding: x-unknown\r\n\
\r\n\
body";
        let err = Parser::default().parse_bytes(raw).unwrap_err();
        assert!(matches!(err, Error::UnknownEncoding(_)));

        let raw = "Date: not a date\r\n\r\nbody";
        let err = Parser::default().parse_bytes(raw).unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)));
    }

    #[test]
    fn test_parse_reader() {
        let raw: &[u8] = b"Subject: from reader\r\n\r\ntext";
        let email = Parser::default().parse(raw).unwrap();
        assert_eq!(email.subject, "from reader");
        assert_eq!(email.text_body, "text");
    }

    #[test]
    fn test_missing_top_level_boundary() {
        let raw = "Content-Type: multipart/mixed\r\n\r\nbody";
        let err = Parser::default().parse_bytes(raw).unwrap_err();
        assert_eq!(err.to_string(), "Missing boundary in multipart/mixed container");
    }
}
