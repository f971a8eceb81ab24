//! MIME parts and the message envelope.

use crate::content_type::{ContentType, Disposition};
use crate::encoding::TransferEncoding;
use crate::error::Result;
use crate::header::Headers;
use bytes::Bytes;

/// MIME message part: headers plus the raw body that follows them.
///
/// The top-level message is a part too. Body bytes share the buffer the
/// message was read into.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (raw, still transfer-encoded).
    pub body: Bytes,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Bytes) -> Self {
        Self { headers, body }
    }

    /// Splits a raw message into its header block and body.
    ///
    /// # Errors
    ///
    /// Returns an error if the header block is malformed.
    pub fn parse(raw: Bytes) -> Result<Self> {
        let (headers, offset) = Headers::parse(&raw)?;
        Ok(Self::new(headers, raw.slice(offset..)))
    }

    /// Gets the first value of a header, or `""` when absent.
    #[must_use]
    pub fn header(&self, name: &str) -> &str {
        self.headers.get(name).unwrap_or_default()
    }

    /// Gets the content type, `text/plain` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        ContentType::parse_or_default(self.headers.get("content-type"))
    }

    /// Gets the declared media type as written, without parameters.
    ///
    /// Unlike [`Part::content_type`] this keeps the sender's spelling and is
    /// `""` when the header is absent.
    #[must_use]
    pub fn media_type(&self) -> &str {
        let value = self.header("content-type");
        value.split_once(';').map_or(value, |(media, _)| media).trim()
    }

    /// Gets the transfer encoding, `8bit` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding is not understood.
    pub fn transfer_encoding(&self) -> Result<TransferEncoding> {
        TransferEncoding::parse(self.header("content-transfer-encoding"))
    }

    /// Gets the content disposition, if present and well formed.
    #[must_use]
    pub fn disposition(&self) -> Option<Disposition> {
        let value = self.headers.get("content-disposition")?;
        match Disposition::parse(value) {
            Ok(disposition) => Some(disposition),
            Err(err) => {
                tracing::debug!(%err, "ignoring malformed Content-Disposition");
                None
            }
        }
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
    fn test_part_parse() {
        let raw = Bytes::from_static(
            b"From: sender@example.com\r\nSubject: Test\r\n\r\nHello, World!",
        );
        let part = Part::parse(raw).unwrap();

        assert_eq!(part.header("from"), "sender@example.com");
        assert_eq!(part.header("subject"), "Test");
        assert_eq!(part.header("x-missing"), "");
        assert_eq!(&part.body[..], b"Hello, World!");
    }

    #[test]
    fn test_part_defaults() {
        let part = Part::new(Headers::new(), Bytes::new());
        assert_eq!(part.content_type().unwrap().essence(), "text/plain");
        assert_eq!(part.transfer_encoding().unwrap(), TransferEncoding::EightBit);
        assert!(part.disposition().is_none());
    }

    #[test]
    fn test_part_content_type() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "multipart/mixed; boundary=abc123");
        headers.add("Content-Transfer-Encoding", "base64");
        let part = Part::new(headers, Bytes::new());

        let ct = part.content_type().unwrap();
        assert_eq!(ct.boundary(), Some("abc123"));
        assert_eq!(part.transfer_encoding().unwrap(), TransferEncoding::Base64);
    }

    #[test]
    fn test_part_media_type_keeps_spelling() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "Image/PNG; name=logo.png");
        let part = Part::new(headers, Bytes::new());
        assert_eq!(part.media_type(), "Image/PNG");
        assert_eq!(part.content_type().unwrap().essence(), "image/png");

        let part = Part::new(Headers::new(), Bytes::new());
        assert_eq!(part.media_type(), "");
    }

    #[test]
    fn test_part_malformed_disposition() {
        let mut headers = Headers::new();
        headers.add("Content-Disposition", "inline; xxx");
        let part = Part::new(headers, Bytes::new());
        assert!(part.disposition().is_none());
    }
}
