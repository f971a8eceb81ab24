//! Content-Transfer-Encoding decoding.
//!
//! Supports Base64, Quoted-Printable and the identity encodings.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit, also assumed when the header is absent or empty.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses transfer encoding from a `Content-Transfer-Encoding` value.
    ///
    /// # Errors
    ///
    /// Returns an error naming the encoding if it is not understood.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "8bit" => Ok(Self::EightBit),
            "7bit" => Ok(Self::SevenBit),
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            other => Err(Error::UnknownEncoding(other.to_string())),
        }
    }

    /// Checks whether decoding leaves the bytes unchanged.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit)
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Decodes a body according to its transfer encoding.
///
/// # Errors
///
/// Returns an error if the body is not valid for the encoding.
pub fn decode(raw: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::SevenBit | TransferEncoding::EightBit => Ok(raw.to_vec()),
        TransferEncoding::Base64 => decode_base64(raw),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(raw),
    }
}

/// Decodes Base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid padded Base64.
pub fn decode_base64(raw: &[u8]) -> Result<Vec<u8>> {
    // Remove whitespace for lenient parsing
    let cleaned: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045), honouring soft line breaks.
///
/// Each hard line break keeps its original terminator (`\n` or `\r\n`) and
/// trailing whitespace before it is dropped.
///
/// # Errors
///
/// Returns an error if the input cannot be decoded.
pub fn decode_quoted_printable(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    for line in raw.split_inclusive(|&b| b == b'\n') {
        let ending: &[u8] = if line.ends_with(b"\r\n") {
            b"\r\n"
        } else if line.ends_with(b"\n") {
            b"\n"
        } else {
            b""
        };
        let content = line.trim_ascii_end();
        if let Some(soft) = content.strip_suffix(b"=") {
            out.extend_from_slice(&decode_qp_line(soft)?);
        } else {
            out.extend_from_slice(&decode_qp_line(content)?);
            out.extend_from_slice(ending);
        }
    }
    Ok(out)
}

// Whitespace ahead of a soft break is content and survives.
fn decode_qp_line(line: &[u8]) -> Result<Vec<u8>> {
    let body = line.trim_ascii_end();
    let mut decoded = quoted_printable::decode(body, quoted_printable::ParseMode::Robust)?;
    decoded.extend_from_slice(&line[body.len()..]);
    Ok(decoded)
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
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit").unwrap(), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("").unwrap(), TransferEncoding::EightBit);
        assert_eq!(TransferEncoding::parse(" BASE64 ").unwrap(), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable").unwrap(),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_transfer_encoding_unknown() {
        let err = TransferEncoding::parse("x-uuencode").unwrap_err();
        assert_eq!(err.to_string(), "unknown encoding: x-uuencode");
        assert!(TransferEncoding::parse("binary").is_err());
    }

    #[test]
    fn test_identity() {
        assert!(TransferEncoding::SevenBit.is_identity());
        assert!(!TransferEncoding::Base64.is_identity());
        assert_eq!(decode(b"\xffraw", TransferEncoding::EightBit).unwrap(), b"\xffraw");
    }

    #[test]
    fn test_base64_decode() {
        let decoded = decode(b"SGVsbG8s\r\nIFdvcmxkIQ==\r\n", TransferEncoding::Base64).unwrap();
        assert_eq!(decoded, b"Hello, World!");
        assert!(decode(b"", TransferEncoding::Base64).unwrap().is_empty());
    }

    #[test]
    fn test_base64_invalid() {
        assert!(decode_base64(b"not*base64").is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable(b"H=C3=A9llo").unwrap();
        assert_eq!(decoded, "Héllo".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let decoded = decode_quoted_printable(b"Hello=\r\nWorld").unwrap();
        assert_eq!(decoded, b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_soft_line_break_lf() {
        let decoded = decode_quoted_printable(b"Hel=\nlo=20\nthere=").unwrap();
        assert_eq!(decoded, b"Hello \nthere");
    }

    #[test]
    fn test_quoted_printable_keeps_line_endings() {
        assert_eq!(decode_quoted_printable(b"one\ntwo\n").unwrap(), b"one\ntwo\n");
        assert_eq!(
            decode_quoted_printable(b"one\r\ntwo\r\n").unwrap(),
            b"one\r\ntwo\r\n"
        );
        assert_eq!(
            decode_quoted_printable(b"a=3Db\r\nc\nd").unwrap(),
            b"a=b\r\nc\nd"
        );
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        let decoded = decode_quoted_printable(b"one  \t\ntwo =\r\nthree").unwrap();
        assert_eq!(decoded, b"one\ntwo three");
    }

    #[test]
    fn test_transfer_encoding_display() {
        assert_eq!(TransferEncoding::QuotedPrintable.to_string(), "quoted-printable");
        assert_eq!(TransferEncoding::EightBit.to_string(), "8bit");
    }
}
