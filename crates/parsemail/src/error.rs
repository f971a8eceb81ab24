//! Error types for MIME parsing.

use crate::content_type::Container;

/// Result type alias for MIME parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error while reading the message.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed header line.
    #[error("Invalid header line: {0}")]
    InvalidHeader(String),

    /// Unparsable media type or media parameter.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Transfer encoding name that is not understood.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Quoted-Printable decode error.
    #[error("Quoted-Printable decode error: {0}")]
    QuotedPrintable(#[from] quoted_printable::QuotedPrintableError),

    /// Missing boundary in multipart message.
    #[error("Missing boundary in {0} container")]
    MissingBoundary(Container),

    /// Invalid multipart structure.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),

    /// A container child whose content type the container cannot handle.
    #[error("Can't process {container} inner mime type: {mime_type}")]
    UnsupportedMimeType {
        /// Container holding the offending part.
        container: Container,
        /// Media type of the offending part.
        mime_type: String,
    },

    /// Multipart nesting deeper than the configured limit.
    #[error("Multipart nesting exceeds maximum depth of {0}")]
    NestingTooDeep(usize),

    /// Malformed address or address list.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Date header matching none of the accepted layouts.
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}
