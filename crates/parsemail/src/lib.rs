//! # parsemail
//!
//! Decomposes RFC 5322 email messages into structured parts.
//!
//! ## Features
//!
//! - **Header fields**: decoded subject, address lists, dates and message ids
//! - **Encoded words**: RFC 2047 decoding with placeholders for unsupported
//!   charsets and encodings
//! - **Multipart**: mixed, alternative, related and signed containers
//! - **Attachments**: filenames (RFC 2231), content types and lazily decoded data
//! - **Charsets**: body transcoding to UTF-8
//!
//! ## Quick Start
//!
//! ```
//! use std::io::Read;
//!
//! let raw = "From: Alice <alice@example.com>\r\n\
//!            To: bob@example.com\r\n\
//!            Subject: =?utf-8?q?Caf=C3=A9?=\r\n\
//!            Content-Type: multipart/mixed; boundary=sep\r\n\
//!            \r\n\
//!            --sep\r\n\
//!            Content-Type: text/plain\r\n\
//!            \r\n\
//!            See attached.\r\n\
//!            --sep\r\n\
//!            Content-Type: text/csv\r\n\
//!            Content-Disposition: attachment; filename=data.csv\r\n\
//!            \r\n\
//!            a,b\r\n\
//!            --sep--\r\n";
//!
//! let email = parsemail::parse_bytes(raw)?;
//! assert_eq!(email.subject, "Café");
//! assert_eq!(email.from[0].name, "Alice");
//! assert_eq!(email.text_body, "See attached.");
//!
//! let mut attachment = email.attachments.into_iter().next().unwrap();
//! assert_eq!(attachment.filename, "data.csv");
//! let mut csv = String::new();
//! attachment.data.read_to_string(&mut csv)?;
//! assert_eq!(csv, "a,b");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Configuration
//!
//! ```
//! use parsemail::{Config, Parser};
//!
//! let config = Config::builder().max_depth(4).decode_headers(false).build();
//! let email = Parser::new(config).parse(&b"Subject: hi\r\n\r\nbody"[..])?;
//! assert_eq!(email.text_body, "body");
//! # Ok::<(), parsemail::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod data;
mod email;
mod error;
mod header;
mod message;
mod multipart;
mod parser;
mod walker;

pub mod address;
pub mod classify;
pub mod content_type;
pub mod encoding;
pub mod fields;
pub mod rfc2047;
pub mod transcode;

pub use address::Address;
pub use config::{Config, ConfigBuilder, DEFAULT_MAX_DEPTH};
pub use content_type::{Container, ContentType, Disposition, MediaKind};
pub use data::Data;
pub use email::{Attachment, Email, EmbeddedFile};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use fields::HeaderFields;
pub use header::Headers;
pub use message::Part;
pub use multipart::MultipartReader;
pub use parser::Parser;

/// Parses a message from a reader with the default configuration.
///
/// # Errors
///
/// Returns an error if reading fails or the message cannot be parsed.
pub fn parse<R: std::io::Read>(reader: R) -> Result<Email> {
    Parser::default().parse(reader)
}

/// Parses an in-memory message with the default configuration.
///
/// # Errors
///
/// Returns an error if the message cannot be parsed.
pub fn parse_bytes(raw: impl Into<bytes::Bytes>) -> Result<Email> {
    Parser::default().parse_bytes(raw)
}
