//! Multipart body tokenizer (RFC 2046 section 5.1).
//!
//! Splits a multipart body into its parts. The preamble before the first
//! delimiter and the epilogue after the close delimiter are discarded. The
//! line break in front of a delimiter belongs to the delimiter, not the part.

use crate::error::{Error, Result};
use crate::message::Part;
use bytes::Bytes;
use memchr::memmem;

/// Iterates over the parts of a multipart body.
#[derive(Debug)]
pub struct MultipartReader {
    body: Bytes,
    delimiter: Vec<u8>,
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Opening delimiter not located yet.
    Start,
    /// Next part begins at this offset.
    Part(usize),
    /// Close delimiter consumed.
    Done,
}

/// A delimiter line found in the body.
#[derive(Debug, Clone, Copy)]
struct Delimiter {
    /// Offset where the delimiter starts, after the preceding line break.
    start: usize,
    /// Offset just past the delimiter line.
    next: usize,
    /// Whether this is the close delimiter (`--boundary--`).
    close: bool,
}

impl MultipartReader {
    /// Creates a reader over `body` split on `boundary`.
    #[must_use]
    pub fn new(body: Bytes, boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            body,
            delimiter,
            state: State::Start,
        }
    }

    /// Returns the next part, or `None` after the close delimiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the body has no opening delimiter, ends before the
    /// close delimiter, or holds a part with malformed headers.
    pub fn next_part(&mut self) -> Result<Option<Part>> {
        let from = match self.state {
            State::Done => return Ok(None),
            State::Start => {
                let first = self.find_delimiter(0).ok_or_else(|| {
                    Error::InvalidMultipart("no opening boundary delimiter".to_string())
                })?;
                if first.close {
                    self.state = State::Done;
                    return Ok(None);
                }
                first.next
            }
            State::Part(from) => from,
        };

        let Some(delimiter) = self.find_delimiter(from) else {
            self.state = State::Done;
            return Err(Error::InvalidMultipart(
                "unexpected end of multipart body".to_string(),
            ));
        };

        let end = self.content_end(from, delimiter.start);
        let part = Part::parse(self.body.slice(from..end))?;
        self.state = if delimiter.close {
            State::Done
        } else {
            State::Part(delimiter.next)
        };
        tracing::trace!(
            headers = part.headers.len(),
            body_len = part.body.len(),
            "read multipart part"
        );
        Ok(Some(part))
    }

    /// Collects all remaining parts.
    ///
    /// # Errors
    ///
    /// Returns the first error [`Self::next_part`] reports.
    pub fn collect_parts(mut self) -> Result<Vec<Part>> {
        let mut parts = Vec::new();
        while let Some(part) = self.next_part()? {
            parts.push(part);
        }
        Ok(parts)
    }

    /// Finds the first delimiter line at or after `from`.
    fn find_delimiter(&self, from: usize) -> Option<Delimiter> {
        let finder = memmem::Finder::new(&self.delimiter);
        let mut search = from;

        while search <= self.body.len() {
            let start = search + finder.find(&self.body[search..])?;
            search = start + 1;

            let at_line_start = start == from || self.body[start - 1] == b'\n';
            if !at_line_start {
                continue;
            }
            if let Some((next, close)) = self.delimiter_tail(start + self.delimiter.len()) {
                return Some(Delimiter { start, next, close });
            }
        }
        None
    }

    /// Checks what follows `--boundary`: an optional `--`, optional
    /// whitespace, then a line break or the end of the body.
    fn delimiter_tail(&self, mut pos: usize) -> Option<(usize, bool)> {
        let body = &self.body[..];
        let close = body[pos..].starts_with(b"--");
        if close {
            pos += 2;
        }
        while pos < body.len() && matches!(body[pos], b' ' | b'\t') {
            pos += 1;
        }
        let rest = &body[pos..];
        if rest.is_empty() {
            Some((pos, close))
        } else if rest.starts_with(b"\r\n") {
            Some((pos + 2, close))
        } else if rest.starts_with(b"\n") {
            Some((pos + 1, close))
        } else {
            None
        }
    }

    /// End of a part's content: drops the line break owned by the delimiter.
    fn content_end(&self, from: usize, delimiter_start: usize) -> usize {
        if delimiter_start == from {
            return from;
        }
        let content = &self.body[from..delimiter_start];
        if content.ends_with(b"\r\n") {
            delimiter_start - 2
        } else {
            delimiter_start - 1
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

    fn parts(body: &'static [u8], boundary: &str) -> Result<Vec<Part>> {
        MultipartReader::new(Bytes::from_static(body), boundary).collect_parts()
    }

    #[test]
    fn test_two_parts() {
        let body = b"preamble\r\n\
--abc\r\n\
Content-Type: text/plain\r\n\
\r\n\
first\r\n\
--abc\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>second</p>\r\n\
--abc--\r\n\
epilogue";
        let parts = parts(body, "abc").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].header("content-type"), "text/plain");
        assert_eq!(&parts[0].body[..], b"first");
        assert_eq!(parts[1].header("content-type"), "text/html");
        assert_eq!(&parts[1].body[..], b"<p>second</p>");
    }

    #[test]
    fn test_bare_newlines() {
        let body = b"--b\nX-A: 1\n\nbody\n\n--b--\n";
        let parts = parts(body, "b").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].header("x-a"), "1");
        assert_eq!(&parts[0].body[..], b"body\n");
    }

    #[test]
    fn test_part_without_headers() {
        let parts = parts(b"--b\r\n\r\nno headers\r\n--b--", "b").unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].headers.is_empty());
        assert_eq!(&parts[0].body[..], b"no headers");
    }

    #[test]
    fn test_boundary_prefix_inside_content() {
        let body = b"--b\r\n\r\nline --b inside\r\n--bx not a delimiter\r\n--b  \r\n\r\nnext\r\n--b--";
        let parts = parts(body, "b").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            &parts[0].body[..],
            b"line --b inside\r\n--bx not a delimiter"
        );
        assert_eq!(&parts[1].body[..], b"next");
    }

    #[test]
    fn test_no_opening_delimiter() {
        let err = parts(b"just text", "b").unwrap_err();
        assert!(matches!(err, Error::InvalidMultipart(_)));
    }

    #[test]
    fn test_missing_close_delimiter() {
        let mut reader = MultipartReader::new(Bytes::from_static(b"--b\r\n\r\nunterminated"), "b");
        assert!(reader.next_part().is_err());
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_close_only() {
        assert!(parts(b"--b--\r\n", "b").unwrap().is_empty());
    }

    #[test]
    fn test_done_is_sticky() {
        let mut reader = MultipartReader::new(Bytes::from_static(b"--b\r\n\r\nx\r\n--b--"), "b");
        assert!(reader.next_part().unwrap().is_some());
        assert!(reader.next_part().unwrap().is_none());
        assert!(reader.next_part().unwrap().is_none());
    }
}
