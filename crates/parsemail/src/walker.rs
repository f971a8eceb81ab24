//! Multipart tree traversal.
//!
//! One recursive walk handles the three container kinds. Leaves are routed by
//! [`MediaKind`]; text leaves are transfer decoded and transcoded, other leaves
//! become attachments or embedded files with lazily decoded data.

use crate::classify;
use crate::content_type::{Container, ContentType, MediaKind};
use crate::data::Data;
use crate::email::{Attachment, EmbeddedFile};
use crate::encoding;
use crate::error::{Error, Result};
use crate::message::Part;
use crate::multipart::MultipartReader;
use crate::rfc2047;
use crate::transcode;
use bytes::Bytes;

/// Everything a container contributes to the email.
#[derive(Debug, Default)]
pub(crate) struct Bodies {
    pub text: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
    pub embedded_files: Vec<EmbeddedFile>,
}

impl Bodies {
    /// Appends a nested container's output.
    fn append(&mut self, nested: Self) {
        self.text.push_str(&nested.text);
        self.html.push_str(&nested.html);
        self.attachments.extend(nested.attachments);
        self.embedded_files.extend(nested.embedded_files);
    }

    /// Adds a text leaf. Inside an alternative container the last
    /// representation wins; elsewhere leaves concatenate.
    fn add_text(field: &mut String, text: &str, container: Container) {
        if container == Container::Alternative {
            field.clear();
        }
        field.push_str(text);
    }
}

/// Depth-bounded multipart walker.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Walker {
    max_depth: usize,
}

impl Walker {
    pub(crate) const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Walks a container body. The outermost container is depth 1.
    pub(crate) fn walk(
        self,
        body: Bytes,
        boundary: &str,
        container: Container,
        depth: usize,
    ) -> Result<Bodies> {
        if depth > self.max_depth {
            return Err(Error::NestingTooDeep(self.max_depth));
        }
        tracing::debug!(%container, depth, boundary, "walking container");

        let mut reader = MultipartReader::new(body, boundary);
        let mut bodies = Bodies::default();

        while let Some(part) = reader.next_part()? {
            let content_type = part.content_type()?;

            if container == Container::Mixed && classify::is_attachment(&part.headers) {
                tracing::trace!(content_type = %content_type.essence(), "attachment");
                bodies.attachments.push(attachment(part, &content_type)?);
                continue;
            }

            match content_type.kind() {
                MediaKind::Multipart(nested) => {
                    let boundary = content_type
                        .boundary()
                        .ok_or(Error::MissingBoundary(nested))?;
                    let nested_bodies = self.walk(part.body, boundary, nested, depth + 1)?;
                    bodies.append(nested_bodies);
                }
                MediaKind::PlainText => {
                    tracing::trace!("text/plain leaf");
                    let text = decode_text_leaf(&part, &content_type)?;
                    Bodies::add_text(&mut bodies.text, &text, container);
                }
                MediaKind::HtmlText => {
                    tracing::trace!("text/html leaf");
                    let html = decode_text_leaf(&part, &content_type)?;
                    Bodies::add_text(&mut bodies.html, &html, container);
                }
                MediaKind::Other if classify::is_embedded_file(&part.headers) => {
                    tracing::trace!(content_type = %content_type.essence(), "embedded file");
                    bodies.embedded_files.push(embedded_file(part)?);
                }
                MediaKind::Other => {
                    return Err(Error::UnsupportedMimeType {
                        container,
                        mime_type: content_type.essence(),
                    });
                }
            }
        }

        Ok(bodies)
    }
}

/// Transfer decodes and transcodes a text part, trimming one trailing line
/// break.
pub(crate) fn decode_text_leaf(part: &Part, content_type: &ContentType) -> Result<String> {
    let decoded = encoding::decode(&part.body, part.transfer_encoding()?)?;
    let mut text = transcode::decode_text(&decoded, content_type);
    if text.ends_with("\r\n") {
        text.truncate(text.len() - 2);
    } else if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn content_id(part: &Part) -> String {
    rfc2047::decode_sentence(part.header("content-id"))
        .trim_matches(['<', '>'])
        .to_string()
}

fn attachment(part: Part, content_type: &ContentType) -> Result<Attachment> {
    let encoding = part.transfer_encoding()?;

    if content_type.is_message_rfc822() {
        let cid = content_id(&part);
        let filename = if cid.is_empty() {
            attachment_filename(&part, content_type)
        } else {
            format!("{cid}.eml")
        };
        return Ok(Attachment {
            filename,
            content_type: part.media_type().to_string(),
            data: Data::raw(part.body),
        });
    }

    Ok(Attachment {
        filename: attachment_filename(&part, content_type),
        content_type: part.media_type().to_string(),
        data: Data::encoded(part.body, encoding),
    })
}

/// Disposition `filename`, else Content-Type `name`, without directory
/// components.
fn attachment_filename(part: &Part, content_type: &ContentType) -> String {
    let disposition = part.disposition();
    let raw = disposition
        .as_ref()
        .and_then(|d| d.filename())
        .or_else(|| content_type.parameter("name"))
        .unwrap_or_default();
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    rfc2047::decode_sentence(base)
}

fn embedded_file(part: Part) -> Result<EmbeddedFile> {
    let encoding = part.transfer_encoding()?;
    let mut cid = content_id(&part);
    if cid.is_empty() {
        cid = part
            .disposition()
            .and_then(|d| d.filename().map(str::to_string))
            .unwrap_or_default();
    }

    Ok(EmbeddedFile {
        cid,
        content_type: part.media_type().to_string(),
        data: Data::encoded(part.body, encoding),
    })
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

    fn walk(body: &'static str, container: Container) -> Result<Bodies> {
        Walker::new(32).walk(Bytes::from_static(body.as_bytes()), "b", container, 1)
    }

    #[test]
    fn test_mixed_text_and_attachment() {
        let body = "--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
hello\r\n\
\r\n\
--b\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"docs/report.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0=\r\n\
--b--\r\n";
        let bodies = walk(body, Container::Mixed).unwrap();
        assert_eq!(bodies.text, "hello");
        assert!(bodies.html.is_empty());
        assert_eq!(bodies.attachments.len(), 1);

        let attachment = bodies.attachments.into_iter().next().unwrap();
        assert_eq!(attachment.filename, "report.pdf");
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.data.into_vec().unwrap(), b"%PDF-");
    }

    #[test]
    fn test_attachment_wins_over_text_type_in_mixed() {
        let body = "--b\r\n\
Content-Type: text/plain; name=notes.txt\r\n\
Content-Disposition: attachment\r\n\
\r\n\
notes\r\n\
--b--\r\n";
        let bodies = walk(body, Container::Mixed).unwrap();
        assert!(bodies.text.is_empty());
        assert_eq!(bodies.attachments[0].filename, "notes.txt");
    }

    #[test]
    fn test_alternative_overwrites_within_container() {
        let body = "--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
first\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
second\r\n\
--b--\r\n";
        let bodies = walk(body, Container::Alternative).unwrap();
        assert_eq!(bodies.text, "second");

        let bodies = walk(body, Container::Related).unwrap();
        assert_eq!(bodies.text, "firstsecond");
    }

    #[test]
    fn test_related_embedded_file() {
        let body = "--b\r\n\
Content-Type: text/html\r\n\
\r\n\
<img src=\"cid:logo\">\r\n\
--b\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
Content-ID: <logo>\r\n\
\r\n\
iVBORw==\r\n\
--b\r\n\
Content-Type: image/gif\r\n\
Content-Disposition: inline; filename=\"spacer.gif\"\r\n\
\r\n\
GIF89a\r\n\
--b--\r\n";
        let bodies = walk(body, Container::Related).unwrap();
        assert_eq!(bodies.html, "<img src=\"cid:logo\">");
        assert_eq!(bodies.embedded_files.len(), 2);
        assert_eq!(bodies.embedded_files[0].cid, "logo");
        assert_eq!(bodies.embedded_files[0].content_type, "image/png");
        assert_eq!(bodies.embedded_files[1].cid, "spacer.gif");
    }

    #[test]
    fn test_attachment_disposition_outside_mixed() {
        let body = "--b\r\n\
Content-Type: application/zip\r\n\
Content-Disposition: attachment; filename=a.zip\r\n\
\r\n\
PK\r\n\
--b--\r\n";
        let err = walk(body, Container::Related).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can't process multipart/related inner mime type: application/zip"
        );
    }

    #[test]
    fn test_unsupported_leaf() {
        let body = "--b\r\nContent-Type: application/octet-stream\r\n\r\nxx\r\n--b--";
        let err = walk(body, Container::Mixed).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedMimeType {
                container: Container::Mixed,
                ..
            }
        ));
    }

    #[test]
    fn test_nested_missing_boundary() {
        let body = "--b\r\nContent-Type: multipart/alternative\r\n\r\nxx\r\n--b--";
        let err = walk(body, Container::Mixed).unwrap_err();
        assert!(matches!(err, Error::MissingBoundary(Container::Alternative)));
    }

    #[test]
    fn test_depth_limit() {
        let body = "--b\r\n\
Content-Type: multipart/mixed; boundary=c\r\n\
\r\n\
--c\r\n\
Content-Type: text/plain\r\n\
\r\n\
deep\r\n\
--c--\r\n\
--b--";
        let bytes = Bytes::from_static(body.as_bytes());
        let err = Walker::new(1)
            .walk(bytes.clone(), "b", Container::Mixed, 1)
            .unwrap_err();
        assert!(matches!(err, Error::NestingTooDeep(1)));

        let bodies = Walker::new(2).walk(bytes, "b", Container::Mixed, 1).unwrap();
        assert_eq!(bodies.text, "deep");
    }

    #[test]
    fn test_rfc822_attachment_is_raw() {
        let body = "--b\r\n\
Content-Type: message/rfc822\r\n\
Content-Disposition: attachment\r\n\
Content-Transfer-Encoding: 7bit\r\n\
Content-Id: <fwd@example.com>\r\n\
\r\n\
Subject: inner\r\n\
\r\n\
body\r\n\
--b--";
        let bodies = walk(body, Container::Mixed).unwrap();
        let attachment = bodies.attachments.into_iter().next().unwrap();
        assert_eq!(attachment.filename, "fwd@example.com.eml");
        assert_eq!(attachment.content_type, "message/rfc822");
        assert_eq!(
            attachment.data.into_vec().unwrap(),
            b"Subject: inner\r\n\r\nbody"
        );
    }

    #[test]
    fn test_unknown_encoding_is_fatal_for_lazy_streams() {
        let body = "--b\r\n\
Content-Type: image/png\r\n\
Content-Disposition: attachment; filename=a.png\r\n\
Content-Transfer-Encoding: x-uuencode\r\n\
\r\n\
xx\r\n\
--b--";
        let err = walk(body, Container::Mixed).unwrap_err();
        assert_eq!(err.to_string(), "unknown encoding: x-uuencode");
    }
}
