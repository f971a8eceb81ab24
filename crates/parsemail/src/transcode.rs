//! Charset transcoding of decoded text bodies.

use crate::content_type::ContentType;
use charset::{Charset, decode_latin1};
use memchr::memmem;

/// How far into a body the `<meta>` prescan looks.
const PRESCAN_LIMIT: usize = 1024;

/// Converts decoded body bytes to a `String` using the part's charset.
///
/// Without a usable `charset` parameter the bytes are sniffed: a UTF-16
/// byte-order mark selects UTF-16, then a `<meta>` charset declaration in the
/// first kilobyte, then valid UTF-8 is kept as UTF-8, and anything else is
/// read as windows-1252.
#[must_use]
pub fn decode_text(bytes: &[u8], content_type: &ContentType) -> String {
    if let Some(label) = content_type.charset() {
        if let Some(charset) = Charset::for_label(label.trim().as_bytes()) {
            let (text, _, malformed) = charset.decode(bytes);
            if malformed {
                tracing::debug!(charset = label, "replaced malformed sequences");
            }
            return text.into_owned();
        }
        tracing::debug!(charset = label, "unsupported charset, sniffing body");
    }
    sniff(bytes)
}

fn sniff(bytes: &[u8]) -> String {
    if bytes.starts_with(b"\xFF\xFE") || bytes.starts_with(b"\xFE\xFF") {
        // The byte-order mark overrides the label.
        if let Some(charset) = Charset::for_label(b"utf-16le") {
            return charset.decode(bytes).0.into_owned();
        }
    }
    if let Some(charset) = prescan(&bytes[..bytes.len().min(PRESCAN_LIMIT)]) {
        tracing::debug!(charset = charset.name(), "charset from meta element");
        return charset.decode(bytes).0.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text).to_string(),
        Err(_) => Charset::for_label(b"windows-1252").map_or_else(
            || decode_latin1(bytes).into_owned(),
            |charset| charset.decode_without_bom_handling(bytes).0.into_owned(),
        ),
    }
}

/// Looks for a charset declared by an HTML `<meta>` element.
///
/// `<meta charset=...>` is taken as is. A charset inside `content` counts only
/// when the same element carries `http-equiv="content-type"`. UTF-16 labels
/// resolve to UTF-8.
fn prescan(head: &[u8]) -> Option<Charset> {
    let mut pos = 0;
    while let Some(offset) = memchr::memchr(b'<', &head[pos..]) {
        pos += offset;
        let rest = &head[pos..];
        if rest.starts_with(b"<!--") {
            pos += memmem::find(&rest[4..], b"-->").map_or(rest.len(), |end| end + 7);
            continue;
        }
        pos += 1;
        if !starts_with_ignore_case(rest, b"<meta")
            || !rest.get(5).is_some_and(|&b| b.is_ascii_whitespace() || b == b'/')
        {
            continue;
        }

        let mut tag = MetaTag::default();
        pos += 4 + tag.read_attributes(&rest[5..]);
        let label = match (tag.charset, tag.content_charset) {
            (Some(label), _) => label,
            (None, Some(label)) if tag.pragma => label,
            _ => continue,
        };
        if let Some(charset) = Charset::for_label(label) {
            if charset.name().starts_with("UTF-16") {
                return Charset::for_label(b"utf-8");
            }
            return Some(charset);
        }
    }
    None
}

#[derive(Default)]
struct MetaTag<'a> {
    pragma: bool,
    charset: Option<&'a [u8]>,
    content_charset: Option<&'a [u8]>,
}

impl<'a> MetaTag<'a> {
    /// Reads attributes up to the closing `>`, returning the bytes consumed.
    fn read_attributes(&mut self, input: &'a [u8]) -> usize {
        let mut i = 0;
        loop {
            while input.get(i).is_some_and(|&b| b.is_ascii_whitespace() || b == b'/') {
                i += 1;
            }
            match input.get(i) {
                None => return i,
                Some(b'>') => return i + 1,
                Some(_) => {}
            }

            let start = i;
            while input
                .get(i)
                .is_some_and(|&b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
            {
                i += 1;
            }
            let name = &input[start..i];
            while input.get(i).is_some_and(u8::is_ascii_whitespace) {
                i += 1;
            }

            let mut value: &[u8] = b"";
            if input.get(i) == Some(&b'=') {
                i += 1;
                while input.get(i).is_some_and(u8::is_ascii_whitespace) {
                    i += 1;
                }
                let (taken, len) = attribute_value(&input[i..]);
                value = taken;
                i += len;
            }
            self.attribute(name, value);
        }
    }

    fn attribute(&mut self, name: &[u8], value: &'a [u8]) {
        if name.eq_ignore_ascii_case(b"http-equiv") {
            self.pragma |= value.eq_ignore_ascii_case(b"content-type");
        } else if name.eq_ignore_ascii_case(b"charset") {
            self.charset.get_or_insert(value);
        } else if name.eq_ignore_ascii_case(b"content") && self.content_charset.is_none() {
            self.content_charset = charset_from_content(value);
        }
    }
}

/// Splits a quoted or bare attribute value off `input`.
fn attribute_value(input: &[u8]) -> (&[u8], usize) {
    match input.first() {
        Some(&quote @ (b'"' | b'\'')) => match memchr::memchr(quote, &input[1..]) {
            Some(end) => (&input[1..=end], end + 2),
            None => (&input[1..], input.len()),
        },
        _ => {
            let len = input
                .iter()
                .position(|&b| b.is_ascii_whitespace() || b == b'>')
                .unwrap_or(input.len());
            (&input[..len], len)
        }
    }
}

/// Extracts the label from a `content` value like `text/html; charset=koi8-r`.
fn charset_from_content(value: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos < value.len() {
        let found = value[pos..]
            .windows(7)
            .position(|w| w.eq_ignore_ascii_case(b"charset"))?;
        pos += found + 7;

        let mut rest = value[pos..].trim_ascii_start();
        let Some(after) = rest.strip_prefix(b"=") else {
            continue;
        };
        rest = after.trim_ascii_start();
        return match rest.first() {
            Some(&quote @ (b'"' | b'\'')) => {
                let end = memchr::memchr(quote, &rest[1..])?;
                Some(&rest[1..=end])
            }
            _ => {
                let len = rest
                    .iter()
                    .position(|&b| b == b';' || b.is_ascii_whitespace())
                    .unwrap_or(rest.len());
                (len > 0).then(|| &rest[..len])
            }
        };
    }
    None
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Decodes bytes with an explicitly labelled charset, if the label is known.
pub(crate) fn decode_labelled(label: &str, bytes: &[u8]) -> Option<String> {
    Charset::for_label(label.trim().as_bytes())
        .map(|charset| charset.decode_without_bom_handling(bytes).0.into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn with_charset(charset: &str) -> ContentType {
        let mut ct = ContentType::text_plain();
        ct.parameters.insert("charset".to_string(), charset.to_string());
        ct
    }

    #[test]
    fn test_decode_utf8_label() {
        let text = decode_text("Héllo".as_bytes(), &with_charset("UTF-8"));
        assert_eq!(text, "Héllo");
    }

    #[test]
    fn test_decode_latin1_label() {
        let text = decode_text(b"caf\xe9", &with_charset("iso-8859-1"));
        assert_eq!(text, "café");
    }

    #[test]
    fn test_decode_other_labels() {
        let text = decode_text(b"\xcf\xf0\xe8\xe2\xe5\xf2", &with_charset("windows-1251"));
        assert_eq!(text, "Привет");
        let text = decode_text(b"\x1b$B$3$s$K$A$O\x1b(B", &with_charset("iso-2022-jp"));
        assert_eq!(text, "こんにちは");
    }

    #[test]
    fn test_sniff_without_label() {
        let ct = ContentType::text_plain();
        assert_eq!(decode_text("naïve".as_bytes(), &ct), "naïve");
        assert_eq!(decode_text(b"na\xefve", &ct), "naïve");
        assert_eq!(decode_text(b"\xef\xbb\xbfbom", &ct), "bom");
    }

    #[test]
    fn test_unknown_label_falls_back_to_sniffing() {
        let text = decode_text("plain ütf8".as_bytes(), &with_charset("x-made-up"));
        assert_eq!(text, "plain ütf8");
    }

    #[test]
    fn test_utf16_bom() {
        let ct = ContentType::text_plain();
        assert_eq!(decode_text(b"\xff\xfeh\x00i\x00", &ct), "hi");
        assert_eq!(decode_text(b"\xfe\xff\x00h\x00i", &ct), "hi");
    }

    #[test]
    fn test_windows_1252_fallback() {
        let ct = ContentType::text_plain();
        assert_eq!(decode_text(b"\x93quoted\x94", &ct), "\u{201c}quoted\u{201d}");
    }

    #[test]
    fn test_meta_charset() {
        let ct = ContentType::new("text", "html");
        let body = b"<meta charset=\"koi8-r\"><p>\xf0\xd2\xc9\xd7\xc5\xd4</p>";
        assert_eq!(decode_text(body, &ct), "<meta charset=\"koi8-r\"><p>Привет</p>");

        let body = b"<html><HEAD><Meta Charset=windows-1251 /></HEAD>\xcf\xf0\xe8\xe2\xe5\xf2";
        assert!(decode_text(body, &ct).ends_with("Привет"));
    }

    #[test]
    fn test_meta_http_equiv() {
        let ct = ContentType::new("text", "html");
        let body = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=koi8-r\">\xf0\xd2\xc9\xd7\xc5\xd4";
        assert!(decode_text(body, &ct).ends_with("Привет"));

        // Without the pragma the content attribute is ignored.
        let body = b"<meta content=\"text/html; charset=koi8-r\">\xe9";
        assert!(decode_text(body, &ct).ends_with('é'));
    }

    #[test]
    fn test_meta_prescan_edges() {
        let ct = ContentType::new("text", "html");
        let hidden = b"<!-- <meta charset=koi8-r> --><p>caf\xe9</p>";
        assert_eq!(decode_text(hidden, &ct), "<!-- <meta charset=koi8-r> --><p>café</p>");

        let utf16 = "<meta charset=utf-16><p>naïve</p>";
        assert_eq!(decode_text(utf16.as_bytes(), &ct), utf16);

        let mut late = vec![b' '; PRESCAN_LIMIT];
        late.extend_from_slice(b"<meta charset=koi8-r>\xe9");
        assert!(decode_text(&late, &ct).ends_with('é'));
    }

    #[test]
    fn test_charset_from_content() {
        assert_eq!(
            charset_from_content(b"text/html; charset=koi8-r"),
            Some(&b"koi8-r"[..])
        );
        assert_eq!(
            charset_from_content(b"text/html;CHARSET = 'utf-8'"),
            Some(&b"utf-8"[..])
        );
        assert_eq!(charset_from_content(b"charsetx; charset=\"x"), None);
        assert_eq!(charset_from_content(b"text/html"), None);
    }

    #[test]
    fn test_decode_labelled() {
        assert_eq!(decode_labelled("utf-8", b"ok").as_deref(), Some("ok"));
        assert_eq!(decode_labelled("nope", b"ok"), None);
    }
}
