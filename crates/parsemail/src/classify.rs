//! Leaf part classification.

use crate::content_type::Disposition;
use crate::header::Headers;

/// Checks whether a part is an attachment.
///
/// True only when `Content-Disposition` parses and its type is `attachment`.
/// A malformed disposition is not an attachment.
#[must_use]
pub fn is_attachment(headers: &Headers) -> bool {
    headers
        .get("content-disposition")
        .and_then(|value| Disposition::parse(value).ok())
        .is_some_and(|disposition| disposition.is_attachment())
}

/// Checks whether a non-text leaf is an embedded file.
///
/// True when the part declares a transfer encoding, or its disposition is
/// exactly of the `inline; filename=` form.
#[must_use]
pub fn is_embedded_file(headers: &Headers) -> bool {
    headers
        .get("content-transfer-encoding")
        .is_some_and(|value| !value.is_empty())
        || headers
            .get("content-disposition")
            .is_some_and(|value| value.starts_with("inline; filename="))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        let mut headers = Headers::new();
        for (name, value) in pairs {
            headers.add(*name, *value);
        }
        headers
    }

    #[test]
    fn test_is_attachment() {
        assert!(is_attachment(&headers(&[(
            "Content-Disposition",
            "attachment; filename=\"a.txt\""
        )])));
        assert!(is_attachment(&headers(&[("Content-Disposition", "ATTACHMENT")])));
        assert!(!is_attachment(&headers(&[("Content-Disposition", "inline")])));
        assert!(!is_attachment(&headers(&[])));
    }

    #[test]
    fn test_malformed_disposition_is_not_attachment() {
        assert!(!is_attachment(&headers(&[("Content-Disposition", "inline; xxx")])));
        assert!(!is_attachment(&headers(&[(
            "Content-Disposition",
            "attachment; filename"
        )])));
    }

    #[test]
    fn test_is_embedded_file() {
        assert!(is_embedded_file(&headers(&[(
            "Content-Transfer-Encoding",
            "base64"
        )])));
        assert!(is_embedded_file(&headers(&[(
            "Content-Disposition",
            "inline; filename=\"logo.png\""
        )])));
        assert!(!is_embedded_file(&headers(&[("Content-Disposition", "inline")])));
        assert!(!is_embedded_file(&headers(&[("Content-Transfer-Encoding", "")])));
        assert!(!is_embedded_file(&headers(&[])));
    }
}
