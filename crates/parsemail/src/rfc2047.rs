//! RFC 2047 encoded-word decoding for header text.
//!
//! Encoded words look like `=?charset?encoding?text?=`. Words naming a charset
//! or encoding this crate cannot decode are never fatal: they are replaced by
//! one of three fixed placeholder strings.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use charset::Charset;

/// Placeholder for an encoded word without a charset.
pub const UNSUPPORTED_CHARSET: &str = "(removed text: non supported charset)";

/// Placeholder for an encoded word whose encoding tag is not a single letter.
pub const UNSUPPORTED_ENCODING: &str = "(removed text: non supported encoding)";

/// Placeholder for an encoded word whose charset has no known decoder.
pub const UNSUPPORTED_ENCODER: &str = "(removed text: non supported encoder)";

struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    text: &'a str,
}

impl<'a> EncodedWord<'a> {
    fn split(word: &'a str) -> Option<Self> {
        let inner = word.strip_prefix("=?")?.strip_suffix("?=")?;
        let (charset, rest) = inner.split_once('?').unwrap_or((inner, ""));
        let (encoding, text) = rest.split_once('?').unwrap_or((rest, ""));
        Some(Self {
            charset,
            encoding,
            text,
        })
    }
}

/// Resolves a charset label, ignoring an RFC 2231 language suffix.
fn resolve_charset(label: &str) -> Option<Charset> {
    let label = label.split_once('*').map_or(label, |(label, _)| label);
    Charset::for_label_no_replacement(label.trim().as_bytes())
}

/// Returns the placeholder for an encoded word this decoder cannot handle.
///
/// Returns `None` for plain tokens and for encoded words with a supported
/// charset and a single-letter encoding.
#[must_use]
pub fn unsupported_reason(word: &str) -> Option<&'static str> {
    let word = EncodedWord::split(word)?;
    if word.charset.is_empty() {
        return Some(UNSUPPORTED_CHARSET);
    }
    if word.encoding.len() != 1 {
        return Some(UNSUPPORTED_ENCODING);
    }
    if resolve_charset(word.charset).is_none() {
        return Some(UNSUPPORTED_ENCODER);
    }
    None
}

/// Decodes a single encoded word.
///
/// Returns `None` if `word` is not an encoded word or its payload cannot be
/// decoded.
#[must_use]
pub fn decode_word(word: &str) -> Option<String> {
    let word = EncodedWord::split(word)?;
    let charset = resolve_charset(word.charset)?;
    let bytes = match word.encoding {
        "B" | "b" => STANDARD.decode(word.text).ok()?,
        "Q" | "q" => decode_q(word.text)?,
        _ => return None,
    };
    let (text, _) = charset.decode_without_bom_handling(&bytes);
    Some(text.into_owned())
}

/// Q encoding: `_` is a space, `=XX` a hex escape.
fn decode_q(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => decoded.push(b' '),
            b'=' => {
                let high = hex_value(*bytes.get(i + 1)?)?;
                let low = hex_value(*bytes.get(i + 2)?)?;
                decoded.push((high << 4) | low);
                i += 2;
            }
            byte => decoded.push(byte),
        }
        i += 1;
    }
    Some(decoded)
}

fn hex_value(byte: u8) -> Option<u8> {
    char::from(byte)
        .to_digit(16)
        .and_then(|digit| u8::try_from(digit).ok())
}

/// Decodes every encoded word in a free-text header value.
///
/// Tokens are split on single spaces and rejoined with one space, except that
/// the space between two adjacent decoded words is dropped. Unsupported words
/// become placeholders; words that fail to decode are kept verbatim.
#[must_use]
pub fn decode_sentence(value: &str) -> String {
    let mut sentence = String::with_capacity(value.len());
    let mut prev_encoded = false;

    for (i, token) in value.split(' ').enumerate() {
        let decoded = match unsupported_reason(token) {
            Some(placeholder) => Err(placeholder),
            None => decode_word(token).ok_or(token),
        };

        match decoded {
            Ok(text) => {
                if i > 0 && !prev_encoded {
                    sentence.push(' ');
                }
                sentence.push_str(&text);
                prev_encoded = true;
            }
            Err(raw) => {
                if i > 0 {
                    sentence.push(' ');
                }
                sentence.push_str(raw);
                prev_encoded = false;
            }
        }
    }

    sentence
}

/// Replaces unsupported encoded words in one address with quoted placeholders.
///
/// Supported words are left for the address parser to decode.
#[must_use]
pub fn strip_unsupported(address: &str) -> String {
    address
        .split(' ')
        .map(|token| {
            unsupported_reason(token)
                .map_or_else(|| token.to_string(), |placeholder| format!("\"{placeholder}\""))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replaces unsupported encoded words in a comma-separated address list.
///
/// Whole words are replaced before the list is split on commas, so a comma
/// inside an unsupported word cannot split the list.
#[must_use]
pub fn strip_unsupported_in_list(list: &str) -> String {
    strip_unsupported(list)
        .split(',')
        .map(strip_unsupported)
        .collect::<Vec<_>>()
        .join(",")
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
    fn test_decode_word_base64() {
        assert_eq!(decode_word("=?utf-8?B?SMOpbGxv?=").as_deref(), Some("Héllo"));
        assert_eq!(decode_word("=?UTF-8?b?SMOpbGxv?=").as_deref(), Some("Héllo"));
    }

    #[test]
    fn test_decode_word_q() {
        assert_eq!(
            decode_word("=?utf-8?Q?H=C3=A9llo_World?=").as_deref(),
            Some("Héllo World")
        );
        assert_eq!(
            decode_word("=?iso-8859-1?q?=A1Hola,_se=F1or!?=").as_deref(),
            Some("\u{a1}Hola, se\u{f1}or!")
        );
    }

    #[test]
    fn test_decode_word_language_suffix() {
        assert_eq!(decode_word("=?utf-8*en?Q?Hi?=").as_deref(), Some("Hi"));
    }

    #[test]
    fn test_decode_word_rejects() {
        assert!(decode_word("plain").is_none());
        assert!(decode_word("=?utf-8?B?!!!?=").is_none());
        assert!(decode_word("=?utf-8?Q?bad=Z1?=").is_none());
        assert!(decode_word("=?utf-8?X?abc?=").is_none());
    }

    #[test]
    fn test_unsupported_reason() {
        assert_eq!(unsupported_reason("plain"), None);
        assert_eq!(unsupported_reason("=?utf-8?Q?ok?="), None);
        assert_eq!(unsupported_reason("=??Q?text?="), Some(UNSUPPORTED_CHARSET));
        assert_eq!(
            unsupported_reason("=?utf-8?QQ?text?="),
            Some(UNSUPPORTED_ENCODING)
        );
        assert_eq!(
            unsupported_reason("=?utf-8??text?="),
            Some(UNSUPPORTED_ENCODING)
        );
        assert_eq!(
            unsupported_reason("=?x-unknown-charset?Q?text?="),
            Some(UNSUPPORTED_ENCODER)
        );
    }

    #[test]
    fn test_decode_sentence_plain() {
        assert_eq!(decode_sentence(""), "");
        assert_eq!(decode_sentence("Hello World"), "Hello World");
        assert_eq!(decode_sentence("a  b"), "a  b");
    }

    #[test]
    fn test_decode_sentence_adjacent_words() {
        assert_eq!(
            decode_sentence("=?UTF-8?Q?Hello_?= =?UTF-8?Q?World?="),
            "Hello World"
        );
        assert_eq!(
            decode_sentence("=?utf-8?q?a?= =?utf-8?q?b?= tail"),
            "ab tail"
        );
        assert_eq!(
            decode_sentence("Re: =?utf-8?B?SMOpbGxv?="),
            "Re: Héllo"
        );
    }

    #[test]
    fn test_decode_sentence_placeholders() {
        assert_eq!(
            decode_sentence("Subject =?x-unknown?Q?abc?= end"),
            format!("Subject {UNSUPPORTED_ENCODER} end")
        );
        assert_eq!(
            decode_sentence("=??Q?abc?="),
            UNSUPPORTED_CHARSET.to_string()
        );
    }

    #[test]
    fn test_decode_sentence_keeps_broken_words() {
        assert_eq!(
            decode_sentence("=?utf-8?B?!!!?= next"),
            "=?utf-8?B?!!!?= next"
        );
        assert_eq!(
            decode_sentence("first =?utf-8?B?!!!?="),
            "first =?utf-8?B?!!!?="
        );
    }

    #[test]
    fn test_strip_unsupported() {
        assert_eq!(strip_unsupported(""), "");
        assert_eq!(
            strip_unsupported("=?utf-8?Q?Ok?= <a@x.com>"),
            "=?utf-8?Q?Ok?= <a@x.com>"
        );
        assert_eq!(
            strip_unsupported("=?x-unknown?Q?N?= <a@x.com>"),
            format!("\"{UNSUPPORTED_ENCODER}\" <a@x.com>")
        );
    }

    #[test]
    fn test_strip_unsupported_in_list() {
        assert_eq!(
            strip_unsupported_in_list("a@x.com,=?x-unknown?Q?N?= <b@x.com>"),
            format!("a@x.com,\"{UNSUPPORTED_ENCODER}\" <b@x.com>")
        );
        // A comma inside an unsupported word must not survive.
        assert_eq!(
            strip_unsupported_in_list("=?x-unknown?Q?a,b?= <b@x.com>"),
            format!("\"{UNSUPPORTED_ENCODER}\" <b@x.com>")
        );
    }
}
