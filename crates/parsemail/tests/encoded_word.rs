//! Property tests for RFC 2047 encoded-word decoding.

use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use proptest::prelude::*;

use parsemail::rfc2047::{self, UNSUPPORTED_CHARSET, UNSUPPORTED_ENCODER, UNSUPPORTED_ENCODING};

fn encode_q(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &byte in bytes {
        match byte {
            b' ' => out.push('_'),
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "={byte:02X}");
            }
        }
    }
    out
}

fn encode_b(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

proptest! {
    #[test]
    fn utf8_words_round_trip(text in "\\PC{0,40}") {
        let b = format!("=?utf-8?B?{}?=", encode_b(text.as_bytes()));
        prop_assert_eq!(rfc2047::decode_word(&b), Some(text.clone()));

        let q = format!("=?UTF-8?q?{}?=", encode_q(text.as_bytes()));
        prop_assert_eq!(rfc2047::decode_word(&q), Some(text));
    }

    #[test]
    fn latin1_words_round_trip(text in "[ -~\u{a0}-\u{ff}]{0,40}") {
        let latin1: Vec<u8> = text
            .chars()
            .filter_map(|c| u8::try_from(u32::from(c)).ok())
            .collect();

        let q = format!("=?iso-8859-1?Q?{}?=", encode_q(&latin1));
        prop_assert_eq!(rfc2047::decode_word(&q), Some(text.clone()));

        let b = format!("=?ISO-8859-1?b?{}?=", encode_b(&latin1));
        prop_assert_eq!(rfc2047::decode_word(&b), Some(text));
    }

    #[test]
    fn plain_sentences_are_unchanged(text in "[a-zA-Z0-9 ,.:]{0,60}") {
        prop_assert_eq!(rfc2047::decode_sentence(&text), text);
    }

    #[test]
    fn unsupported_words_keep_siblings(
        before in "[a-z]{1,8}",
        after in "[a-z]{1,8}",
        kind in 0usize..3,
    ) {
        let (word, placeholder) = [
            ("=??q?abc?=", UNSUPPORTED_CHARSET),
            ("=?utf-8?qq?abc?=", UNSUPPORTED_ENCODING),
            ("=?x-no-such-charset?q?abc?=", UNSUPPORTED_ENCODER),
        ][kind];

        let sentence = format!("{before} {word} {after}");
        prop_assert_eq!(
            rfc2047::decode_sentence(&sentence),
            format!("{before} {placeholder} {after}")
        );
        prop_assert_eq!(
            rfc2047::strip_unsupported(&sentence),
            format!("{before} \"{placeholder}\" {after}")
        );
    }
}
