//! Structured header fields: addresses, dates and message ids.

use crate::address::{self, Address};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::rfc2047;
use chrono::{DateTime, FixedOffset};

/// Date layouts tried in order, after the leading `Mon, `. Each is also tried
/// with a trailing parenthesised zone comment such as `(MST)`.
const DATE_LAYOUTS: [&str; 2] = ["%d %b %Y %H:%M:%S %z", "%e %b %Y %H:%M:%S %z"];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Standard header fields resolved from a message header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    /// Decoded `Subject`.
    pub subject: String,
    /// `From` mailboxes.
    pub from: Vec<Address>,
    /// `Sender` mailbox.
    pub sender: Option<Address>,
    /// `Reply-To` mailboxes.
    pub reply_to: Vec<Address>,
    /// `To` mailboxes.
    pub to: Vec<Address>,
    /// `Cc` mailboxes.
    pub cc: Vec<Address>,
    /// `Bcc` mailboxes.
    pub bcc: Vec<Address>,
    /// `Date`.
    pub date: Option<DateTime<FixedOffset>>,
    /// `Resent-From` mailboxes.
    pub resent_from: Vec<Address>,
    /// `Resent-Sender` mailbox.
    pub resent_sender: Option<Address>,
    /// `Resent-To` mailboxes.
    pub resent_to: Vec<Address>,
    /// `Resent-Cc` mailboxes.
    pub resent_cc: Vec<Address>,
    /// `Resent-Bcc` mailboxes.
    pub resent_bcc: Vec<Address>,
    /// `Resent-Message-ID` without angle brackets.
    pub resent_message_id: String,
    /// `Message-ID` without angle brackets.
    pub message_id: String,
    /// `In-Reply-To` ids.
    pub in_reply_to: Vec<String>,
    /// `References` ids.
    pub references: Vec<String>,
    /// `Resent-Date`.
    pub resent_date: Option<DateTime<FixedOffset>>,
}

impl HeaderFields {
    /// Resolves every standard field from `headers`.
    ///
    /// Fields are resolved in a fixed order; the first failure stops
    /// resolution and is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] or [`Error::InvalidDate`] for the
    /// first field that fails to parse.
    pub fn resolve(headers: &Headers) -> Result<Self> {
        let get = |name: &str| headers.get(name).unwrap_or_default();

        Ok(Self {
            subject: rfc2047::decode_sentence(get("Subject")),
            from: address_list(get("From"))?,
            sender: address(get("Sender"))?,
            reply_to: address_list(get("Reply-To"))?,
            to: address_list(get("To"))?,
            cc: address_list(get("Cc"))?,
            bcc: address_list(get("Bcc"))?,
            date: date(get("Date"))?,
            resent_from: address_list(get("Resent-From"))?,
            resent_sender: address(get("Resent-Sender"))?,
            resent_to: address_list(get("Resent-To"))?,
            resent_cc: address_list(get("Resent-Cc"))?,
            resent_bcc: address_list(get("Resent-Bcc"))?,
            resent_message_id: message_id(get("Resent-Message-ID")),
            message_id: message_id(get("Message-ID")),
            in_reply_to: message_id_list(get("In-Reply-To")),
            references: message_id_list(get("References")),
            resent_date: date(get("Resent-Date"))?,
        })
    }
}

fn is_blank(value: &str) -> bool {
    value.trim_matches([' ', '\n']).is_empty()
}

/// Parses a single-mailbox field. Blank values yield `None`.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the value is not one mailbox.
pub fn address(value: &str) -> Result<Option<Address>> {
    if is_blank(value) {
        return Ok(None);
    }
    address::parse_one(&rfc2047::strip_unsupported(value)).map(Some)
}

/// Parses an address-list field. Blank values yield an empty list.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if any entry is malformed.
pub fn address_list(value: &str) -> Result<Vec<Address>> {
    if is_blank(value) {
        return Ok(Vec::new());
    }
    address::parse_list(&rfc2047::strip_unsupported_in_list(value))
}

/// Parses a date field. An empty value yields `None`.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] if no accepted layout matches.
pub fn date(value: &str) -> Result<Option<DateTime<FixedOffset>>> {
    if value.is_empty() {
        return Ok(None);
    }
    let invalid = || Error::InvalidDate(value.to_string());

    // The day name must be well formed but is not checked against the date.
    let (weekday, rest) = value.split_once(", ").ok_or_else(invalid)?;
    if !WEEKDAYS.contains(&weekday) {
        return Err(invalid());
    }

    let without_comment = rest
        .strip_suffix(')')
        .and_then(|rest| rest.rsplit_once(" ("))
        .map(|(date, _)| date);

    for candidate in std::iter::once(rest).chain(without_comment) {
        for layout in DATE_LAYOUTS {
            if let Ok(parsed) = DateTime::parse_from_str(candidate, layout) {
                return Ok(Some(parsed));
            }
        }
    }

    Err(invalid())
}

/// Strips angle brackets and spaces around a message id.
#[must_use]
pub fn message_id(value: &str) -> String {
    value.trim_matches(['<', '>', ' ']).to_string()
}

/// Splits a space-separated list of message ids.
#[must_use]
pub fn message_id_list(value: &str) -> Vec<String> {
    value
        .split(' ')
        .filter(|token| !is_blank(token))
        .map(message_id)
        .collect()
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
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_address_blank() {
        assert_eq!(address(" \n").unwrap(), None);
        assert!(address_list("").unwrap().is_empty());
    }

    #[test]
    fn test_address_list_decoded_names() {
        let list = address_list("a@x.com,=?utf-8?q?N=C3=A4me?= <b@x.com>").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], Address::new("", "a@x.com"));
        assert_eq!(list[1], Address::new("Näme", "b@x.com"));
    }

    #[test]
    fn test_address_list_unsupported_charset() {
        let list = address_list("a@x.com,=?unknown-charset?q?NAME?= <b@x.com>").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].name, rfc2047::UNSUPPORTED_ENCODER);
        assert_eq!(list[1].address, "b@x.com");

        let list = address_list("a@x.com, =?unknown-charset?q?a,b?= <b@x.com>").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].name, rfc2047::UNSUPPORTED_ENCODER);
    }

    #[test]
    fn test_single_address() {
        let sender = address("Sender <s@x.com>").unwrap().unwrap();
        assert_eq!(sender.name, "Sender");
        assert!(address("a@x.com, b@x.com").is_err());
    }

    #[test]
    fn test_date_layouts() {
        let date1 = date("Fri, 21 Nov 1997 09:55:06 -0600").unwrap().unwrap();
        assert_eq!(date1.day(), 21);
        assert_eq!(date1.hour(), 9);
        assert_eq!(date1.offset().local_minus_utc(), -6 * 3600);

        let date2 = date("Mon, 2 Jan 2006 15:04:05 -0700").unwrap().unwrap();
        assert_eq!(date2.day(), 2);

        let date3 = date("Mon, 02 Jan 2006 15:04:05 -0700 (MST)").unwrap().unwrap();
        assert_eq!(date3, date2);

        let date4 = date("Mon, 2 Jan 2006 15:04:05 -0700 (MST)").unwrap().unwrap();
        assert_eq!(date4, date2);

        // Weekday mismatches are tolerated.
        let date5 = date("Fri, 02 May 2019 11:25:35 +0300").unwrap().unwrap();
        assert_eq!(date5.day(), 2);
    }

    #[test]
    fn test_date_empty_and_invalid() {
        assert_eq!(date("").unwrap(), None);
        let err = date("yesterday").unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)));
        assert!(date("2006-01-02T15:04:05Z").is_err());
        assert!(date("Foo, 2 Jan 2006 15:04:05 -0700").is_err());
        assert!(date("2 Jan 2006 15:04:05 -0700").is_err());
    }

    #[test]
    fn test_message_ids() {
        assert_eq!(message_id(" <abc@host> "), "abc@host");
        assert_eq!(
            message_id_list("<a@h>  <b@h>"),
            vec!["a@h".to_string(), "b@h".to_string()]
        );
        assert!(message_id_list("").is_empty());
    }

    #[test]
    fn test_resolve() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?b?SGVsbG8=?= world");
        headers.add("From", "Alice <alice@example.com>");
        headers.add("To", "bob@example.com, carol@example.com");
        headers.add("Date", "Mon, 2 Jan 2006 15:04:05 -0700");
        headers.add("Message-ID", "<id@example.com>");
        headers.add("References", "<r1@x> <r2@x>");

        let fields = HeaderFields::resolve(&headers).unwrap();
        assert_eq!(fields.subject, "Hello world");
        assert_eq!(fields.from[0].name, "Alice");
        assert_eq!(fields.to.len(), 2);
        assert!(fields.sender.is_none());
        assert!(fields.date.is_some());
        assert!(fields.resent_date.is_none());
        assert_eq!(fields.message_id, "id@example.com");
        assert_eq!(fields.references, vec!["r1@x", "r2@x"]);
    }

    #[test]
    fn test_resolve_stops_at_first_error() {
        let mut headers = Headers::new();
        headers.add("From", "not an address");
        headers.add("Date", "also bad");

        let err = HeaderFields::resolve(&headers).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }
}
