//! Parsed email types.

use crate::address::Address;
use crate::data::Data;
use crate::fields::HeaderFields;
use crate::header::Headers;
use chrono::{DateTime, FixedOffset};

/// A file attached to the message.
#[derive(Debug)]
pub struct Attachment {
    /// Decoded filename, possibly empty.
    pub filename: String,
    /// Media type without parameters (e.g. `application/pdf`).
    pub content_type: String,
    /// Transfer-decoded content.
    pub data: Data,
}

/// A file referenced from the HTML body, usually by `cid:` URL.
#[derive(Debug)]
pub struct EmbeddedFile {
    /// Content-ID without angle brackets, or the disposition filename when
    /// the part has no Content-ID.
    pub cid: String,
    /// Media type without parameters.
    pub content_type: String,
    /// Transfer-decoded content.
    pub data: Data,
}

/// A decomposed email message.
#[derive(Debug, Default)]
pub struct Email {
    /// Message header. Values are encoded-word decoded unless disabled in
    /// [`crate::Config`].
    pub headers: Headers,

    /// Decoded subject.
    pub subject: String,
    /// `Sender` mailbox.
    pub sender: Option<Address>,
    /// `From` mailboxes.
    pub from: Vec<Address>,
    /// `Reply-To` mailboxes.
    pub reply_to: Vec<Address>,
    /// `To` mailboxes.
    pub to: Vec<Address>,
    /// `Cc` mailboxes.
    pub cc: Vec<Address>,
    /// `Bcc` mailboxes.
    pub bcc: Vec<Address>,
    /// Origination date.
    pub date: Option<DateTime<FixedOffset>>,
    /// Message id without angle brackets.
    pub message_id: String,
    /// Ids of the messages this one replies to.
    pub in_reply_to: Vec<String>,
    /// Ids of the thread this message belongs to.
    pub references: Vec<String>,

    /// `Resent-From` mailboxes.
    pub resent_from: Vec<Address>,
    /// `Resent-Sender` mailbox.
    pub resent_sender: Option<Address>,
    /// `Resent-To` mailboxes.
    pub resent_to: Vec<Address>,
    /// `Resent-Date`.
    pub resent_date: Option<DateTime<FixedOffset>>,
    /// `Resent-Cc` mailboxes.
    pub resent_cc: Vec<Address>,
    /// `Resent-Bcc` mailboxes.
    pub resent_bcc: Vec<Address>,
    /// `Resent-Message-ID` without angle brackets.
    pub resent_message_id: String,

    /// Top-level `Content-Type` value as declared, empty when absent.
    pub content_type: String,
    /// Body of a message that is neither multipart nor text.
    pub content: Option<Data>,

    /// Plain-text body.
    pub text_body: String,
    /// HTML body.
    pub html_body: String,

    /// Attachments in message order.
    pub attachments: Vec<Attachment>,
    /// Embedded files in message order.
    pub embedded_files: Vec<EmbeddedFile>,
}

impl Email {
    pub(crate) fn with_fields(headers: Headers, fields: HeaderFields) -> Self {
        let HeaderFields {
            subject,
            from,
            sender,
            reply_to,
            to,
            cc,
            bcc,
            date,
            resent_from,
            resent_sender,
            resent_to,
            resent_cc,
            resent_bcc,
            resent_message_id,
            message_id,
            in_reply_to,
            references,
            resent_date,
        } = fields;

        Self {
            headers,
            subject,
            sender,
            from,
            reply_to,
            to,
            cc,
            bcc,
            date,
            message_id,
            in_reply_to,
            references,
            resent_from,
            resent_sender,
            resent_to,
            resent_date,
            resent_cc,
            resent_bcc,
            resent_message_id,
            ..Self::default()
        }
    }
}
