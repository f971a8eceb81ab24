//! End-to-end parsing tests over complete messages.

#![allow(clippy::unwrap_used, clippy::too_many_lines)]

use std::io::Read;

use chrono::DateTime;
use parsemail::{Config, Error, Parser, rfc2047};

const TEXT_PLAIN_ATTACHMENT_IN_MULTIPART: &str = r#"From: Rares <rares@example.com>
Date: Thu, 2 May 2019 11:25:35 +0300
Subject: Re: kern/54143 (virtualbox)
To: bugs@example.com
Content-Type: multipart/mixed; boundary="0000000000007e2bb40587e36196"

--0000000000007e2bb40587e36196
Content-Type: text/plain; charset="UTF-8"

plain text part
--0000000000007e2bb40587e36196
Content-Disposition: attachment;
    filename=test.txt
Content-Type: text/plain; charset="UTF-8"
Content-Transfer-Encoding: quoted-printable

attachment text part
--0000000000007e2bb40587e36196--
"#;

const EMPTY_PLAINTEXT_BASE64_HTML: &str = r#"Return-Path: <support@example.org>
Delivered-To: servicedesk@example.net
Received: from mail.example.org
	by mail.example.net (Dovecot) with LMTP id 7KTQOu3CIGCQiQAAhDWd3A
	for <servicedesk@example.net>; Mon, 08 Feb 2021 05:49:49 +0100
Importance: normal
MIME-Version: 1.0
From: Example IT - Support <support@example.org>
To: Servicedesk <servicedesk@example.net>
Date: Sun, 7 Feb 2021 23:49:48 -0500
Subject: Some very important email
Content-Type: multipart/alternative;
	boundary="--boundary_83159_42d3ef90-0a52-4a0c-9867-0ccf54ca8b80"
Message-ID: <dshfkhhskjfdd0002eeaa@mail.example.org>
X-OriginalArrivalTime: 08 Feb 2021 04:49:48.0307 (UTC) FILETIME=[D4251630:01D6FDD5]

----boundary_83159_42d3ef90-0a52-4a0c-9867-0ccf54ca8b80
Content-Type: text/plain; charset="us-ascii"
Content-Transfer-Encoding: quoted-printable


----boundary_83159_42d3ef90-0a52-4a0c-9867-0ccf54ca8b80
Content-Type: text/html; charset="utf-8"
Content-Transfer-Encoding: base64

PHNwYW4+Zm9vIGJhcjwvc3Bhbj4=
----boundary_83159_42d3ef90-0a52-4a0c-9867-0ccf54ca8b80--
"#;

const MALFORMED_INLINE_DISPOSITION: &str = r#"From: a@example.com
Subject: inline image
Content-Type: multipart/mixed; boundary=outer

--outer
Content-Type: text/plain

see image
--outer
Content-Type: image/png
Content-Disposition: inline; xxx
Content-Transfer-Encoding: base64

iVBORw0KGgo=
--outer--
"#;

const NESTED_MIXED_ALTERNATIVE_MIXED: &str = r#"From: a@example.com
Content-Type: multipart/mixed; boundary=l1

--l1
Content-Type: multipart/alternative; boundary=l2

--l2
Content-Type: text/plain

plain
--l2
Content-Type: text/html

<b>html</b>
--l2
Content-Type: multipart/mixed; boundary=l3

--l3
Content-Type: application/pdf
Content-Disposition: attachment; filename="deep.pdf"
Content-Transfer-Encoding: base64

JVBERi0=
--l3--
--l2--
--l1--
"#;

#[test]
fn test_text_plain_attachment_in_multipart() {
    let email = parsemail::parse(TEXT_PLAIN_ATTACHMENT_IN_MULTIPART.as_bytes()).unwrap();

    assert_eq!(
        email.content_type,
        r#"multipart/mixed; boundary="0000000000007e2bb40587e36196""#
    );
    assert_eq!(email.subject, "Re: kern/54143 (virtualbox)");
    assert_eq!(email.from.len(), 1);
    assert_eq!(email.from[0].name, "Rares");
    assert_eq!(email.from[0].address, "rares@example.com");
    assert_eq!(email.to[0].name, "");
    assert_eq!(email.to[0].address, "bugs@example.com");
    assert_eq!(
        email.date,
        Some(DateTime::parse_from_rfc2822("Thu, 2 May 2019 11:25:35 +0300").unwrap())
    );
    assert_eq!(email.text_body, "plain text part");
    assert!(email.html_body.is_empty());
    assert!(email.embedded_files.is_empty());
    assert!(email.content.is_none());

    assert_eq!(email.attachments.len(), 1);
    let attachment = email.attachments.into_iter().next().unwrap();
    assert_eq!(attachment.filename, "test.txt");
    assert_eq!(attachment.content_type, "text/plain");
    assert_eq!(attachment.data.into_vec().unwrap(), b"attachment text part");
}

#[test]
fn test_empty_plaintext_base64_html() {
    let email = parsemail::parse_bytes(EMPTY_PLAINTEXT_BASE64_HTML).unwrap();

    assert_eq!(
        email.content_type,
        r#"multipart/alternative; boundary="--boundary_83159_42d3ef90-0a52-4a0c-9867-0ccf54ca8b80""#
    );
    assert_eq!(email.subject, "Some very important email");
    assert_eq!(email.message_id, "dshfkhhskjfdd0002eeaa@mail.example.org");
    assert_eq!(email.from[0].name, "Example IT - Support");
    assert_eq!(email.to[0].name, "Servicedesk");
    assert_eq!(email.to[0].address, "servicedesk@example.net");
    assert_eq!(email.text_body, "");
    assert_eq!(email.html_body, "<span>foo bar</span>");
    assert!(email.attachments.is_empty());
    assert_eq!(email.headers.get_all("received").len(), 1);
}

#[test]
fn test_malformed_inline_disposition_is_not_an_attachment() {
    let email = parsemail::parse_bytes(MALFORMED_INLINE_DISPOSITION).unwrap();

    assert_eq!(email.text_body, "see image");
    assert!(email.attachments.is_empty());
    assert_eq!(email.embedded_files.len(), 1);
    assert_eq!(email.embedded_files[0].cid, "");
    assert_eq!(email.embedded_files[0].content_type, "image/png");
}

#[test]
fn test_three_level_nesting() {
    let email = parsemail::parse_bytes(NESTED_MIXED_ALTERNATIVE_MIXED).unwrap();

    assert_eq!(email.text_body, "plain");
    assert_eq!(email.html_body, "<b>html</b>");
    assert_eq!(email.attachments.len(), 1);
    assert_eq!(email.attachments[0].filename, "deep.pdf");
    assert_eq!(email.attachments[0].content_type, "application/pdf");
}

#[test]
fn test_alternative_results_concatenate_across_containers() {
    let raw = r"Content-Type: multipart/mixed; boundary=m

--m
Content-Type: multipart/alternative; boundary=a

--a
Content-Type: text/plain

one
--a--
--m
Content-Type: multipart/alternative; boundary=b

--b
Content-Type: text/plain

two
--b--
--m--
";
    let email = parsemail::parse_bytes(raw).unwrap();
    assert_eq!(email.text_body, "onetwo");
}

#[test]
fn test_signed_is_walked_as_mixed() {
    let raw = r#"Content-Type: multipart/signed; protocol="application/pgp-signature"; boundary=s

--s
Content-Type: text/plain

signed text
--s
Content-Type: application/pgp-signature
Content-Disposition: attachment; filename=signature.asc

-----BEGIN PGP SIGNATURE-----
--s--
"#;
    let email = parsemail::parse_bytes(raw).unwrap();
    assert_eq!(email.text_body, "signed text");
    assert_eq!(email.attachments[0].filename, "signature.asc");
}

#[test]
fn test_address_list_with_unsupported_charset() {
    let raw = "To: a@x.com,=?x-unknown?q?NAME?= <b@x.com>\nCc: a@x.com,=?utf-8?q?NAME?= <b@x.com>\n\nbody";
    let email = parsemail::parse_bytes(raw).unwrap();

    assert_eq!(email.to.len(), 2);
    assert_eq!(email.to[0].address, "a@x.com");
    assert_eq!(email.to[1].name, rfc2047::UNSUPPORTED_ENCODER);
    assert_eq!(email.to[1].address, "b@x.com");

    assert_eq!(email.cc.len(), 2);
    assert_eq!(email.cc[1].name, "NAME");
}

#[test]
fn test_unknown_transfer_encoding_is_fatal() {
    let raw = "Content-Type: text/plain\nContent-Transfer-Encoding: x-uuencode\n\nbody";
    let err = parsemail::parse_bytes(raw).unwrap_err();
    assert_eq!(err.to_string(), "unknown encoding: x-uuencode");
}

#[test]
fn test_unknown_nested_type_is_fatal() {
    let raw = "Content-Type: multipart/mixed; boundary=m\n\n--m\nContent-Type: application/x-foo\n\ndata\n--m--\n";
    let err = parsemail::parse_bytes(raw).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Can't process multipart/mixed inner mime type: application/x-foo"
    );
}

#[test]
fn test_unterminated_multipart_is_fatal() {
    let raw = "Content-Type: multipart/mixed; boundary=m\n\n--m\nContent-Type: text/plain\n\ncut off";
    let err = parsemail::parse_bytes(raw).unwrap_err();
    assert!(matches!(err, Error::InvalidMultipart(_)));
}

fn nested_message(levels: usize) -> String {
    let mut body = "Content-Type: text/plain\n\ncore\n".to_string();
    for level in (0..levels).rev() {
        body = format!(
            "Content-Type: multipart/mixed; boundary=b{level}\n\n--b{level}\n{body}--b{level}--\n"
        );
    }
    body
}

#[test]
fn test_nesting_limit() {
    let raw = nested_message(5);

    let email = Parser::new(Config::builder().max_depth(5).build())
        .parse_bytes(raw.clone())
        .unwrap();
    assert_eq!(email.text_body, "core");

    let err = Parser::new(Config::builder().max_depth(4).build())
        .parse_bytes(raw)
        .unwrap_err();
    assert!(matches!(err, Error::NestingTooDeep(4)));
}

#[test]
fn test_default_nesting_limit_fails_closed() {
    let err = parsemail::parse_bytes(nested_message(100)).unwrap_err();
    assert!(matches!(err, Error::NestingTooDeep(32)));
}

#[test]
fn test_header_error_is_deferred_behind_body_error() {
    let bad_body = "From: not an address\nContent-Type: multipart/mixed\n\nbody";
    let err = parsemail::parse_bytes(bad_body).unwrap_err();
    assert!(matches!(err, Error::MissingBoundary(_)));

    let good_body = "From: not an address\n\nbody";
    let err = parsemail::parse_bytes(good_body).unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)));
}

#[test]
fn test_attachment_stream_is_single_consumption() {
    let email = parsemail::parse_bytes(TEXT_PLAIN_ATTACHMENT_IN_MULTIPART).unwrap();
    let mut data = email.attachments.into_iter().next().unwrap().data;

    let mut first = String::new();
    data.read_to_string(&mut first).unwrap();
    assert_eq!(first, "attachment text part");

    let mut second = String::new();
    data.read_to_string(&mut second).unwrap();
    assert!(second.is_empty());
}

#[test]
fn test_extended_filename_and_encoded_name() {
    let raw = r#"Content-Type: multipart/mixed; boundary=m

--m
Content-Type: text/plain
Content-Disposition: attachment; filename*=UTF-8''%E2%82%AC%20rates.txt

1
--m
Content-Type: application/octet-stream; name="=?utf-8?b?w6l0w6kuYmlu?="
Content-Disposition: attachment

2
--m--
"#;
    let email = parsemail::parse_bytes(raw).unwrap();
    assert_eq!(email.attachments.len(), 2);
    assert_eq!(email.attachments[0].filename, "€ rates.txt");
    assert_eq!(email.attachments[1].filename, "été.bin");
}

#[test]
fn test_charset_transcoding() {
    let raw = b"Content-Type: text/plain; charset=iso-8859-1\n\
Content-Transfer-Encoding: quoted-printable\n\
\n\
caf=E9 cr=E8me\n";
    let email = parsemail::parse_bytes(&raw[..]).unwrap();
    assert_eq!(email.text_body, "café crème");
}

#[test]
fn test_quoted_printable_keeps_lf_line_endings() {
    let raw = "Content-Type: multipart/mixed; boundary=q\n\
\n\
--q\n\
Content-Type: text/plain\n\
Content-Transfer-Encoding: quoted-printable\n\
\n\
line1\n\
line=\n\
2\n\
\n\
--q\n\
Content-Type: text/csv\n\
Content-Disposition: attachment; filename=t.csv\n\
Content-Transfer-Encoding: quoted-printable\n\
\n\
a,b\n\
c,d\n\
--q--\n";
    let email = parsemail::parse_bytes(raw).unwrap();
    assert_eq!(email.text_body, "line1\nline2");

    let attachment = email.attachments.into_iter().next().unwrap();
    assert_eq!(attachment.data.into_vec().unwrap(), b"a,b\nc,d");
}

#[test]
fn test_quoted_printable_matches_7bit_line_endings() {
    for encoding in ["7bit", "quoted-printable"] {
        let raw = format!(
            "Content-Type: text/plain\r\nContent-Transfer-Encoding: {encoding}\r\n\r\none\r\ntwo\r\n"
        );
        let email = parsemail::parse_bytes(raw).unwrap();
        assert_eq!(email.text_body, "one\r\ntwo", "{encoding}");
    }
}

#[test]
fn test_html_meta_charset_without_parameter() {
    let raw = b"Content-Type: text/html\r\n\
\r\n\
<meta charset=\"koi8-r\"><p>\xf0\xd2\xc9\xd7\xc5\xd4</p>\r\n";
    let email = parsemail::parse_bytes(&raw[..]).unwrap();
    assert_eq!(email.html_body, "<meta charset=\"koi8-r\"><p>Привет</p>");

    // A declared parameter wins over the document.
    let raw = b"Content-Type: text/html; charset=windows-1251\r\n\
\r\n\
<meta charset=\"koi8-r\"><p>\xcf\xf0\xe8\xe2\xe5\xf2</p>\r\n";
    let email = parsemail::parse_bytes(&raw[..]).unwrap();
    assert_eq!(email.html_body, "<meta charset=\"koi8-r\"><p>Привет</p>");
}

#[test]
fn test_file_content_types_keep_declared_spelling() {
    let raw = "Content-Type: multipart/related; boundary=r\r\n\
\r\n\
--r\r\n\
Content-Type: text/html\r\n\
\r\n\
<img src=\"cid:logo\">\r\n\
--r\r\n\
Content-Type: Image/PNG; name=logo.png\r\n\
Content-ID: <logo>\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw==\r\n\
--r--\r\n";
    let email = parsemail::parse_bytes(raw).unwrap();
    assert_eq!(email.embedded_files[0].cid, "logo");
    assert_eq!(email.embedded_files[0].content_type, "Image/PNG");

    let raw = "Content-Type: multipart/mixed; boundary=m\r\n\
\r\n\
--m\r\n\
Content-Type: Application/PDF;name=a.pdf\r\n\
Content-Disposition: attachment\r\n\
\r\n\
%PDF\r\n\
--m--\r\n";
    let email = parsemail::parse_bytes(raw).unwrap();
    assert_eq!(email.attachments[0].filename, "a.pdf");
    assert_eq!(email.attachments[0].content_type, "Application/PDF");
}
