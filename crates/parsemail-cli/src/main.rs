//! Command-line email decomposer.
//!
//! Parses a message from a file or stdin and prints a JSON report.
//!
//! # Usage
//!
//! ```bash
//! # Report on a message file
//! parsemail message.eml
//!
//! # Read from stdin and keep header values undecoded
//! cat message.eml | parsemail --raw-headers
//!
//! # Write attachments and embedded files into a directory
//! parsemail message.eml --save-attachments out/
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parsemail::{Address, Config, Data, Email};

#[derive(Parser)]
#[command(name = "parsemail")]
#[command(about = "Decompose an email message into a JSON report", long_about = None)]
struct Cli {
    /// Message file to parse (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Maximum multipart nesting depth
    #[arg(long, default_value_t = parsemail::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Report header values without decoding encoded words
    #[arg(long)]
    raw_headers: bool,

    /// Directory to write attachments and embedded files into
    #[arg(long, value_name = "DIR")]
    save_attachments: Option<PathBuf>,
}

/// JSON report printed on stdout.
#[derive(Serialize)]
struct Report {
    subject: String,
    from: Vec<Address>,
    sender: Option<Address>,
    reply_to: Vec<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    date: Option<String>,
    message_id: String,
    in_reply_to: Vec<String>,
    references: Vec<String>,
    resent_from: Vec<Address>,
    resent_sender: Option<Address>,
    resent_to: Vec<Address>,
    resent_cc: Vec<Address>,
    resent_bcc: Vec<Address>,
    resent_date: Option<String>,
    resent_message_id: String,
    content_type: String,
    content_size: Option<usize>,
    text_body: String,
    html_body: String,
    attachments: Vec<FileReport>,
    embedded_files: Vec<FileReport>,
    headers: Vec<(String, String)>,
}

/// Attachment or embedded file descriptor.
#[derive(Serialize)]
struct FileReport {
    name: String,
    content_type: String,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parsemail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::builder()
        .max_depth(cli.max_depth)
        .decode_headers(!cli.raw_headers)
        .build();
    let parser = parsemail::Parser::new(config);

    let email = match &cli.file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            parser
                .parse(BufReader::new(file))
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => parser
            .parse(io::stdin().lock())
            .context("failed to parse message from stdin")?,
    };
    info!(
        attachments = email.attachments.len(),
        embedded_files = email.embedded_files.len(),
        "parsed message"
    );

    if let Some(dir) = &cli.save_attachments {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let report = build_report(email, cli.save_attachments.as_deref())?;
    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
    println!("{json}");
    Ok(())
}

fn build_report(email: Email, save_dir: Option<&Path>) -> Result<Report> {
    let Email {
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
        content_type,
        content,
        text_body,
        html_body,
        attachments,
        embedded_files,
    } = email;

    let content_size = content
        .map(|data| data.into_vec().map(|bytes| bytes.len()))
        .transpose()
        .context("failed to decode message content")?;

    let mut attachment_reports = Vec::with_capacity(attachments.len());
    for (index, attachment) in attachments.into_iter().enumerate() {
        let fallback = format!("attachment-{index}");
        attachment_reports.push(describe_file(
            attachment.filename,
            &fallback,
            attachment.content_type,
            attachment.data,
            save_dir,
        )?);
    }

    let mut embedded_reports = Vec::with_capacity(embedded_files.len());
    for (index, embedded) in embedded_files.into_iter().enumerate() {
        let fallback = format!("embedded-{index}");
        embedded_reports.push(describe_file(
            embedded.cid,
            &fallback,
            embedded.content_type,
            embedded.data,
            save_dir,
        )?);
    }

    Ok(Report {
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        date: date.map(|d| d.to_rfc2822()),
        message_id,
        in_reply_to,
        references,
        resent_from,
        resent_sender,
        resent_to,
        resent_cc,
        resent_bcc,
        resent_date: resent_date.map(|d| d.to_rfc2822()),
        resent_message_id,
        content_type,
        content_size,
        text_body,
        html_body,
        attachments: attachment_reports,
        embedded_files: embedded_reports,
        headers: headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    })
}

/// Drains a data stream, optionally writing it into `save_dir`.
fn describe_file(
    name: String,
    fallback: &str,
    content_type: String,
    data: Data,
    save_dir: Option<&Path>,
) -> Result<FileReport> {
    let bytes = data
        .into_vec()
        .with_context(|| format!("failed to decode {name:?}"))?;

    let saved_to = match save_dir {
        Some(dir) => {
            let path = dir.join(sanitize(&name, fallback));
            fs::write(&path, &bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            debug!(path = %path.display(), size = bytes.len(), "saved file");
            Some(path)
        }
        None => None,
    };

    Ok(FileReport {
        name,
        content_type,
        size: bytes.len(),
        saved_to,
    })
}

/// Reduces a name to a single safe path component.
fn sanitize(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("report.pdf", "x"), "report.pdf");
        assert_eq!(sanitize("../etc/passwd", "x"), "_etc_passwd");
        assert_eq!(sanitize("", "attachment-0"), "attachment-0");
        assert_eq!(sanitize("..", "embedded-1"), "embedded-1");
    }

    #[test]
    fn test_build_report() {
        let raw = "From: Alice <alice@example.com>\r\n\
Subject: hi\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
body\r\n\
--b\r\n\
Content-Type: text/csv\r\n\
Content-Disposition: attachment; filename=a.csv\r\n\
\r\n\
1,2\r\n\
--b--\r\n";
        let email = parsemail::parse_bytes(raw).unwrap();
        let report = build_report(email, None).unwrap();

        assert_eq!(report.subject, "hi");
        assert_eq!(report.text_body, "body");
        assert_eq!(report.attachments.len(), 1);
        assert_eq!(report.attachments[0].name, "a.csv");
        assert_eq!(report.attachments[0].size, 3);
        assert!(report.attachments[0].saved_to.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["from"][0]["address"], "alice@example.com");
    }
}
