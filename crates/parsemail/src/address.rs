//! RFC 5322 address and address-list parsing.
//!
//! Groups are flattened into their member mailboxes. Display-name atoms that
//! are encoded words are decoded; adjacent encoded words join without the
//! whitespace between them.

use crate::error::{Error, Result};
use crate::rfc2047;
use std::fmt;

/// A single mailbox: optional display name plus the mail address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Address {
    /// Decoded display name, empty when absent.
    pub name: String,
    /// Mail address (`local@domain`).
    pub address: String,
}

impl Address {
    /// Creates an address.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<{}>", self.address)
        } else {
            let name = self.name.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "\"{name}\" <{}>", self.address)
        }
    }
}

/// Parses a single address.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the input is not exactly one mailbox.
pub fn parse_one(input: &str) -> Result<Address> {
    let mut parser = AddrParser::new(input);
    let mut addrs = parser.address(false)?;
    parser.skip_cfws()?;
    if !parser.is_empty() {
        return Err(parser.error("expected single address"));
    }
    addrs
        .pop()
        .ok_or_else(|| Error::InvalidAddress(format!("no address in {input:?}")))
}

/// Parses a comma-separated address list.
///
/// Empty list entries (`a@x, , b@y`) are skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] on any malformed entry.
pub fn parse_list(input: &str) -> Result<Vec<Address>> {
    let mut parser = AddrParser::new(input);
    let mut list = Vec::new();

    loop {
        parser.skip_space();
        if parser.consume(',') {
            continue;
        }
        list.extend(parser.address(true)?);
        parser.skip_cfws()?;
        if parser.is_empty() {
            break;
        }
        if !parser.consume(',') {
            return Err(parser.error("expected comma"));
        }
        loop {
            parser.skip_space();
            if !parser.consume(',') {
                break;
            }
        }
        if parser.is_empty() {
            break;
        }
    }

    Ok(list)
}

struct AddrParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> AddrParser<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn consume(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, what: &str) -> Error {
        Error::InvalidAddress(format!("{what} at {:?}", self.rest()))
    }

    fn skip_space(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.pos += 1;
        }
    }

    /// Skips folding whitespace and comments.
    fn skip_cfws(&mut self) -> Result<()> {
        loop {
            self.skip_space();
            if self.peek() != Some('(') {
                return Ok(());
            }
            self.comment()?;
        }
    }

    /// Parses one address; a group yields all of its members.
    fn address(&mut self, allow_group: bool) -> Result<Vec<Address>> {
        self.skip_space();

        let start = self.pos;
        if let Ok(spec) = self.addr_spec() {
            self.skip_space();
            let name = if self.peek() == Some('(') {
                rfc2047::decode_sentence(self.comment()?.trim())
            } else {
                String::new()
            };
            return Ok(vec![Address::new(name, spec)]);
        }
        self.pos = start;

        let name = if self.peek() == Some('<') {
            String::new()
        } else {
            self.phrase()?
        };
        self.skip_cfws()?;

        if allow_group && self.consume(':') {
            return self.group_members();
        }
        if !self.consume('<') {
            return Err(self.error("no angle-addr"));
        }
        self.skip_route()?;
        let spec = self.addr_spec()?;
        if !self.consume('>') {
            return Err(self.error("unclosed angle-addr"));
        }
        Ok(vec![Address::new(name, spec)])
    }

    /// Parses `member, member;` after a group's colon.
    fn group_members(&mut self) -> Result<Vec<Address>> {
        let mut members = Vec::new();
        self.skip_cfws()?;
        if self.consume(';') {
            return Ok(members);
        }
        loop {
            members.extend(self.address(false)?);
            self.skip_cfws()?;
            if self.consume(';') {
                return Ok(members);
            }
            if !self.consume(',') {
                return Err(self.error("expected comma in group"));
            }
            self.skip_cfws()?;
        }
    }

    /// Skips an obsolete source route (`@a,@b:`) inside angle brackets.
    fn skip_route(&mut self) -> Result<()> {
        if self.peek() != Some('@') {
            return Ok(());
        }
        match self.rest().find(':') {
            Some(colon) => {
                self.pos += colon + 1;
                Ok(())
            }
            None => Err(self.error("unterminated route")),
        }
    }

    /// Parses `local-part@domain`.
    fn addr_spec(&mut self) -> Result<String> {
        let local = if self.peek() == Some('"') {
            self.quoted_string()?
        } else {
            self.dot_atom()?
        };
        if !self.consume('@') {
            return Err(self.error("missing @ in addr-spec"));
        }
        self.skip_space();
        let domain = if self.peek() == Some('[') {
            self.domain_literal()?
        } else {
            self.dot_atom()?
        };
        Ok(format!("{local}@{domain}"))
    }

    fn dot_atom(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_atext(c) && c != '.' {
                break;
            }
            self.pos += c.len_utf8();
        }
        let atom = &self.input[start..self.pos];
        if atom.is_empty() {
            return Err(self.error("expected atom"));
        }
        Ok(atom.to_string())
    }

    fn domain_literal(&mut self) -> Result<String> {
        let end = self
            .rest()
            .find(']')
            .ok_or_else(|| self.error("unclosed domain literal"))?;
        let literal = &self.rest()[..=end];
        self.pos += end + 1;
        Ok(literal.to_string())
    }

    fn quoted_string(&mut self) -> Result<String> {
        self.consume('"');
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unclosed quoted-string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(self.error("unclosed quoted-string")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    /// Returns the body of a (possibly nested) comment.
    fn comment(&mut self) -> Result<String> {
        self.consume('(');
        let mut depth = 1;
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    if let Some(escaped) = self.bump() {
                        out.push(escaped);
                    }
                    continue;
                }
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                }
                _ => {}
            }
            out.push(c);
        }
        Err(self.error("unclosed comment"))
    }

    /// Parses a display-name phrase.
    fn phrase(&mut self) -> Result<String> {
        let mut words: Vec<String> = Vec::new();
        let mut prev_encoded = false;

        loop {
            self.skip_cfws()?;
            let (word, encoded) = match self.peek() {
                Some('"') => {
                    let text = self.quoted_string()?;
                    (rfc2047::decode_word(&text).unwrap_or(text), false)
                }
                Some(c) if is_atext(c) || c == '.' => {
                    let atom = self.dot_atom()?;
                    match rfc2047::decode_word(&atom) {
                        Some(decoded) => (decoded, true),
                        None => (atom, false),
                    }
                }
                _ => break,
            };

            match words.last_mut() {
                Some(last) if prev_encoded && encoded => last.push_str(&word),
                _ => words.push(word),
            }
            prev_encoded = encoded;
        }

        if words.is_empty() {
            return Err(self.error("empty display name"));
        }
        Ok(words.join(" "))
    }
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || !c.is_ascii() || "!#$%&'*+-/=?^_`{|}~".contains(c)
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
    fn test_bare_addr_spec() {
        let addr = parse_one("john@example.com").unwrap();
        assert_eq!(addr, Address::new("", "john@example.com"));
    }

    #[test]
    fn test_name_addr() {
        let addr = parse_one("John Doe <john@example.com>").unwrap();
        assert_eq!(addr.name, "John Doe");
        assert_eq!(addr.address, "john@example.com");

        let addr = parse_one("\"Doe, John\" <john@example.com>").unwrap();
        assert_eq!(addr.name, "Doe, John");

        let addr = parse_one("<john@example.com>").unwrap();
        assert_eq!(addr.name, "");
    }

    #[test]
    fn test_trailing_comment_is_name() {
        let addr = parse_one("john@example.com (John Doe)").unwrap();
        assert_eq!(addr.name, "John Doe");
        assert_eq!(addr.address, "john@example.com");
    }

    #[test]
    fn test_comments_are_skipped() {
        let addr = parse_one("John (the man) Doe <john@example.com> (work)").unwrap();
        assert_eq!(addr.name, "John Doe");
    }

    #[test]
    fn test_quoted_local_part_and_literal() {
        let addr = parse_one("\"john smith\"@[192.168.0.1]").unwrap();
        assert_eq!(addr.address, "john smith@[192.168.0.1]");
    }

    #[test]
    fn test_route_is_dropped() {
        let addr = parse_one("Joe <@relay.example,@other.example:joe@example.com>").unwrap();
        assert_eq!(addr.address, "joe@example.com");
    }

    #[test]
    fn test_encoded_display_name() {
        let addr = parse_one("=?utf-8?q?J=C3=B6rg?= <jorg@example.com>").unwrap();
        assert_eq!(addr.name, "Jörg");

        let addr = parse_one("=?utf-8?q?J=C3=B6?= =?utf-8?q?rg?= Doe <jorg@example.com>").unwrap();
        assert_eq!(addr.name, "Jörg Doe");
    }

    #[test]
    fn test_parse_list() {
        let list = parse_list("a@x.com,NAME <b@x.com>").unwrap();
        assert_eq!(
            list,
            vec![Address::new("", "a@x.com"), Address::new("NAME", "b@x.com")]
        );
    }

    #[test]
    fn test_parse_list_empty_entries() {
        let list = parse_list("a@x.com, , b@x.com,").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_group_is_flattened() {
        let list = parse_list("c@x.com, Team: a@x.com, Bee <b@x.com>;").unwrap();
        let addrs: Vec<_> = list.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(addrs, ["c@x.com", "a@x.com", "b@x.com"]);
        assert_eq!(list[2].name, "Bee");

        assert!(parse_list("undisclosed-recipients:;").unwrap().is_empty());
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(parse_one("no-at-sign"), Err(Error::InvalidAddress(_))));
        assert!(parse_one("Name <a@x.com").is_err());
        assert!(parse_one("a@x.com, b@x.com").is_err());
        assert!(parse_list("a@x.com b@x.com").is_err());
        assert!(parse_list("").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::new("", "a@x.com").to_string(), "<a@x.com>");
        assert_eq!(
            Address::new("Say \"hi\"", "a@x.com").to_string(),
            "\"Say \\\"hi\\\"\" <a@x.com>"
        );
    }
}
