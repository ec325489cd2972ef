/*
 * vPEC certified mail agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

use std::ops::{Deref, DerefMut};

/// Header of an email.
/// <https://www.rfc-editor.org/rfc/rfc5322#section-2.2>
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Header {
    pub name: String,
    /// Raw value, leading whitespace and CRLF included. Folded values keep
    /// their inner CRLF + WSP sequences so the header serializes back to the
    /// exact bytes it was read from.
    pub body: String,
}

impl Header {
    /// Create a new header. The `\r\n` terminator is added to the value.
    pub fn new(name: impl Into<String>, body: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            body: format!(" {}\r\n", body.as_ref()),
        }
    }

    /// Create a new header from an already terminated raw value.
    pub fn new_unchecked(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Value with surrounding whitespace and CRLF removed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.body.trim()
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.body)
    }
}

/// List of top-level headers.
/// `Vec` instead of a map: header ordering is mandatory, and `Received:`
/// trace fields must be preserved in order.
/// <https://www.rfc-editor.org/rfc/rfc5322#section-3.6>
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Headers(pub Vec<Header>);

impl From<Vec<Header>> for Headers {
    fn from(value: Vec<Header>) -> Self {
        Self(value)
    }
}

impl Deref for Headers {
    type Target = Vec<Header>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Headers {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl std::fmt::Display for Headers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for h in &self.0 {
            write!(f, "{h}")?;
        }
        Ok(())
    }
}

/// Read the current line or folded content and extract a header if there is
/// any.
///
/// The slice is advanced past any folded continuation lines.
pub fn read_header<C: AsRef<str>>(content: &mut &[C]) -> Option<(String, String)> {
    let line = content[0].as_ref();

    // A line starting with WSP here would be a continuation without a
    // preceding header: not a header.
    if line.starts_with([' ', '\t']) {
        return None;
    }

    let mut split = line.splitn(2, ':');

    match (split.next(), split.next()) {
        (Some(name), Some(body)) if !name.is_empty() && !name.contains(' ') => {
            let folded_body = content[1..]
                .iter()
                .take_while(|line| line.as_ref().starts_with([' ', '\t']))
                .map(|line| {
                    *content = &content[1..];
                    line.as_ref()
                })
                .collect::<Vec<&str>>()
                .join("");

            Some((
                name.trim().into(),
                if folded_body.is_empty() {
                    body.to_string()
                } else {
                    format!("{body}{folded_body}")
                },
            ))
        }
        _ => None,
    }
}
