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

//! Definition of an email data structure.

use crate::mime::{self, Mime};
use crate::{ParserError, ParserResult};

use self::{
    body::Body,
    headers::{Header, Headers},
};

/// Body definition of an email.
pub mod body;
/// Headers definition of an email.
pub mod headers;

pub const FROM_HEADER: &str = "From";
pub const TO_HEADER: &str = "To";
pub const CC_HEADER: &str = "Cc";
pub const BCC_HEADER: &str = "Bcc";
pub const DATE_HEADER: &str = "Date";
pub const SUBJECT_HEADER: &str = "Subject";
pub const MESSAGE_ID_HEADER: &str = "Message-ID";
pub const RECEIVED_HEADER: &str = "Received";
pub const REPLY_TO_HEADER: &str = "Reply-To";
pub const RETURN_PATH_HEADER: &str = "Return-Path";

/// Internet Message Format representation.
///
/// `Display` is the wire format: a parsed message serializes back to the
/// exact bytes it was read from, and a constructed message serializes to the
/// exact bytes handed to the signer.
#[derive(Clone, Default, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Mail {
    /// Message headers.
    pub headers: Headers,
    /// Message body content.
    pub body: Body,
}

impl TryFrom<&[u8]> for Mail {
    type Error = ParserError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        crate::parsing::Parser::default().parse(value)
    }
}

impl TryFrom<&str> for Mail {
    type Error = ParserError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        crate::parsing::Parser::default().parse(value.as_bytes())
    }
}

impl Mail {
    /// Assemble a message from a header section and a mime body.
    ///
    /// The mime headers of `body` (Content-Type, ...) are appended to the
    /// top-level header section, where they belong on the wire; the body
    /// keeps its own copy so that boundary lookups keep working.
    #[must_use]
    pub fn from_parts(headers: impl IntoIterator<Item = Header>, body: Mime) -> Self {
        let mut headers = Headers(headers.into_iter().collect());
        for mime_header in &body.headers {
            headers.push(Header::new_unchecked(
                mime_header.name.clone(),
                mime_header.raw_body(),
            ));
        }

        Self {
            headers,
            body: Body::Mime(Box::new(body)),
        }
    }

    /// Get a mutable reference on the mime body, parsing it first if it has
    /// not been parsed yet.
    ///
    /// # Errors
    ///
    /// * The body is empty.
    /// * Failed to parse the body.
    pub fn body_mut(&mut self) -> ParserResult<&mut Body> {
        crate::parsing::Parser::default().parse_body_of(self)
    }

    /// Get the parsed mime tree, parsing the body on the way if needed.
    ///
    /// # Errors
    ///
    /// * The body failed to parse or carries no mime structure.
    pub fn mime_mut(&mut self) -> ParserResult<&mut Mime> {
        match self.body_mut()? {
            Body::Mime(mime) => Ok(mime),
            _ => Err(ParserError::InvalidMail(
                "message does not carry a mime body".to_string(),
            )),
        }
    }

    /// Find the first mime part satisfying a predicate, depth first.
    /// Parses the body if it has not been parsed yet.
    pub fn find_part(&mut self, pred: impl Fn(&Mime) -> bool) -> ParserResult<Option<&Mime>> {
        Ok(match self.body_mut()? {
            Body::Mime(mime) => mime.find(&pred),
            _ => None,
        })
    }

    /// Get the first header which name matches the argument.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&Header> {
        self.headers
            .0
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
    }

    /// Get the trimmed value of the first header matching `name`.
    #[must_use]
    pub fn get_header_value(&self, name: &str) -> Option<&str> {
        self.get_header(name).map(Header::value)
    }

    /// Get every header matching `name`, in order of appearance.
    pub fn get_headers<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Header> {
        self.headers
            .iter()
            .filter(|header| header.name.eq_ignore_ascii_case(name))
    }

    /// Count the occurrences of a header.
    #[must_use]
    pub fn count_header(&self, name: &str) -> usize {
        self.get_headers(name).count()
    }

    /// Set a header to a new value or push it to the header section.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some(Header { body, .. }) = self
            .headers
            .0
            .iter_mut()
            .find(|header| header.name.eq_ignore_ascii_case(name))
        {
            *body = format!(" {value}\r\n");
        } else {
            self.headers.push(Header::new(name, value));
        }
    }

    /// Prepend headers to the header section.
    pub fn prepend_headers(&mut self, headers: impl IntoIterator<Item = Header>) {
        self.headers.splice(..0, headers);
    }

    /// Append headers to the header section.
    pub fn append_headers(&mut self, headers: impl IntoIterator<Item = Header>) {
        self.headers.extend(headers);
    }

    /// Remove the first header matching `name`.
    pub fn remove_header(&mut self, name: &str) -> bool {
        if let Some(index) = self
            .headers
            .0
            .iter()
            .position(|header| header.name.eq_ignore_ascii_case(name))
        {
            self.headers.remove(index);
            true
        } else {
            false
        }
    }

    /// Serialize to wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl std::fmt::Display for Mail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.headers)?;

        if !matches!(self.body, Body::Empty) {
            f.write_str("\r\n")?;
        }

        write!(f, "{}", self.body)
    }
}

/// Check whether a header belongs to the mime header group.
/// See rfc2045 p.9, Additional MIME Header Fields.
#[inline]
#[must_use]
pub fn is_mime_header(name: &str) -> bool {
    const MIME_HEADER_START: &str = "Content-";
    name.get(..MIME_HEADER_START.len())
        .map_or(false, |name| name.eq_ignore_ascii_case(MIME_HEADER_START))
        || name.eq_ignore_ascii_case(mime::MIME_VERSION_HEADER)
}
