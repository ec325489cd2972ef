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

use crate::mail::Mail;

use super::Mime;

/// Content of a mime entity.
/// <https://www.rfc-editor.org/rfc/rfc2045#section-5>
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Part {
    /// Text content.
    Text(Vec<String>),
    /// HTML content.
    Html(Vec<String>),
    /// Anything that is neither text nor HTML, kept as opaque lines.
    /// Includes base64 transfer-encoded content and verbatim `message/rfc822`
    /// attachments built from raw bytes.
    Binary(Vec<String>),
    /// A parsed embedded message.
    Message(Box<Mail>),
    /// Boundary separated sub-entities.
    Multipart(Multipart),
}

/// Boundary separated parts.
/// <https://www.rfc-editor.org/rfc/rfc2046#section-5>
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Multipart {
    /// Lines before the first delimiter.
    pub preamble: Vec<String>,
    ///
    pub parts: Vec<Mime>,
    /// Lines after the closing delimiter.
    pub epilogue: Vec<String>,
}

/// Wire rendering of a multipart, boundary supplied by the enclosing
/// entity's Content-Type.
pub(crate) struct MultipartWire<'a> {
    pub(crate) inner: &'a Multipart,
    pub(crate) boundary: &'a str,
}

impl<'a> std::fmt::Display for MultipartWire<'a> {
    //  preamble
    //  *{ --boundary \r\n headers \r\n body }
    //  --boundary-- \r\n
    //  epilogue
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.inner.preamble {
            f.write_str(line)?;
        }

        for part in &self.inner.parts {
            f.write_fmt(format_args!("--{}\r\n", self.boundary))?;
            f.write_fmt(format_args!("{part}"))?;
        }

        f.write_fmt(format_args!("--{}--\r\n", self.boundary))?;

        for line in &self.inner.epilogue {
            f.write_str(line)?;
        }

        Ok(())
    }
}
