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

use crate::mime::parts::MultipartWire;

/// Mime headers definition.
pub mod headers;
pub use headers::{Arg, Header};

/// Mime parts definition.
pub mod parts;
pub use parts::{Multipart, Part};

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const CONTENT_DISPOSITION_HEADER: &str = "Content-Disposition";
pub const CONTENT_TRANSFER_ENCODING_HEADER: &str = "Content-Transfer-Encoding";
pub const MIME_VERSION_HEADER: &str = "MIME-Version";

/// A mime entity: its header block and its content.
/// <https://www.rfc-editor.org/rfc/rfc2045>
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Mime {
    /// Mime part headers.
    pub headers: Vec<Header>,
    /// Content of the mime part.
    pub part: Part,
}

impl Mime {
    /// Find a header of this entity by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Media type of the entity as a `(type, subtype)` pair.
    #[must_use]
    pub fn media_type(&self) -> Option<(&str, &str)> {
        self.header(CONTENT_TYPE_HEADER)
            .and_then(|content_type| content_type.body().split_once('/'))
            .map(|(t, subtype)| (t, subtype.trim()))
    }

    /// Extract the boundary from the Content-Type header field if the
    /// entity is multipart.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.header(CONTENT_TYPE_HEADER)
            .and_then(|header| header.arg("boundary").map(headers::Arg::value))
    }

    /// Content-Transfer-Encoding of the entity, trimmed and lowercased by
    /// the caller if needed.
    #[must_use]
    pub fn transfer_encoding(&self) -> Option<&str> {
        self.header(CONTENT_TRANSFER_ENCODING_HEADER)
            .map(headers::Header::body)
    }

    /// Attachment file name, from Content-Disposition or the legacy
    /// Content-Type `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.header(CONTENT_DISPOSITION_HEADER)
            .and_then(|h| h.arg("filename").map(headers::Arg::value))
            .or_else(|| {
                self.header(CONTENT_TYPE_HEADER)
                    .and_then(|h| h.arg("name").map(headers::Arg::value))
            })
    }

    /// Check if the current entity is an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.header(CONTENT_DISPOSITION_HEADER)
            .map_or(false, |h| h.body().eq_ignore_ascii_case("attachment"))
    }

    /// Raw content of the entity as a string, headers excluded.
    /// For transfer-encoded parts this is the still-encoded content.
    #[must_use]
    pub fn body_raw(&self) -> String {
        match &self.part {
            Part::Text(lines) | Part::Html(lines) | Part::Binary(lines) => lines.concat(),
            Part::Message(mail) => mail.to_string(),
            Part::Multipart(_) => self.to_string_without_headers(),
        }
    }

    /// Find the first entity satisfying `pred`, depth first, `self`
    /// included.
    ///
    /// Embedded `message/rfc822` parts are not descended into: their inner
    /// structure belongs to the attached message, not to this one.
    #[must_use]
    pub fn find(&self, pred: &impl Fn(&Self) -> bool) -> Option<&Self> {
        if pred(self) {
            return Some(self);
        }

        match &self.part {
            Part::Multipart(multipart) => multipart.parts.iter().find_map(|part| part.find(pred)),
            _ => None,
        }
    }

    /// Serialize the content without the header block nor the separation
    /// line, as laid out on the wire.
    #[must_use]
    pub fn to_string_without_headers(&self) -> String {
        match &self.part {
            Part::Text(lines) | Part::Html(lines) | Part::Binary(lines) => lines.concat(),
            Part::Message(mail) => mail.to_string(),
            Part::Multipart(multipart) => MultipartWire {
                inner: multipart,
                boundary: self.boundary().unwrap_or_default(),
            }
            .to_string(),
        }
    }
}

impl std::fmt::Display for Mime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for header in &self.headers {
            write!(f, "{header}")?;
        }

        f.write_str("\r\n")?;
        f.write_str(&self.to_string_without_headers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn media_type_and_args() {
        let header = Header::new_unchecked(
            CONTENT_TYPE_HEADER.to_string(),
            " application/xml".to_string(),
            vec![Arg::from_str(" name=\"daticert.xml\"").unwrap()],
        );
        let mime = Mime {
            headers: vec![header],
            part: Part::Binary(vec![]),
        };

        assert_eq!(mime.media_type(), Some(("application", "xml")));
        assert_eq!(mime.filename(), Some("daticert.xml"));
        assert_eq!(mime.boundary(), None);
    }
}
