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

//! Construction of mime entities.
//!
//! Artifacts are signed over their serialized bytes, so everything built
//! here uses the same lines-ending-in-CRLF representation as the parser:
//! serialization is a plain concatenation, there is no re-encoding pass
//! that could change the bytes after signing.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::mime::{
    headers::Arg, Header, Mime, Multipart, Part, CONTENT_DISPOSITION_HEADER,
    CONTENT_TRANSFER_ENCODING_HEADER, CONTENT_TYPE_HEADER,
};
use crate::{ParserError, ParserResult};

const BASE64_LINE_LENGTH: usize = 76;

/// Disposition of an attached entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

/// Generate a fresh multipart boundary.
#[must_use]
pub fn boundary() -> String {
    format!("----=_Part_{}", uuid::Uuid::new_v4().simple())
}

/// Cut a text into CRLF terminated lines, the last one included.
#[must_use]
pub fn content_lines(content: &str) -> Vec<String> {
    let mut segments = content.split('\n').collect::<Vec<_>>();
    if segments.last() == Some(&"") {
        segments.pop();
    }

    segments
        .into_iter()
        .map(|line| format!("{}\r\n", line.trim_end_matches('\r')))
        .collect()
}

/// `text/plain; charset=utf-8` entity.
#[must_use]
pub fn text_part(content: &str) -> Mime {
    Mime {
        headers: vec![
            Header::new(
                CONTENT_TYPE_HEADER,
                "text/plain",
                vec![Arg::unquoted("charset", "utf-8")],
            ),
            Header::new(CONTENT_TRANSFER_ENCODING_HEADER, "8bit", vec![]),
        ],
        part: Part::Text(content_lines(content)),
    }
}

/// `text/html; charset=utf-8` entity.
#[must_use]
pub fn html_part(content: &str) -> Mime {
    Mime {
        headers: vec![
            Header::new(
                CONTENT_TYPE_HEADER,
                "text/html",
                vec![Arg::unquoted("charset", "utf-8")],
            ),
            Header::new(CONTENT_TRANSFER_ENCODING_HEADER, "8bit", vec![]),
        ],
        part: Part::Html(content_lines(content)),
    }
}

/// Base64 transfer-encoded attachment, lines wrapped at 76 characters.
#[must_use]
pub fn base64_attachment(
    content_type: &str,
    filename: &str,
    disposition: Disposition,
    data: &[u8],
) -> Mime {
    let encoded = STANDARD.encode(data);
    let lines = encoded
        .as_bytes()
        .chunks(BASE64_LINE_LENGTH)
        .map(|chunk| {
            // base64 output is always ascii.
            format!("{}\r\n", std::str::from_utf8(chunk).unwrap())
        })
        .collect::<Vec<_>>();

    Mime {
        headers: vec![
            Header::new(
                CONTENT_TYPE_HEADER,
                content_type,
                vec![Arg::quoted("name", filename)],
            ),
            Header::new(
                CONTENT_DISPOSITION_HEADER,
                disposition.as_str(),
                vec![Arg::quoted("filename", filename)],
            ),
            Header::new(CONTENT_TRANSFER_ENCODING_HEADER, "base64", vec![]),
        ],
        part: Part::Binary(lines),
    }
}

/// Embed a complete message as a `message/rfc822` attachment.
///
/// The message is kept as opaque lines rather than being re-parsed: the
/// anomaly path embeds messages this builder could not parse, and the
/// attached bytes must stay whatever was received. A final line terminator
/// is added when missing, since the closing boundary needs one.
///
/// # Errors
///
/// * The message is not valid utf8.
pub fn rfc822_attachment(filename: &str, raw: &[u8]) -> ParserResult<Mime> {
    let mut lines = crate::parsing::lines(raw)?;
    if let Some(last) = lines.last_mut() {
        if !last.ends_with('\n') {
            last.push_str("\r\n");
        }
    }

    Ok(Mime {
        headers: vec![
            Header::new(CONTENT_TYPE_HEADER, "message/rfc822", vec![]),
            Header::new(
                CONTENT_DISPOSITION_HEADER,
                Disposition::Attachment.as_str(),
                vec![Arg::quoted("filename", filename)],
            ),
        ],
        part: Part::Binary(lines),
    })
}

/// Assemble a multipart entity with a fresh boundary.
#[must_use]
pub fn multipart(subtype: &str, parts: Vec<Mime>) -> Mime {
    Mime {
        headers: vec![Header::new(
            CONTENT_TYPE_HEADER,
            format!("multipart/{subtype}"),
            vec![Arg::quoted("boundary", boundary())],
        )],
        part: Part::Multipart(Multipart {
            preamble: vec![],
            parts,
            epilogue: vec![],
        }),
    }
}

/// `multipart/alternative` carrying the same content as text and html.
#[must_use]
pub fn alternative(text: Mime, html: Mime) -> Mime {
    multipart("alternative", vec![text, html])
}

/// `multipart/mixed` entity.
#[must_use]
pub fn mixed(parts: Vec<Mime>) -> Mime {
    multipart("mixed", parts)
}

/// Decode the content of a base64 transfer-encoded entity; content of other
/// entities is returned as raw bytes.
///
/// # Errors
///
/// * The content is not valid base64.
pub fn decode_part(part: &Mime) -> ParserResult<Vec<u8>> {
    let raw = part.body_raw();
    if part
        .transfer_encoding()
        .map_or(false, |encoding| encoding.eq_ignore_ascii_case("base64"))
    {
        let compact = raw
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect::<String>();
        STANDARD
            .decode(compact)
            .map_err(|e| ParserError::InvalidMail(format!("invalid base64 content: {e}")))
    } else {
        Ok(raw.into_bytes())
    }
}
