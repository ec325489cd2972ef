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

use std::str::FromStr;

use crate::mail::body::Body;
use crate::mail::headers::{read_header, Header, Headers};
use crate::mail::{is_mime_header, Mail};
use crate::mime::headers::Arg;
use crate::mime::{self, Mime};
use crate::{ParserError, ParserResult};

/// A boundary line seen while walking a multipart.
enum BoundaryType {
    Delimiter,
    End,
    /// Boundary of an enclosing multipart showing up before the current one
    /// is closed.
    OutOfScope,
}

/// Instance parsing a message.
#[derive(Default)]
pub struct Parser {
    boundary_stack: Vec<String>,
}

/// Split a byte buffer into lines, line terminators kept.
///
/// # Errors
///
/// * The buffer is not valid utf8.
pub fn lines(bytes: &[u8]) -> ParserResult<Vec<String>> {
    let mut out = Vec::with_capacity(64);
    let mut start = 0;

    for (idx, byte) in bytes.iter().enumerate() {
        if *byte == b'\n' {
            out.push(std::str::from_utf8(&bytes[start..=idx])?.to_string());
            start = idx + 1;
        }
    }
    if start < bytes.len() {
        out.push(std::str::from_utf8(&bytes[start..])?.to_string());
    }

    Ok(out)
}

fn is_blank(line: &str) -> bool {
    matches!(line, "\r\n" | "\n" | "")
}

impl Parser {
    /// Parse the header section of a message, keeping the body as raw lines.
    ///
    /// Classification works on headers alone, so the mime tree is only built
    /// when [`Parser::parse_body_of`] is called.
    ///
    /// # Errors
    ///
    /// * The input is not compliant.
    pub fn parse(&mut self, bytes: &[u8]) -> ParserResult<Mail> {
        let lines = lines(bytes)?;
        let mut content = &lines[..];

        let mut headers = Headers(Vec::with_capacity(10));

        while !content.is_empty() {
            match read_header(&mut content) {
                Some((name, value)) => {
                    headers.push(Header::new_unchecked(name, value));
                }
                None if is_blank(content[0].as_ref()) => {
                    content = &content[1..];
                    return Ok(Mail {
                        headers,
                        body: Body::Raw(content.to_vec()),
                    });
                }
                None => {
                    return Err(ParserError::InvalidMail(format!(
                        "expected a header or the end of the header section, got: '{}'",
                        content[0].trim_end()
                    )));
                }
            }
            content = &content[1..];
        }

        Ok(Mail {
            headers,
            body: Body::Empty,
        })
    }

    /// Parse the raw body of a message that does not have its body parsed
    /// yet. Already parsed bodies are returned as is.
    pub fn parse_body_of<'m>(&mut self, mail: &'m mut Mail) -> ParserResult<&'m mut Body> {
        if let Body::Raw(raw) = &mail.body {
            let raw = raw.clone();

            mail.body = if mail
                .headers
                .iter()
                .any(|h| h.name.eq_ignore_ascii_case(mime::MIME_VERSION_HEADER))
            {
                let mime_headers = mail
                    .headers
                    .iter()
                    .filter(|header| is_mime_header(&header.name))
                    .map(|header| get_mime_header(&header.name, &header.body))
                    .collect::<Vec<_>>();

                Body::Mime(Box::new(
                    self.as_mime_entity(&mut &raw[..], mime_headers)?,
                ))
            } else {
                Body::Text(raw)
            };
        }

        Ok(&mut mail.body)
    }

    /// Parse a complete embedded message: header section, separator, body.
    /// The enclosing boundary, if any, ends the body.
    fn parse_embedded<C: AsRef<str>>(&mut self, content: &mut &[C]) -> ParserResult<Mail> {
        let mut headers = Headers(Vec::with_capacity(10));

        while !content.is_empty() {
            if self.check_boundary(content[0].as_ref()).is_some() {
                // header section cut short by the enclosing boundary.
                return Ok(Mail {
                    headers,
                    body: Body::Empty,
                });
            }
            match read_header(content) {
                Some((name, value)) => {
                    headers.push(Header::new_unchecked(name, value));
                }
                None if is_blank(content[0].as_ref()) => {
                    *content = &content[1..];

                    let body = if headers
                        .iter()
                        .any(|h| h.name.eq_ignore_ascii_case(mime::MIME_VERSION_HEADER))
                    {
                        let mime_headers = headers
                            .iter()
                            .filter(|header| is_mime_header(&header.name))
                            .map(|header| get_mime_header(&header.name, &header.body))
                            .collect::<Vec<_>>();

                        Body::Mime(Box::new(self.as_mime_entity(content, mime_headers)?))
                    } else {
                        Body::Text(self.content_until_boundary(content)?)
                    };

                    return Ok(Mail { headers, body });
                }
                None => {
                    return Err(ParserError::InvalidMail(format!(
                        "expected a header or the end of the header section, got: '{}'",
                        content[0].as_ref().trim_end()
                    )));
                }
            }
            *content = &content[1..];
        }

        Ok(Mail {
            headers,
            body: Body::Empty,
        })
    }

    /// Build a mime entity from its already read header block.
    fn as_mime_entity<C: AsRef<str>>(
        &mut self,
        content: &mut &[C],
        headers: Vec<mime::Header>,
    ) -> ParserResult<Mime> {
        let media_type = match headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(mime::CONTENT_TYPE_HEADER))
        {
            Some(content_type) => match content_type.body().split_once('/') {
                Some((t, subtype)) => (
                    t.to_ascii_lowercase(),
                    subtype.trim().to_ascii_lowercase(),
                ),
                None => {
                    return Err(ParserError::InvalidMail(format!(
                        "invalid {} value: {}",
                        mime::CONTENT_TYPE_HEADER,
                        content_type.body()
                    )))
                }
            },
            // rfc2045 default.
            None => ("text".to_string(), "plain".to_string()),
        };

        Ok(match (media_type.0.as_str(), media_type.1.as_str()) {
            ("text", "plain") => Mime {
                headers,
                part: mime::Part::Text(self.content_until_boundary(content)?),
            },
            ("text", "html") => Mime {
                headers,
                part: mime::Part::Html(self.content_until_boundary(content)?),
            },
            ("message", _) => Mime {
                headers,
                part: mime::Part::Message(Box::new(self.parse_embedded(content)?)),
            },
            ("multipart", _) => {
                let multipart = self.parse_multipart(&headers, content)?;
                Mime {
                    headers,
                    part: mime::Part::Multipart(multipart),
                }
            }
            _ => Mime {
                headers,
                part: mime::Part::Binary(self.content_until_boundary(content)?),
            },
        })
    }

    /// Read the header block of a nested entity then its content.
    fn parse_entity<C: AsRef<str>>(&mut self, content: &mut &[C]) -> ParserResult<Mime> {
        let mut headers = Vec::new();

        while !content.is_empty() {
            if let Some((name, value)) = read_header(content) {
                headers.push(get_mime_header(&name, &value));
            } else {
                if is_blank(content[0].as_ref()) {
                    *content = &content[1..];
                }
                break;
            }
            *content = &content[1..];
        }

        self.as_mime_entity(content, headers)
    }

    fn parse_multipart<C: AsRef<str>>(
        &mut self,
        headers: &[mime::Header],
        content: &mut &[C],
    ) -> ParserResult<mime::Multipart> {
        let boundary = headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(mime::CONTENT_TYPE_HEADER))
            .and_then(|content_type| content_type.arg("boundary"))
            .ok_or_else(|| {
                ParserError::BoundaryNotFound(
                    "boundary parameter not found in Content-Type header for a multipart"
                        .to_string(),
                )
            })?;
        self.boundary_stack.push(boundary.value().to_string());

        let mut multipart = mime::Multipart::default();

        // preamble.
        loop {
            if content.is_empty() {
                // truncated multipart, keep what was read.
                self.boundary_stack.pop();
                return Ok(multipart);
            }
            match self.check_boundary(content[0].as_ref()) {
                Some(BoundaryType::Delimiter) => break,
                Some(BoundaryType::End) => {
                    return Err(ParserError::MisplacedBoundary(
                        "closing boundary before any delimiter".to_string(),
                    ));
                }
                Some(BoundaryType::OutOfScope) => {
                    return Err(ParserError::MisplacedBoundary(format!(
                        "'{}' boundary is out of scope",
                        content[0].as_ref().trim_end(),
                    )));
                }
                None => multipart.preamble.push(content[0].as_ref().to_string()),
            }
            *content = &content[1..];
        }

        while !content.is_empty() {
            match self.check_boundary(content[0].as_ref()) {
                Some(BoundaryType::Delimiter) => {
                    *content = &content[1..];
                    multipart.parts.push(self.parse_entity(content)?);
                }
                Some(BoundaryType::End) => {
                    *content = &content[1..];
                    self.boundary_stack.pop();

                    // epilogue runs until the next enclosing boundary.
                    while !content.is_empty()
                        && self.check_boundary(content[0].as_ref()).is_none()
                    {
                        multipart.epilogue.push(content[0].as_ref().to_string());
                        *content = &content[1..];
                    }
                    return Ok(multipart);
                }
                Some(BoundaryType::OutOfScope) => {
                    return Err(ParserError::MisplacedBoundary(format!(
                        "'{}' boundary is out of scope",
                        content[0].as_ref().trim_end(),
                    )));
                }
                None => {
                    return Err(ParserError::MisplacedBoundary(format!(
                        "expected a boundary line, got: '{}'",
                        content[0].as_ref().trim_end(),
                    )));
                }
            }
        }

        // EOF without a closing boundary: tolerated.
        self.boundary_stack.pop();
        Ok(multipart)
    }

    /// Accumulate content lines until a boundary of the current stack shows
    /// up. The boundary line itself is left in place.
    fn content_until_boundary<C: AsRef<str>>(
        &self,
        content: &mut &[C],
    ) -> ParserResult<Vec<String>> {
        let mut body = Vec::with_capacity(32);

        while !content.is_empty() {
            match self.check_boundary(content[0].as_ref()) {
                Some(BoundaryType::Delimiter | BoundaryType::End) => return Ok(body),
                Some(BoundaryType::OutOfScope) => {
                    return Err(ParserError::MisplacedBoundary(format!(
                        "'{}' boundary is out of scope",
                        content[0].as_ref().trim_end(),
                    )));
                }
                None => body.push(content[0].as_ref().to_string()),
            }
            *content = &content[1..];
        }

        Ok(body)
    }

    fn check_boundary(&self, line: &str) -> Option<BoundaryType> {
        let top = self.boundary_stack.last()?;

        boundary_type(line, top).or_else(|| {
            self.boundary_stack[..self.boundary_stack.len() - 1]
                .iter()
                .any(|b| boundary_type(line, b).is_some())
                .then_some(BoundaryType::OutOfScope)
        })
    }
}

/// Classify a line against one boundary. Trailing whitespace is tolerated,
/// as rfc2046 permits.
fn boundary_type(line: &str, boundary: &str) -> Option<BoundaryType> {
    let line = line.trim_end();
    let rest = line.strip_prefix("--")?;

    if rest == boundary {
        Some(BoundaryType::Delimiter)
    } else if rest.strip_suffix("--") == Some(boundary) {
        Some(BoundaryType::End)
    } else {
        None
    }
}

/// Take the name and raw value of a header and parse it into a
/// [`mime::Header`], parameters split out.
#[must_use]
pub fn get_mime_header(name: &str, value: &str) -> mime::Header {
    let pieces = value.split(';').collect::<Vec<&str>>();
    let mut pieces_iter = pieces.iter();

    let body = pieces_iter.next().unwrap_or(&"").to_string();
    let mut args = pieces_iter
        .filter_map(|arg| Arg::from_str(arg).ok())
        .collect::<Vec<_>>();

    // A trailing ';' before the CRLF makes the last split piece a lone
    // "\r\n", which is not a parameter. Glue it back onto the previous one
    // so the header serializes to the exact bytes it was read from.
    if let Some(last) = pieces.last() {
        if *last == "\r\n" {
            if let Some(last) = args.last_mut() {
                *last.mut_value() = format!("{};\r\n", last.raw_value());
            }
        }
    }

    mime::Header::new_unchecked(name.trim().to_string(), body, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::Part;
    use pretty_assertions::assert_eq;

    const MULTIPART: &str = "From: posta-certificata@b.it\r\n\
        To: alice@a.it\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
        \r\n\
        --outer\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        Ricevuta di avvenuta consegna\r\n\
        --outer\r\n\
        Content-Type: application/xml; name=\"daticert.xml\"\r\n\
        Content-Transfer-Encoding: base64\r\n\
        \r\n\
        PHBvc3RhY2VydC8+\r\n\
        --outer--\r\n";

    #[test]
    fn multipart_structure() {
        let mut mail = Mail::try_from(MULTIPART).unwrap();
        let mime = mail.mime_mut().unwrap();

        let Part::Multipart(multipart) = &mime.part else {
            panic!("expected a multipart");
        };
        assert_eq!(multipart.parts.len(), 2);
        assert!(matches!(multipart.parts[0].part, Part::Text(_)));
        assert!(matches!(multipart.parts[1].part, Part::Binary(_)));
        assert_eq!(multipart.parts[1].filename(), Some("daticert.xml"));
    }

    #[test]
    fn multipart_round_trip() {
        let mut mail = Mail::try_from(MULTIPART).unwrap();
        mail.body_mut().unwrap();

        assert_eq!(mail.to_string(), MULTIPART);
    }

    #[test]
    fn embedded_message() {
        let input = "From: posta-certificata@b.it\r\n\
            MIME-Version: 1.0\r\n\
            Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
            \r\n\
            --outer\r\n\
            Content-Type: message/rfc822\r\n\
            \r\n\
            From: alice@a.it\r\n\
            Subject: originale\r\n\
            \r\n\
            il contenuto originale\r\n\
            --outer--\r\n";

        let mut mail = Mail::try_from(input).unwrap();
        let serialized = {
            let mime = mail.mime_mut().unwrap();
            let embedded = mime
                .find(&|part| matches!(part.part, Part::Message(_)))
                .unwrap();
            let Part::Message(inner) = &embedded.part else {
                unreachable!()
            };
            assert_eq!(inner.get_header_value("Subject"), Some("originale"));
            mail.to_string()
        };

        assert_eq!(serialized, input);
    }

    #[test]
    fn nested_multipart_round_trip() {
        let input = "From: posta-certificata@b.it\r\n\
            MIME-Version: 1.0\r\n\
            Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
            \r\n\
            --outer\r\n\
            Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
            \r\n\
            --inner\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            \r\n\
            testo\r\n\
            --inner\r\n\
            Content-Type: text/html; charset=utf-8\r\n\
            \r\n\
            <html>testo</html>\r\n\
            --inner--\r\n\
            --outer--\r\n";

        let mut mail = Mail::try_from(input).unwrap();
        mail.body_mut().unwrap();
        assert_eq!(mail.to_string(), input);
    }

    #[test]
    fn out_of_scope_boundary_is_rejected() {
        let input = "From: posta-certificata@b.it\r\n\
            MIME-Version: 1.0\r\n\
            Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
            \r\n\
            --outer\r\n\
            Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
            \r\n\
            --inner\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            testo\r\n\
            --outer\r\n\
            --outer--\r\n";

        let mut mail = Mail::try_from(input).unwrap();
        assert!(matches!(
            mail.body_mut(),
            Err(ParserError::MisplacedBoundary(_))
        ));
    }

    #[test]
    fn missing_boundary_parameter() {
        let input = "From: posta-certificata@b.it\r\n\
            MIME-Version: 1.0\r\n\
            Content-Type: multipart/mixed\r\n\
            \r\n\
            body\r\n";

        let mut mail = Mail::try_from(input).unwrap();
        assert!(matches!(
            mail.body_mut(),
            Err(ParserError::BoundaryNotFound(_))
        ));
    }
}
