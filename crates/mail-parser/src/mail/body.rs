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

use crate::mime::Mime;

/// Body of an email.
///
/// A freshly parsed message keeps its body as raw lines; the mime tree is
/// only built on demand since classification works on headers alone.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Body {
    /// Unparsed lines, CRLF included.
    Raw(Vec<String>),
    /// Plain rfc5322 body, no mime structure.
    Text(Vec<String>),
    /// Parsed mime tree.
    Mime(Box<Mime>),
    /// No body at all.
    Empty,
}

impl Default for Body {
    fn default() -> Self {
        Self::Empty
    }
}

impl std::fmt::Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Raw(lines) | Body::Text(lines) => {
                for line in lines {
                    f.write_str(line)?;
                }
                Ok(())
            }
            // Top-level mime headers are serialized within the top-level
            // header section, so they are skipped here.
            Body::Mime(mime) => write!(f, "{}", mime.to_string_without_headers()),
            Body::Empty => Ok(()),
        }
    }
}
