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

use crate::Domain;

#[derive(Debug, thiserror::Error)]
pub enum AddressFromStrError {
    #[error("cannot parse {s:?}")]
    CannotParse { s: String },
}

/// Email address.
#[derive(Clone, Debug, Eq, serde_with::SerializeDisplay, serde_with::DeserializeFromStr)]
pub struct Address {
    at_sign: usize,
    full: String,
}

impl std::str::FromStr for Address {
    type Err = AddressFromStrError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Err(error) = addr::parse_email_address(s) {
            return Err(AddressFromStrError::CannotParse {
                s: error.to_string(),
            });
        }
        #[allow(clippy::expect_used)]
        Ok(Self {
            at_sign: s.find('@').expect("no '@' in address"),
            full: s.to_owned(),
        })
    }
}

impl PartialEq for Address {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl std::hash::Hash for Address {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl std::fmt::Display for Address {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full)
    }
}

impl Address {
    /// get the full email address.
    #[must_use]
    #[inline]
    pub fn full(&self) -> &str {
        &self.full
    }

    /// get the user of the address.
    #[must_use]
    #[inline]
    pub fn local_part(&self) -> &str {
        &self.full[..self.at_sign]
    }

    /// get the fqdn of the address.
    #[must_use]
    #[inline]
    #[allow(clippy::expect_used)]
    pub fn domain(&self) -> Domain {
        Domain::from_utf8(&self.full[self.at_sign + 1..])
            .expect("at this point, domain is valid (checked on construction)")
    }

    /// Compare two addresses the SMTP way: ASCII case-insensitive on the
    /// whole address form.
    #[must_use]
    #[inline]
    pub fn eq_fold(&self, other: &Self) -> bool {
        self.full.eq_ignore_ascii_case(&other.full)
    }

    /// create a new address without verifying the syntax.
    ///
    /// # Panics
    ///
    /// * there is no '@' character in the string
    #[must_use]
    #[inline]
    #[allow(clippy::unwrap_used)]
    pub fn new_unchecked(addr: String) -> Self {
        Self {
            at_sign: addr.find('@').unwrap(),
            full: addr,
        }
    }
}

/// Parse an address-list header value (`To:`, `Cc:`, ...) into addresses.
///
/// Handles angle-addr with display names, quoted display names with commas
/// inside, and bare addresses. An empty value yields an empty list; a
/// malformed mailbox is an error, so the caller can distinguish "absent"
/// from "unparsable" (the two have different receipt semantics).
///
/// # Errors
///
/// * One of the mailboxes cannot be parsed.
pub fn parse_address_list(value: &str) -> Result<Vec<Address>, AddressFromStrError> {
    let mut out = Vec::new();

    for piece in split_address_list(value) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        let candidate = match (piece.rfind('<'), piece.rfind('>')) {
            (Some(open), Some(close)) if open < close => &piece[open + 1..close],
            _ => piece,
        };

        out.push(candidate.trim().parse::<Address>()?);
    }

    Ok(out)
}

/// Split on top-level commas: commas inside double quotes or angle brackets
/// do not separate mailboxes.
fn split_address_list(value: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_angle = false;

    for (idx, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                pieces.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    pieces.push(&value[start..]);

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_address() {
        let parsed = "alice@a.it".parse::<Address>().unwrap();
        assert_eq!(parsed.local_part(), "alice");
        assert_eq!(parsed.domain(), "a.it".parse::<Domain>().unwrap());
    }

    #[test]
    fn reject_invalid_address() {
        assert!("not-an-address".parse::<Address>().is_err());
        assert!("@no-local-part.it".parse::<Address>().is_err());
    }

    #[test]
    fn case_insensitive_comparison() {
        let a = "Alice@A.IT".parse::<Address>().unwrap();
        let b = "alice@a.it".parse::<Address>().unwrap();
        assert!(a.eq_fold(&b));
        assert!(a != b);
    }

    #[test]
    fn address_list_with_display_names() {
        let list = parse_address_list(
            "\"Rossi, Mario\" <mario.rossi@a.it>, bianchi@b.it, Anna <anna@c.it>",
        )
        .unwrap();

        assert_eq!(
            list.iter().map(Address::full).collect::<Vec<_>>(),
            ["mario.rossi@a.it", "bianchi@b.it", "anna@c.it"]
        );
    }

    #[test]
    fn empty_list_is_not_an_error() {
        assert!(parse_address_list("").unwrap().is_empty());
        assert!(parse_address_list("  ").unwrap().is_empty());
    }

    #[test]
    fn malformed_mailbox_is_an_error() {
        assert!(parse_address_list("alice@a.it, garbage").is_err());
    }

    #[test]
    fn serde_round_trip() {
        let parsed = serde_json::from_str::<Address>(r#""hello@domain.com""#).unwrap();
        assert_eq!(parsed.full(), "hello@domain.com");
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#""hello@domain.com""#
        );
    }
}
