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

//! Cross-check of the SMTP envelope against the rfc5322 header section.

use vpec_common::address::parse_address_list;
use vpec_common::{Address, Envelope};
use vpec_mail_parser::mail::{
    BCC_HEADER, CC_HEADER, FROM_HEADER, MESSAGE_ID_HEADER, SUBJECT_HEADER, TO_HEADER,
};
use vpec_mail_parser::Mail;

/// A failed validation, with everything the non-acceptance receipt needs.
#[derive(Debug, Clone, thiserror::Error)]
#[error("validation failed: {reason}")]
pub struct ValidationError {
    pub reason: String,
    /// `Message-ID` of the offending message, verbatim.
    pub message_id: String,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub generated_at: time::OffsetDateTime,
}

fn fail(mail: &Mail, now: time::OffsetDateTime, reason: String) -> ValidationError {
    let to = mail
        .get_header_value(TO_HEADER)
        .map(parse_address_list)
        .and_then(Result::ok)
        .map(|addresses| addresses.iter().map(ToString::to_string).collect())
        .unwrap_or_default();

    ValidationError {
        reason,
        message_id: mail
            .get_header_value(MESSAGE_ID_HEADER)
            .unwrap_or_default()
            .to_string(),
        from: mail.get_header_value(FROM_HEADER).unwrap_or_default().to_string(),
        to,
        subject: mail
            .get_header_value(SUBJECT_HEADER)
            .unwrap_or_default()
            .to_string(),
        generated_at: now,
    }
}

/// Check compliance between the SMTP envelope and the rfc5322 headers.
/// The first failing check is reported; the remaining ones do not run.
///
/// # Errors
///
/// * see [`ValidationError`]
pub fn validate_envelope(
    envelope: &Envelope,
    mail: &Mail,
    now: time::OffsetDateTime,
) -> Result<(), ValidationError> {
    // 1. exactly one From address.
    let from = match mail.get_header_value(FROM_HEADER).map(parse_address_list) {
        Some(Ok(mut addresses)) if addresses.len() == 1 => addresses.remove(0),
        _ => {
            return Err(fail(
                mail,
                now,
                "invalid or missing 'From' field".to_string(),
            ))
        }
    };

    // 2. at least one To address.
    let to = match mail.get_header_value(TO_HEADER).map(parse_address_list) {
        Some(Ok(addresses)) if !addresses.is_empty() => addresses,
        _ => {
            return Err(fail(
                mail,
                now,
                "missing or invalid 'To' field".to_string(),
            ))
        }
    };

    // 3. Cc is optional; an unparsable Cc contributes no recipients.
    let cc = mail
        .get_header_value(CC_HEADER)
        .map(parse_address_list)
        .and_then(Result::ok)
        .unwrap_or_default();

    // 4. Bcc must be absent or empty.
    if mail
        .get_header_value(BCC_HEADER)
        .map_or(false, |value| !value.trim().is_empty())
    {
        return Err(fail(
            mail,
            now,
            "'Bcc' field must not be present".to_string(),
        ));
    }

    // 5. reverse-path must match the From header.
    if !envelope.reverse_path.0.eq_fold(&from) {
        return Err(fail(
            mail,
            now,
            format!(
                "reverse-path '{}' does not match From header '{}'",
                envelope.reverse_path, from
            ),
        ));
    }

    // 6. every forward-path recipient must be listed in To or Cc.
    let listed = |candidate: &Address| {
        to.iter().chain(cc.iter()).any(|addr| addr.eq_fold(candidate))
    };
    for recipient in &envelope.forward_paths {
        if !listed(&recipient.0) {
            return Err(fail(
                mail,
                now,
                format!("recipient '{recipient}' not found in 'To' or 'Cc' fields"),
            ));
        }
    }

    Ok(())
}
