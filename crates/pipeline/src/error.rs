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

use vpec_common::api::{SinkError, StoreError};
use vpec_daticert::DatiCertError;
use vpec_mail_parser::ParserError;
use vpec_smime::{SignatureError, SigningError};

use crate::validate::ValidationError;

/// Errors raised while processing one inbound message.
///
/// Per-recipient failures stay inside the role handlers (each recipient is
/// independent); what surfaces here aborts the current artifact or, for
/// signing and parsing, the whole message.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Malformed rfc5322/mime input. No artifact is emitted.
    #[error("{0}")]
    Parse(#[from] ParserError),

    /// Envelope and headers disagree. The access point answers with a
    /// non-acceptance receipt, the reception point with an anomaly
    /// envelope.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The header classification disagrees with the certification XML.
    #[error("classification mismatch: headers say '{header}', certification xml says '{xml}'")]
    ClassificationMismatch { header: String, xml: String },

    /// The certification XML is unreadable or, on egress, failed to build.
    #[error("{0}")]
    Certification(#[from] DatiCertError),

    /// The S/MIME layer rejected an inbound message.
    #[error("{0}")]
    Signature(#[from] SignatureError),

    /// Local cryptographic failure; fatal for the current task.
    #[error("{0}")]
    Signing(#[from] SigningError),

    /// The mailbox sink is unavailable. The caller may retry.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The next-hop sink is unavailable. The caller may retry.
    #[error("{0}")]
    Sink(#[from] SinkError),

    /// The inbound claims PEC semantics its headers do not carry.
    #[error("the message does not carry PEC semantics")]
    NotPec,
}
