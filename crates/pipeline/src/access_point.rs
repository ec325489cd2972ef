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

//! The access point (`punto di accesso`): ingress from a PEC user.
//!
//! `Received -> Validated -> Accepted -> EnvelopeBuilt -> Forwarded`, with
//! the `Rejected -> NonAcceptanceEmitted` side branch. The sender always
//! gets exactly one receipt out of this handler: acceptance or
//! non-acceptance.

use std::sync::Arc;

use vpec_common::api::SinkError;
use vpec_common::pec::{classify, PecType, X_RICEVUTA_HEADER, X_TRASPORTO_HEADER};
use vpec_common::{Domain, Envelope, Mailbox};
use vpec_mail_parser::mail::{REPLY_TO_HEADER, SUBJECT_HEADER};
use vpec_mail_parser::Mail;

use crate::receipt::{self, ReceiptKind, ReceiptRequest};
use crate::validate::validate_envelope;
use crate::{transport, Artifact, Core, ProcessError};

pub struct AccessPoint {
    pub(crate) core: Arc<Core>,
}

/// Result of one forward attempt, one entry per recipient domain.
#[derive(Debug)]
pub struct ForwardOutcome {
    pub domain: Domain,
    pub recipients: Vec<Mailbox>,
    pub result: Result<(), SinkError>,
}

/// What the access point did with an inbound submission.
#[derive(Debug)]
pub enum ApOutcome {
    /// Validation failed; the non-acceptance receipt went to the sender's
    /// mailbox and nothing was forwarded.
    Rejected { receipt: Artifact },
    /// The message was accepted, wrapped and handed to the next hop.
    Accepted {
        receipt: Artifact,
        transport: Artifact,
        forwards: Vec<ForwardOutcome>,
    },
}

impl AccessPoint {
    /// Process one submission coming from an authenticated user.
    ///
    /// # Errors
    ///
    /// * see [`ProcessError`]
    #[tracing::instrument(skip_all, fields(from = %envelope.reverse_path))]
    pub async fn handle(&self, envelope: &Envelope, raw: &[u8]) -> Result<ApOutcome, ProcessError> {
        let core = &self.core;
        let mail = Mail::try_from(raw)?;

        // A submission carrying PEC markers its values do not back up is
        // not something a user may hand to an access point.
        if classify(&mail).pec_type == PecType::None
            && (mail.get_header(X_TRASPORTO_HEADER).is_some()
                || mail.get_header(X_RICEVUTA_HEADER).is_some())
        {
            return Err(ProcessError::NotPec);
        }

        if let Err(validation) = validate_envelope(envelope, &mail, core.now()) {
            tracing::warn!(reason = %validation.reason, "submission refused");

            let mut request =
                ReceiptRequest::new(ReceiptKind::NonAcceptance, envelope.reverse_path.clone());
            request.reference_message_id = validation.message_id.clone();
            request.original_subject = validation.subject.clone();
            request.original_from = validation.from.clone();
            request.recipients = if validation.to.is_empty() {
                envelope
                    .forward_paths
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            } else {
                validation.to.clone()
            };
            request.reply_to = validation.from.clone();
            request.error_reason = Some(validation.reason.clone());

            let artifact = receipt::build(core, &request)?;
            if let Err(error) = core
                .store
                .add_message(&envelope.reverse_path, &artifact.bytes)
                .await
            {
                tracing::warn!(%error, "non-acceptance receipt not stored");
            }
            return Ok(ApOutcome::Rejected { receipt: artifact });
        }

        // acceptance receipt, emitted before anything is forwarded.
        let mut request =
            ReceiptRequest::new(ReceiptKind::Acceptance, envelope.reverse_path.clone());
        request.reference_message_id = classify(&mail).message_id;
        request.original_subject = mail
            .get_header_value(SUBJECT_HEADER)
            .unwrap_or_default()
            .to_string();
        request.original_from = transport::from_address(&mail);
        request.recipients = transport::listed_recipients(&mail);
        request.reply_to = mail
            .get_header_value(REPLY_TO_HEADER)
            .map_or_else(|| request.original_from.clone(), str::to_string);

        let acceptance = receipt::build(core, &request)?;
        if let Err(error) = core
            .store
            .add_message(&envelope.reverse_path, &acceptance.bytes)
            .await
        {
            tracing::warn!(%error, "acceptance receipt not stored");
        }

        let transport = transport::build(core, &mail, raw)?;

        let mut forwards = Vec::new();
        for (domain, recipients) in group_by_domain(&envelope.forward_paths) {
            let result = match core.registry.by_domain(&domain).await {
                Some(authority) => {
                    core.provider_hop
                        .send(
                            &authority,
                            &core.certified_mailbox(),
                            &recipients,
                            &transport.bytes,
                        )
                        .await
                }
                None => Err(SinkError::NoRoute(domain.clone())),
            };

            if let Err(error) = &result {
                tracing::warn!(%domain, %error, "transport envelope not forwarded");
            }
            forwards.push(ForwardOutcome {
                domain,
                recipients,
                result,
            });
        }

        tracing::info!(
            message_id = %transport.message_id,
            recipients = envelope.forward_paths.len(),
            "submission accepted"
        );
        Ok(ApOutcome::Accepted {
            receipt: acceptance,
            transport,
            forwards,
        })
    }
}

/// Group forward-paths by recipient domain, first-seen order preserved.
fn group_by_domain(recipients: &[Mailbox]) -> Vec<(Domain, Vec<Mailbox>)> {
    let mut groups: Vec<(Domain, Vec<Mailbox>)> = Vec::new();

    for recipient in recipients {
        let domain = recipient.domain();
        match groups.iter_mut().find(|(d, _)| *d == domain) {
            Some((_, members)) => members.push(recipient.clone()),
            None => groups.push((domain, vec![recipient.clone()])),
        }
    }

    groups
}
