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

//! The delivery point (`punto di consegna`): egress into the recipients'
//! mailboxes.
//!
//! Transport envelopes are delivered recipient by recipient, each
//! independently, and every attempt is certified back to the original
//! sender: a delivery receipt on success, a non-delivery notice on
//! failure. Receipts and anomaly envelopes reaching the delivery point are
//! appended unchanged.

use std::sync::Arc;

use vpec_common::address::parse_address_list;
use vpec_common::api::SinkError;
use vpec_common::pec::{classify, Classification, PecType, ReceiptSubtype};
use vpec_common::{Envelope, Mailbox};
use vpec_mail_parser::mail::{CC_HEADER, RETURN_PATH_HEADER, SUBJECT_HEADER, TO_HEADER};
use vpec_mail_parser::mime::{Mime, Part};
use vpec_mail_parser::Mail;

use crate::receipt::{self, ReceiptKind, ReceiptRequest};
use crate::reception_point::certification_of;
use crate::{transport, Artifact, Core, ProcessError};

pub struct DeliveryPoint {
    pub(crate) core: Arc<Core>,
}

/// Delivery attempt of one recipient.
#[derive(Debug)]
pub struct RecipientOutcome {
    pub recipient: Mailbox,
    /// Whether the mailbox append succeeded.
    pub delivered: bool,
    /// The receipt or notice certifying the attempt.
    pub receipt: Artifact,
    /// Outcome of handing the receipt to the sender's provider.
    pub dispatch: Result<(), SinkError>,
}

/// What the delivery point did with an inbound message.
#[derive(Debug)]
pub enum DpOutcome {
    /// A transport envelope, processed per recipient.
    Delivered(Vec<RecipientOutcome>),
    /// A receipt or anomaly envelope, appended unchanged to the target
    /// mailboxes.
    Stored,
}

/// Position of a recipient in the original address lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecipientClass {
    Primary,
    CcOnly,
    /// The address lists could not be parsed; treated as primary, erring
    /// toward completeness.
    Ambiguous,
}

fn classify_recipient(mail: &Mail, recipient: &Mailbox) -> RecipientClass {
    let to = mail
        .get_header_value(TO_HEADER)
        .map_or_else(|| Ok(Vec::new()), parse_address_list);
    let cc = mail
        .get_header_value(CC_HEADER)
        .map_or_else(|| Ok(Vec::new()), parse_address_list);

    let (Ok(to), Ok(cc)) = (to, cc) else {
        return RecipientClass::Ambiguous;
    };

    if to.iter().any(|addr| addr.eq_fold(&recipient.0)) {
        RecipientClass::Primary
    } else if cc.iter().any(|addr| addr.eq_fold(&recipient.0)) {
        RecipientClass::CcOnly
    } else {
        // not listed at all: the envelope knows better than the headers.
        RecipientClass::Primary
    }
}

/// The original message embedded in a transport envelope, or the whole
/// envelope when none is found.
fn embedded_original(mail: &mut Mail, raw: &[u8]) -> Vec<u8> {
    let embedded = mail
        .find_part(|part: &Mime| matches!(part.part, Part::Message(_)))
        .ok()
        .flatten()
        .map(|part| part.body_raw().into_bytes());

    embedded.unwrap_or_else(|| raw.to_vec())
}

impl DeliveryPoint {
    /// Process one message handed over by the reception point.
    ///
    /// # Errors
    ///
    /// * see [`ProcessError`]
    #[tracing::instrument(skip_all, fields(recipients = envelope.forward_paths.len()))]
    pub async fn handle(&self, envelope: &Envelope, raw: &[u8]) -> Result<DpOutcome, ProcessError> {
        let mut mail = Mail::try_from(raw)?;
        let classification = classify(&mail);

        match classification.pec_type {
            PecType::None => Err(ProcessError::NotPec),
            PecType::CertifiedEmail => {
                self.deliver_envelope(envelope, &mut mail, &classification, raw)
                    .await
            }
            _ => {
                // Receipts and anomaly envelopes land in the addressee's
                // mailbox as they are.
                for recipient in &envelope.forward_paths {
                    if let Err(error) = self.core.store.add_message(recipient, raw).await {
                        tracing::warn!(%recipient, %error, "artifact not appended");
                    }
                }
                Ok(DpOutcome::Stored)
            }
        }
    }

    async fn deliver_envelope(
        &self,
        envelope: &Envelope,
        mail: &mut Mail,
        classification: &Classification,
        raw: &[u8],
    ) -> Result<DpOutcome, ProcessError> {
        let core = &self.core;
        let subtype = classification.receipt_subtype.unwrap_or_default();

        // The certification XML carries the original sender and subject;
        // headers are the fallback for envelopes built by other providers.
        let certification = certification_of(mail).ok().flatten();
        let original_from = certification.as_ref().map_or_else(
            || sender_fallback(mail, envelope),
            |cert| cert.intestazione.mittente.clone(),
        );
        let original_subject = certification.as_ref().map_or_else(
            || {
                mail.get_header_value(SUBJECT_HEADER)
                    .unwrap_or_default()
                    .trim_start_matches("POSTA CERTIFICATA: ")
                    .to_string()
            },
            |cert| cert.intestazione.oggetto.clone(),
        );

        let sender = original_from
            .parse::<Mailbox>()
            .unwrap_or_else(|_| envelope.reverse_path.clone());
        let recipients_display = transport::listed_recipients(mail);
        let original = embedded_original(mail, raw);

        let mut outcomes = Vec::with_capacity(envelope.forward_paths.len());
        for recipient in &envelope.forward_paths {
            let delivered = match core.store.add_message(recipient, raw).await {
                Ok(_) => true,
                Err(error) => {
                    tracing::warn!(%recipient, %error, "mailbox append failed");
                    false
                }
            };

            let mut request = ReceiptRequest::new(
                if delivered {
                    ReceiptKind::Delivery
                } else {
                    ReceiptKind::DeliveryError
                },
                sender.clone(),
            );
            request.reference_message_id = classification.message_id.clone();
            request.original_subject = original_subject.clone();
            request.original_from = original_from.clone();
            request.recipients = recipients_display.clone();
            request.reply_to = original_from.clone();
            request.subtype = if delivered {
                subtype
            } else {
                ReceiptSubtype::Normale
            };
            request.delivered_to = Some(recipient.to_string());
            if !delivered {
                request.error_reason =
                    Some("errore di consegna nella casella di destinazione".to_string());
            }
            if delivered
                && subtype == ReceiptSubtype::Normale
                && classify_recipient(mail, recipient) != RecipientClass::CcOnly
            {
                request.original = Some(original.clone());
            }

            // Signing failures are fatal for the whole task, not just this
            // recipient.
            let artifact = receipt::build(core, &request)?;

            let dispatch = self.dispatch_to_sender(&sender, &artifact).await;
            if let Err(error) = &dispatch {
                tracing::warn!(%sender, %error, "receipt not dispatched");
            }

            tracing::info!(%recipient, delivered, "delivery attempt certified");
            outcomes.push(RecipientOutcome {
                recipient: recipient.clone(),
                delivered,
                receipt: artifact,
                dispatch,
            });
        }

        Ok(DpOutcome::Delivered(outcomes))
    }

    /// Route a receipt back to the original sender: locally when the
    /// sender is ours, through the provider hop otherwise.
    async fn dispatch_to_sender(
        &self,
        sender: &Mailbox,
        artifact: &Artifact,
    ) -> Result<(), SinkError> {
        let core = &self.core;

        if sender.domain() == *core.domain() {
            return core
                .store
                .add_message(sender, &artifact.bytes)
                .await
                .map(|_| ())
                .map_err(|e| SinkError::Unavailable(e.to_string()));
        }

        match core.registry.by_domain(&sender.domain()).await {
            Some(authority) => {
                core.provider_hop
                    .send(
                        &authority,
                        &core.certified_mailbox(),
                        std::slice::from_ref(sender),
                        &artifact.bytes,
                    )
                    .await
            }
            None => Err(SinkError::NoRoute(sender.domain())),
        }
    }
}

fn sender_fallback(mail: &Mail, envelope: &Envelope) -> String {
    mail.get_header_value(RETURN_PATH_HEADER)
        .map(|value| {
            value
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
        .unwrap_or_else(|| envelope.reverse_path.to_string())
}
