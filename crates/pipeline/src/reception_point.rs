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

//! The reception point (`punto di ricezione`): ingress from peer providers.
//!
//! Valid signed transport envelopes are acknowledged with a taking-charge
//! receipt and forwarded to the delivery point; valid receipts pass
//! through unchanged; everything else is wrapped into an anomaly envelope.

use std::sync::Arc;

use vpec_common::pec::{classify, Classification, PecType, ReceiptSubtype, X_RIFERIMENTO_HEADER};
use vpec_common::registry::Authority;
use vpec_common::{Envelope, Mailbox};
use vpec_daticert::DatiCert;
use vpec_mail_parser::mail::{DATE_HEADER, FROM_HEADER, SUBJECT_HEADER, TO_HEADER};
use vpec_mail_parser::mime::Mime;
use vpec_mail_parser::{build, Mail};
use vpec_smime::verify_signed;

use crate::receipt::{self, ReceiptKind, ReceiptRequest};
use crate::{anomaly, transport, Artifact, Core, ProcessError};

pub struct ReceptionPoint {
    pub(crate) core: Arc<Core>,
}

/// What the reception point did with an inbound transmission.
#[derive(Debug)]
pub enum RpOutcome {
    /// A valid transport envelope: taking-charge receipt emitted to the
    /// sending provider, envelope forwarded to the delivery point.
    TakenInCharge { receipt: Artifact },
    /// A valid receipt or notice from a certified provider, forwarded
    /// unchanged.
    Forwarded,
    /// Anything else, wrapped and forwarded as an anomaly envelope.
    Anomaly { envelope: Artifact, reason: String },
}

fn is_certification_part(part: &Mime) -> bool {
    part.media_type().map_or(false, |(kind, subtype)| {
        kind.eq_ignore_ascii_case("application") && subtype.eq_ignore_ascii_case("xml")
    }) && part
        .filename()
        .map_or(true, |name| name == "daticert.xml" || name == "postacert.xml")
}

/// Locate and parse the certification XML of a message, if it carries one.
pub(crate) fn certification_of(mail: &mut Mail) -> Result<Option<DatiCert>, String> {
    let part = match mail.find_part(is_certification_part) {
        Ok(Some(part)) => part.clone(),
        Ok(None) => return Ok(None),
        Err(e) => return Err(format!("struttura mime illeggibile: {e}")),
    };

    let decoded =
        build::decode_part(&part).map_err(|e| format!("allegato di certificazione illeggibile: {e}"))?;
    DatiCert::parse_bytes(&decoded)
        .map(Some)
        .map_err(|e| format!("dati di certificazione non validi: {e}"))
}

impl ReceptionPoint {
    /// Process one transmission coming from a peer provider.
    ///
    /// # Errors
    ///
    /// * see [`ProcessError`]
    #[tracing::instrument(skip_all, fields(from = %envelope.reverse_path))]
    pub async fn handle(&self, envelope: &Envelope, raw: &[u8]) -> Result<RpOutcome, ProcessError> {
        let mut mail = Mail::try_from(raw)?;
        let classification = classify(&mail);

        match classification.pec_type {
            PecType::CertifiedEmail => {
                match self.validate_transport(&mut mail, &classification).await {
                    Ok(authority) => {
                        self.take_in_charge(&mail, &classification, &authority, raw)
                            .await
                    }
                    Err(reason) => self.reject(&mail, raw, reason).await,
                }
            }
            pec_type if pec_type.is_receipt() => {
                match self.validate_receipt(&mut mail, &classification).await {
                    Ok(()) => {
                        self.core.delivery_hop.receive(raw).await?;
                        tracing::info!(kind = ?pec_type, "receipt forwarded to the delivery point");
                        Ok(RpOutcome::Forwarded)
                    }
                    Err(reason) => self.reject(&mail, raw, reason).await,
                }
            }
            _ => {
                self.reject(
                    &mail,
                    raw,
                    "il messaggio non \u{e8} una busta di trasporto n\u{e9} una ricevuta valida"
                        .to_string(),
                )
                .await
            }
        }
    }

    /// Emit the taking-charge receipt to the sending provider, then hand
    /// the envelope to the delivery point. Receipt first, per protocol.
    async fn take_in_charge(
        &self,
        mail: &Mail,
        classification: &Classification,
        authority: &Authority,
        raw: &[u8],
    ) -> Result<RpOutcome, ProcessError> {
        let core = &self.core;

        let mut request = ReceiptRequest::new(
            ReceiptKind::TakingCharge,
            Mailbox(authority.notification_address.clone()),
        );
        request.reference_message_id = classification.message_id.clone();
        request.original_subject = mail
            .get_header_value(SUBJECT_HEADER)
            .unwrap_or_default()
            .trim_start_matches("POSTA CERTIFICATA: ")
            .to_string();
        request.original_from = transport::from_address(mail);
        request.recipients = transport::listed_recipients(mail);
        request.reply_to = request.original_from.clone();

        let artifact = receipt::build(core, &request)?;
        core.provider_hop
            .send(
                authority,
                &core.certified_mailbox(),
                std::slice::from_ref(&request.to),
                &artifact.bytes,
            )
            .await?;

        core.delivery_hop.receive(raw).await?;

        tracing::info!(
            message_id = %classification.message_id,
            provider = %authority.name,
            "transport envelope taken in charge"
        );
        Ok(RpOutcome::TakenInCharge { receipt: artifact })
    }

    async fn reject(
        &self,
        mail: &Mail,
        raw: &[u8],
        reason: String,
    ) -> Result<RpOutcome, ProcessError> {
        tracing::warn!(%reason, "inbound wrapped into an anomaly envelope");

        let envelope = anomaly::build(&self.core, mail, raw, &reason)?;
        self.core.delivery_hop.receive(&envelope.bytes).await?;

        Ok(RpOutcome::Anomaly { envelope, reason })
    }

    /// A transport envelope is accepted when its signature verifies, the
    /// signer is a certified provider, and the certification XML agrees
    /// with the header classification.
    async fn validate_transport(
        &self,
        mail: &mut Mail,
        classification: &Classification,
    ) -> Result<Authority, String> {
        let verified = verify_signed(mail)
            .map_err(|e| format!("firma S/MIME non valida: {e}"))?;

        let authority = self
            .core
            .registry
            .by_cert_hash(&verified.signer_fingerprint)
            .await
            .ok_or_else(|| {
                "il gestore mittente non \u{e8} censito nell'indice dei gestori".to_string()
            })?;

        for required in [FROM_HEADER, TO_HEADER, DATE_HEADER] {
            if mail.get_header(required).is_none() {
                return Err(format!("intestazione obbligatoria '{required}' assente"));
            }
        }

        let certification = certification_of(mail)?
            .ok_or_else(|| "busta di trasporto senza dati di certificazione".to_string())?;
        cross_check(classification, &certification)?;

        Ok(authority)
    }

    /// A receipt is accepted when its signature verifies, the signer is a
    /// certified provider, the mandatory headers are present, and the
    /// certification XML, when attached, agrees with the classification.
    async fn validate_receipt(
        &self,
        mail: &mut Mail,
        classification: &Classification,
    ) -> Result<(), String> {
        let verified = verify_signed(mail)
            .map_err(|e| format!("firma S/MIME non valida: {e}"))?;

        self.core
            .registry
            .by_cert_hash(&verified.signer_fingerprint)
            .await
            .ok_or_else(|| {
                "il gestore mittente non \u{e8} censito nell'indice dei gestori".to_string()
            })?;

        for required in [
            DATE_HEADER,
            SUBJECT_HEADER,
            FROM_HEADER,
            TO_HEADER,
            X_RIFERIMENTO_HEADER,
        ] {
            if mail.get_header(required).is_none() {
                return Err(format!("intestazione obbligatoria '{required}' assente"));
            }
        }

        // The `sintetica` flavor carries no XML at all.
        if classification.receipt_subtype != Some(ReceiptSubtype::Sintetica) {
            if let Some(certification) = certification_of(mail)? {
                cross_check(classification, &certification)?;
            }
        }

        Ok(())
    }
}

/// Invariant: header classification and XML `tipo` must name the same
/// event.
fn cross_check(classification: &Classification, certification: &DatiCert) -> Result<(), String> {
    match classification.pec_type.tipo() {
        Some(expected) if expected == certification.tipo.as_str() => Ok(()),
        Some(expected) => Err(format!(
            "classificazione incoerente: intestazioni '{expected}', certificazione '{}'",
            certification.tipo
        )),
        None => Err("il messaggio non ammette dati di certificazione".to_string()),
    }
}
