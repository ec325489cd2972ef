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

//! The receipt factory.
//!
//! Every receipt is a `multipart/signed` wrapping a `multipart/mixed` of a
//! text+html alternative, the `daticert.xml` attachment, and, for full
//! delivery receipts to a primary recipient, the original message.

use vpec_common::pec::{ReceiptSubtype, X_RICEVUTA_HEADER, X_RIFERIMENTO_HEADER, X_TIPO_RICEVUTA_EMITTED_HEADER};
use vpec_common::Mailbox;
use vpec_daticert::{Dati, DatiCert, Destinatari, Intestazione, Tipo};
use vpec_mail_parser::build;
use vpec_mail_parser::mail::headers::Header;
use vpec_mail_parser::mail::{DATE_HEADER, FROM_HEADER, MESSAGE_ID_HEADER, SUBJECT_HEADER, TO_HEADER};

use crate::error::ProcessError;
use crate::{locale, Artifact, Core};

/// The five receipt artifacts the kernel emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    Acceptance,
    NonAcceptance,
    TakingCharge,
    Delivery,
    DeliveryError,
}

impl ReceiptKind {
    #[must_use]
    pub const fn x_ricevuta(self) -> &'static str {
        match self {
            Self::Acceptance => "accettazione",
            Self::NonAcceptance => "non-accettazione",
            Self::TakingCharge => "presa-in-carico",
            Self::Delivery => "avvenuta-consegna",
            Self::DeliveryError => "errore-consegna",
        }
    }

    #[must_use]
    pub const fn subject_prefix(self) -> &'static str {
        match self {
            Self::Acceptance => "ACCETTAZIONE",
            Self::NonAcceptance => "AVVISO DI NON ACCETTAZIONE",
            Self::TakingCharge => "PRESA IN CARICO",
            Self::Delivery => "CONSEGNA",
            Self::DeliveryError => "ERRORE CONSEGNA",
        }
    }

    const fn tipo(self) -> Tipo {
        match self {
            Self::Acceptance => Tipo::Accettazione,
            Self::NonAcceptance => Tipo::NonAccettazione,
            Self::TakingCharge => Tipo::PresaInCarico,
            Self::Delivery => Tipo::AvvenutaConsegna,
            Self::DeliveryError => Tipo::ErroreConsegna,
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Acceptance => "Ricevuta di accettazione",
            Self::NonAcceptance => "Errore nell'accettazione del messaggio",
            Self::TakingCharge => "Ricevuta di presa in carico",
            Self::Delivery => "Ricevuta di avvenuta consegna",
            Self::DeliveryError => "Avviso di mancata consegna",
        }
    }
}

/// Everything a receipt says about the message it certifies.
#[derive(Debug, Clone)]
pub struct ReceiptRequest {
    pub kind: ReceiptKind,
    /// `Message-ID` of the referenced message, verbatim.
    pub reference_message_id: String,
    pub original_subject: String,
    /// Address of the original sender.
    pub original_from: String,
    /// Addresses the original message was directed to.
    pub recipients: Vec<String>,
    /// `risposte` of the certification XML.
    pub reply_to: String,
    /// Addressee of the receipt itself.
    pub to: Mailbox,
    /// Delivery receipts only; other kinds are always full.
    pub subtype: ReceiptSubtype,
    /// Attach the original message (full delivery receipts to primary
    /// recipients).
    pub original: Option<Vec<u8>>,
    /// Human-readable failure cause (non-acceptance and delivery-error).
    pub error_reason: Option<String>,
    /// Mailbox the message was (not) delivered to (delivery kinds).
    pub delivered_to: Option<String>,
}

impl ReceiptRequest {
    #[must_use]
    pub fn new(kind: ReceiptKind, to: Mailbox) -> Self {
        Self {
            kind,
            reference_message_id: String::new(),
            original_subject: String::new(),
            original_from: String::new(),
            recipients: Vec::new(),
            reply_to: String::new(),
            to,
            subtype: ReceiptSubtype::Normale,
            original: None,
            error_reason: None,
            delivered_to: None,
        }
    }
}

fn recipients_block(recipients: &[String]) -> String {
    if recipients.is_empty() {
        "(nessun destinatario)".to_string()
    } else {
        recipients
            .iter()
            .map(|rcpt| format!("{rcpt} (\"posta certificata\")"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn text_body(request: &ReceiptRequest, at: time::OffsetDateTime) -> String {
    let giorno = locale::giorno(at);
    let ora = locale::ora(at);
    let zona = locale::zona(at);
    let subject = &request.original_subject;
    let from = &request.original_from;
    let reference = &request.reference_message_id;

    match request.kind {
        ReceiptKind::Acceptance => format!(
            "Ricevuta di accettazione\n\n\
             Il giorno {giorno} alle ore {ora} ({zona}) il messaggio\n\
             \"{subject}\" proveniente da \"{from}\"\n\
             ed indirizzato a:\n{}\n\
             \u{e8} stato accettato dal sistema ed inoltrato.\n\
             Identificativo messaggio: {reference}\n",
            recipients_block(&request.recipients),
        ),
        ReceiptKind::NonAcceptance => format!(
            "Errore nell'accettazione del messaggio\n\n\
             Il giorno {giorno} alle ore {ora} ({zona}) nel messaggio\n\
             \"{subject}\" proveniente da \"{from}\"\n\
             ed indirizzato a:\n{}\n\
             \u{e8} stato rilevato un problema che ne impedisce l'accettazione\n\
             a causa di {}.\n\
             Il messaggio non \u{e8} stato accettato.\n\
             Identificativo messaggio: {reference}\n",
            recipients_block(&request.recipients),
            request
                .error_reason
                .as_deref()
                .unwrap_or("un errore non specificato"),
        ),
        ReceiptKind::TakingCharge => format!(
            "Ricevuta di presa in carico\n\n\
             Il giorno {giorno} alle ore {ora} ({zona}) il messaggio\n\
             \"{subject}\" proveniente da \"{from}\"\n\
             ed indirizzato a:\n{}\n\
             \u{e8} stato preso in carico dal sistema.\n\
             Identificativo messaggio: {reference}\n",
            recipients_block(&request.recipients),
        ),
        ReceiptKind::Delivery if request.subtype == ReceiptSubtype::Sintetica => format!(
            "Ricevuta di avvenuta consegna\n\n\
             Consegnato a \"{}\" il {giorno} alle {ora} ({zona}).\n\
             Identificativo messaggio: {reference}\n",
            request.delivered_to.as_deref().unwrap_or_default(),
        ),
        ReceiptKind::Delivery => format!(
            "Ricevuta di avvenuta consegna\n\n\
             Il giorno {giorno} alle ore {ora} ({zona}) il messaggio\n\
             \"{subject}\" proveniente da \"{from}\"\n\
             ed indirizzato a \"{}\"\n\
             \u{e8} stato consegnato nella casella di destinazione.\n\
             Identificativo messaggio: {reference}\n",
            request.delivered_to.as_deref().unwrap_or_default(),
        ),
        ReceiptKind::DeliveryError => format!(
            "Avviso di mancata consegna\n\n\
             Il giorno {giorno} alle ore {ora} ({zona}) il messaggio\n\
             \"{subject}\" proveniente da \"{from}\"\n\
             ed indirizzato a \"{}\"\n\
             non \u{e8} stato consegnato\n\
             a causa di {}.\n\
             Identificativo messaggio: {reference}\n",
            request.delivered_to.as_deref().unwrap_or_default(),
            request
                .error_reason
                .as_deref()
                .unwrap_or("un errore non specificato"),
        ),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn html_body(kind: ReceiptKind, text: &str) -> String {
    format!(
        "<html>\n<head><title>{title}</title></head>\n<body>\n\
         <h3>{title}</h3>\n<hr>\n<pre>{}</pre>\n</body>\n</html>\n",
        escape_html(text),
        title = kind.title(),
    )
}

fn certification(
    core: &Core,
    request: &ReceiptRequest,
    at: time::OffsetDateTime,
    identificativo: &str,
) -> DatiCert {
    DatiCert {
        tipo: request.kind.tipo(),
        errore: if request.error_reason.is_some() {
            "altro".to_string()
        } else {
            "nessuno".to_string()
        },
        intestazione: Intestazione {
            mittente: request.original_from.clone(),
            destinatari: Destinatari {
                tipo: "certificato".to_string(),
                addresses: request.recipients.join(", "),
            },
            risposte: request.reply_to.clone(),
            oggetto: request.original_subject.clone(),
        },
        dati: Dati {
            gestore_emittente: core.provider_name.clone(),
            data: locale::data_element(at),
            identificativo: identificativo.to_string(),
            msgid: request.reference_message_id.clone(),
            consegna: request.delivered_to.clone(),
            errore_esteso: match request.kind {
                ReceiptKind::DeliveryError => request.error_reason.clone(),
                _ => None,
            },
        },
    }
}

/// Assemble and sign a receipt.
///
/// # Errors
///
/// * The certification XML could not be built.
/// * Signing failed; fatal for this receipt.
pub fn build(core: &Core, request: &ReceiptRequest) -> Result<Artifact, ProcessError> {
    let at = core.now();
    let message_id = core.message_ids.generate_at(at);
    let identificativo = message_id
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string();

    let text = text_body(request, at);
    let mut parts = vec![build::alternative(
        build::text_part(&text),
        build::html_part(&html_body(request.kind, &text)),
    )];

    // `sintetica`: short text only, no certification XML.
    if request.subtype != ReceiptSubtype::Sintetica {
        let xml = certification(core, request, at, &identificativo).to_xml()?;
        parts.push(build::base64_attachment(
            "application/xml",
            "daticert.xml",
            build::Disposition::Inline,
            &xml,
        ));
    }

    // The original message travels only in full delivery receipts.
    if request.subtype == ReceiptSubtype::Normale {
        if let Some(original) = &request.original {
            parts.push(build::rfc822_attachment("messaggio-originale.eml", original)?);
        }
    }

    let mut headers = vec![
        Header::new(MESSAGE_ID_HEADER, &message_id),
        Header::new(DATE_HEADER, locale::date_header(at)),
        Header::new(
            SUBJECT_HEADER,
            format!(
                "{}: {}",
                request.kind.subject_prefix(),
                request.original_subject
            ),
        ),
        Header::new(FROM_HEADER, core.certified_address()),
        Header::new(TO_HEADER, request.to.to_string()),
        Header::new(X_RIFERIMENTO_HEADER, &request.reference_message_id),
        Header::new(X_RICEVUTA_HEADER, request.kind.x_ricevuta()),
    ];
    if request.kind == ReceiptKind::Delivery {
        headers.push(Header::new(
            X_TIPO_RICEVUTA_EMITTED_HEADER,
            request.subtype.as_str(),
        ));
    }

    let bytes = vpec_smime::seal(&core.signer, &headers, &build::mixed(parts))?;

    Ok(Artifact { message_id, bytes })
}
