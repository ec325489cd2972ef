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

//! PEC semantics of a message, derived from its headers alone.

use vpec_mail_parser::Mail;

use crate::Envelope;

pub const X_TRASPORTO_HEADER: &str = "X-Trasporto";
pub const X_RICEVUTA_HEADER: &str = "X-Ricevuta";
pub const X_RIFERIMENTO_HEADER: &str = "X-Riferimento-Message-ID";
/// Requested receipt flavor, set by the sender on the original message and
/// inherited by the transport envelope.
pub const X_TIPO_RICEVUTA_HEADER: &str = "X-TipoRicevuta";
/// Receipt flavor marker on an emitted delivery receipt.
pub const X_TIPO_RICEVUTA_EMITTED_HEADER: &str = "X-Tipo-Ricevuta";

pub const TRASPORTO_POSTA_CERTIFICATA: &str = "posta-certificata";
pub const TRASPORTO_ERRORE: &str = "errore";

/// PEC category of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PecType {
    /// Not a PEC artifact at all.
    None,
    /// A transport envelope (`busta di trasporto`).
    CertifiedEmail,
    /// `ricevuta di accettazione`.
    AcceptanceReceipt,
    /// `ricevuta di presa in carico`.
    TakingChargeReceipt,
    /// `ricevuta di avvenuta consegna`.
    DeliveryReceipt,
    /// `avviso di mancata consegna`.
    DeliveryErrorReceipt,
    /// `avviso di non accettazione`.
    NonAcceptanceReceipt,
    /// `busta di anomalia`.
    AnomalyEnvelope,
}

impl PecType {
    /// Canonical `tipo` string carried by the certification XML for this
    /// category, when the category has one.
    #[must_use]
    pub const fn tipo(self) -> Option<&'static str> {
        match self {
            Self::CertifiedEmail => Some("posta-certificata"),
            Self::AcceptanceReceipt => Some("accettazione"),
            Self::TakingChargeReceipt => Some("presa-in-carico"),
            Self::DeliveryReceipt => Some("avvenuta-consegna"),
            Self::DeliveryErrorReceipt => Some("errore-consegna"),
            Self::NonAcceptanceReceipt => Some("non-accettazione"),
            Self::None | Self::AnomalyEnvelope => None,
        }
    }

    /// Whether the category is one of the receipt kinds.
    #[must_use]
    pub const fn is_receipt(self) -> bool {
        matches!(
            self,
            Self::AcceptanceReceipt
                | Self::TakingChargeReceipt
                | Self::DeliveryReceipt
                | Self::DeliveryErrorReceipt
                | Self::NonAcceptanceReceipt
        )
    }
}

/// Requested flavor of a delivery receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReceiptSubtype {
    /// Full receipt: text, certification XML and original message.
    #[default]
    Normale,
    /// Text and certification XML, no original message.
    Breve,
    /// Short text only.
    Sintetica,
}

impl ReceiptSubtype {
    /// Parse the `X-TipoRicevuta` value; absent or unrecognized values mean
    /// a full receipt.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("breve") => Self::Breve,
            Some(v) if v.eq_ignore_ascii_case("sintetica") => Self::Sintetica,
            _ => Self::Normale,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normale => "normale",
            Self::Breve => "breve",
            Self::Sintetica => "sintetica",
        }
    }
}

/// Classification of a message plus the identifiers extracted along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub pec_type: PecType,
    /// `Message-ID` value, verbatim, angle brackets preserved.
    pub message_id: String,
    /// `X-Riferimento-Message-ID` value, verbatim.
    pub reference_message_id: Option<String>,
    pub receipt_subtype: Option<ReceiptSubtype>,
}

/// A received message together with its envelope and PEC semantics.
#[derive(Debug, Clone)]
pub struct PecMail {
    pub envelope: Envelope,
    pub message_id: String,
    pub pec_type: PecType,
    pub reference_message_id: Option<String>,
    pub receipt_subtype: Option<ReceiptSubtype>,
}

impl PecMail {
    #[must_use]
    pub fn new(envelope: Envelope, mail: &Mail) -> Self {
        let Classification {
            pec_type,
            message_id,
            reference_message_id,
            receipt_subtype,
        } = classify(mail);

        Self {
            envelope,
            message_id,
            pec_type,
            reference_message_id,
            receipt_subtype,
        }
    }
}

/// `X-Ricevuta` values, longest token first: `non-accettazione` and
/// `preavviso-errore-consegna` would otherwise match the probe of the
/// receipt they contain.
const RICEVUTA_TOKENS: [(&str, PecType); 6] = [
    ("non-accettazione", PecType::NonAcceptanceReceipt),
    ("preavviso-errore-consegna", PecType::DeliveryErrorReceipt),
    ("accettazione", PecType::AcceptanceReceipt),
    ("avvenuta-consegna", PecType::DeliveryReceipt),
    ("errore-consegna", PecType::DeliveryErrorReceipt),
    ("presa-in-carico", PecType::TakingChargeReceipt),
];

/// Determine the PEC category of a message from its headers. Pure function,
/// headers only: the certification XML is reconciled with this result by the
/// caller.
///
/// Matching is case-insensitive on the trimmed header value, by substring.
#[must_use]
pub fn classify(mail: &Mail) -> Classification {
    let trasporto = mail
        .get_header_value(X_TRASPORTO_HEADER)
        .map(str::to_ascii_lowercase);
    let ricevuta = mail
        .get_header_value(X_RICEVUTA_HEADER)
        .map(str::to_ascii_lowercase);

    let pec_type = if trasporto
        .as_deref()
        .map_or(false, |t| t.contains(TRASPORTO_POSTA_CERTIFICATA))
    {
        PecType::CertifiedEmail
    } else if let Some(found) = ricevuta.as_deref().and_then(|value| {
        RICEVUTA_TOKENS
            .iter()
            .find(|(token, _)| value.contains(token))
            .map(|(_, pec_type)| *pec_type)
    }) {
        found
    } else if trasporto
        .as_deref()
        .map_or(false, |t| t.contains(TRASPORTO_ERRORE))
    {
        PecType::AnomalyEnvelope
    } else {
        PecType::None
    };

    Classification {
        pec_type,
        message_id: mail
            .get_header_value(vpec_mail_parser::mail::MESSAGE_ID_HEADER)
            .unwrap_or_default()
            .to_string(),
        reference_message_id: mail
            .get_header_value(X_RIFERIMENTO_HEADER)
            .map(str::to_string),
        receipt_subtype: mail
            .get_header_value(X_TIPO_RICEVUTA_HEADER)
            .map(|value| ReceiptSubtype::from_header(Some(value))),
    }
}
