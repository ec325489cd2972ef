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

//! The PEC certification XML.
//!
//! Receipts attach it as `daticert.xml`, transport envelopes as
//! `postacert.xml`; the schema is the same. The wire root element is
//! `<postacert>`, but some legacy providers still emit `<daticert>`, so the
//! parser does not key on the root name. Egress always writes
//! `<postacert>` and is byte-deterministic, since the emitted document ends
//! up under a detached signature.

use serde::Deserialize;

mod write;

#[derive(Debug, thiserror::Error)]
pub enum DatiCertError {
    #[error("failed to parse the certification xml: {0}")]
    Parse(#[from] quick_xml::DeError),
    #[error("failed to serialize the certification xml: {0}")]
    Write(#[from] quick_xml::Error),
    #[error("failed to write the certification xml: {0}")]
    Io(#[from] std::io::Error),
}

/// Event category certified by the document, the `tipo` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tipo {
    Accettazione,
    AvvenutaConsegna,
    ErroreConsegna,
    PostaCertificata,
    PresaInCarico,
    NonAccettazione,
}

impl Tipo {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accettazione => "accettazione",
            Self::AvvenutaConsegna => "avvenuta-consegna",
            Self::ErroreConsegna => "errore-consegna",
            Self::PostaCertificata => "posta-certificata",
            Self::PresaInCarico => "presa-in-carico",
            Self::NonAccettazione => "non-accettazione",
        }
    }
}

impl std::fmt::Display for Tipo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The certification document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatiCert {
    #[serde(rename = "@tipo")]
    pub tipo: Tipo,
    /// `nessuno` when the certified event is not an error.
    #[serde(rename = "@errore", default = "errore_nessuno")]
    pub errore: String,
    pub intestazione: Intestazione,
    pub dati: Dati,
}

fn errore_nessuno() -> String {
    "nessuno".to_string()
}

/// Routing section: the addresses the certified event is about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Intestazione {
    pub mittente: String,
    pub destinatari: Destinatari,
    /// Reply address of the original message.
    #[serde(default)]
    pub risposte: String,
    #[serde(default)]
    pub oggetto: String,
}

/// `destinatari` element: comma separated addresses plus their kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Destinatari {
    #[serde(rename = "@tipo", default = "destinatari_certificato")]
    pub tipo: String,
    #[serde(rename = "$text", default)]
    pub addresses: String,
}

fn destinatari_certificato() -> String {
    "certificato".to_string()
}

/// Certification data proper.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dati {
    #[serde(rename = "gestore-emittente")]
    pub gestore_emittente: String,
    pub data: Data,
    /// PEC identifier assigned by the emitting provider.
    pub identificativo: String,
    /// `Message-ID` of the original message, angle brackets included.
    #[serde(default)]
    pub msgid: String,
    /// Mailbox the message was delivered to. Delivery receipts and
    /// delivery-error notices only.
    #[serde(default)]
    pub consegna: Option<String>,
    /// Extended error description. `errore-consegna` only.
    #[serde(rename = "errore-esteso", default)]
    pub errore_esteso: Option<String>,
}

/// Italian-locale event timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Data {
    /// UTC offset, `+hhmm`.
    #[serde(rename = "@zona", default)]
    pub zona: String,
    /// `DD/MM/YYYY`.
    pub giorno: String,
    /// `HH:MM:SS`.
    pub ora: String,
}

impl DatiCert {
    /// Parse a certification document, `<postacert>` or `<daticert>` rooted.
    ///
    /// # Errors
    ///
    /// * The document is not valid xml or does not match the schema.
    pub fn parse(content: &str) -> Result<Self, DatiCertError> {
        Ok(quick_xml::de::from_str(content.trim())?)
    }

    /// Parse from raw (already transfer-decoded) bytes.
    ///
    /// # Errors
    ///
    /// * The document is not valid utf8, not valid xml, or does not match
    ///   the schema.
    pub fn parse_bytes(content: &[u8]) -> Result<Self, DatiCertError> {
        let content = std::str::from_utf8(content)
            .map_err(|e| DatiCertError::Parse(serde::de::Error::custom(e)))?;
        Self::parse(content)
    }

    /// Serialize to the wire form: UTF-8, XML declaration, `<postacert>`
    /// root, two-space indent.
    ///
    /// # Errors
    ///
    /// * The writer failed, which cannot happen on an in-memory buffer.
    pub fn to_xml(&self) -> Result<Vec<u8>, DatiCertError> {
        write::to_xml(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<postacert tipo="accettazione" errore="nessuno">
  <intestazione>
    <mittente>alice@a.it</mittente>
    <destinatari tipo="certificato">bob@b.it, dan@d.it</destinatari>
    <risposte>alice@a.it</risposte>
    <oggetto>Saluti &amp; auguri</oggetto>
  </intestazione>
  <dati>
    <gestore-emittente>A PEC S.p.A.</gestore-emittente>
    <data zona="+0100">
      <giorno>06/11/2023</giorno>
      <ora>10:21:13</ora>
    </data>
    <identificativo>opec231106.20231106102113.000042.000.1.53@a.it</identificativo>
    <msgid>&lt;m1@a.it&gt;</msgid>
  </dati>
</postacert>"#;

    #[test]
    fn parse_sample() {
        let parsed = DatiCert::parse(SAMPLE).unwrap();

        assert_eq!(parsed.tipo, Tipo::Accettazione);
        assert_eq!(parsed.errore, "nessuno");
        assert_eq!(parsed.intestazione.mittente, "alice@a.it");
        assert_eq!(parsed.intestazione.destinatari.tipo, "certificato");
        assert_eq!(parsed.intestazione.destinatari.addresses, "bob@b.it, dan@d.it");
        assert_eq!(parsed.intestazione.oggetto, "Saluti & auguri");
        assert_eq!(parsed.dati.data.giorno, "06/11/2023");
        assert_eq!(parsed.dati.msgid, "<m1@a.it>");
        assert_eq!(parsed.dati.consegna, None);
    }

    #[test]
    fn parse_accepts_daticert_root() {
        let legacy = SAMPLE.replace("<postacert", "<daticert").replace(
            "</postacert>",
            "</daticert>",
        );
        let parsed = DatiCert::parse(&legacy).unwrap();
        assert_eq!(parsed.tipo, Tipo::Accettazione);
    }

    #[test]
    fn parse_rejects_unknown_tipo() {
        let broken = SAMPLE.replace("accettazione", "sconosciuto");
        assert!(DatiCert::parse(&broken).is_err());
    }

    #[test]
    fn emit_then_parse_round_trip() {
        let parsed = DatiCert::parse(SAMPLE).unwrap();
        let emitted = parsed.to_xml().unwrap();

        let emitted_str = std::str::from_utf8(&emitted).unwrap();
        assert!(emitted_str.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(emitted_str.contains("<postacert tipo=\"accettazione\" errore=\"nessuno\">"));

        assert_eq!(DatiCert::parse(emitted_str).unwrap(), parsed);
    }

    #[test]
    fn emit_delivery_fields() {
        let mut cert = DatiCert::parse(SAMPLE).unwrap();
        cert.tipo = Tipo::ErroreConsegna;
        cert.errore = "no-dest".to_string();
        cert.dati.consegna = Some("bob@b.it".to_string());
        cert.dati.errore_esteso = Some("casella inesistente".to_string());

        let emitted = String::from_utf8(cert.to_xml().unwrap()).unwrap();
        assert!(emitted.contains("<consegna>bob@b.it</consegna>"));
        assert!(emitted.contains("<errore-esteso>casella inesistente</errore-esteso>"));

        assert_eq!(DatiCert::parse(&emitted).unwrap(), cert);
    }

    #[test]
    fn emission_is_deterministic() {
        let cert = DatiCert::parse(SAMPLE).unwrap();
        assert_eq!(cert.to_xml().unwrap(), cert.to_xml().unwrap());
    }
}
