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

//! The transport envelope (`busta di trasporto`): the wrapper the access
//! point puts around an accepted message before handing it to the
//! recipient's provider.

use vpec_common::address::parse_address_list;
use vpec_common::pec::{
    TRASPORTO_POSTA_CERTIFICATA, X_RIFERIMENTO_HEADER, X_TIPO_RICEVUTA_HEADER, X_TRASPORTO_HEADER,
};
use vpec_daticert::{Dati, DatiCert, Destinatari, Intestazione, Tipo};
use vpec_mail_parser::build;
use vpec_mail_parser::mail::headers::Header;
use vpec_mail_parser::mail::{
    CC_HEADER, DATE_HEADER, FROM_HEADER, MESSAGE_ID_HEADER, RECEIVED_HEADER, REPLY_TO_HEADER,
    RETURN_PATH_HEADER, SUBJECT_HEADER, TO_HEADER,
};
use vpec_mail_parser::Mail;

use crate::error::ProcessError;
use crate::{locale, Artifact, Core};

/// Headers copied verbatim from the accepted message, `Received:` trace
/// order preserved.
const INHERITED_HEADERS: [&str; 7] = [
    RECEIVED_HEADER,
    TO_HEADER,
    CC_HEADER,
    RETURN_PATH_HEADER,
    MESSAGE_ID_HEADER,
    X_RIFERIMENTO_HEADER,
    X_TIPO_RICEVUTA_HEADER,
];

/// Addresses listed in `To` and `Cc`, as displayable strings.
pub(crate) fn listed_recipients(mail: &Mail) -> Vec<String> {
    [TO_HEADER, CC_HEADER]
        .iter()
        .filter_map(|name| mail.get_header_value(name))
        .filter_map(|value| parse_address_list(value).ok())
        .flatten()
        .map(|address| address.to_string())
        .collect()
}

/// First address of the `From` header, falling back to the raw value.
pub(crate) fn from_address(mail: &Mail) -> String {
    let raw = mail.get_header_value(FROM_HEADER).unwrap_or_default();
    parse_address_list(raw)
        .ok()
        .and_then(|addresses| addresses.first().map(ToString::to_string))
        .unwrap_or_else(|| raw.to_string())
}

/// Wrap an accepted message into a signed transport envelope.
///
/// # Errors
///
/// * The certification XML could not be built, or signing failed.
pub fn build(core: &Core, mail: &Mail, raw: &[u8]) -> Result<Artifact, ProcessError> {
    let at = core.now();

    let mut headers = Vec::new();
    for name in INHERITED_HEADERS {
        headers.extend(mail.get_headers(name).cloned());
    }

    // The envelope travels under the original message identifier; a fresh
    // one is assigned only when the sender did not provide any.
    let message_id = match mail.get_header_value(MESSAGE_ID_HEADER) {
        Some(id) => id.to_string(),
        None => {
            let generated = core.message_ids.generate_at(at);
            headers.push(Header::new(MESSAGE_ID_HEADER, &generated));
            generated
        }
    };

    let original_subject = mail.get_header_value(SUBJECT_HEADER).unwrap_or_default();
    let original_from = from_address(mail);
    let recipients = listed_recipients(mail);

    headers.push(Header::new(X_TRASPORTO_HEADER, TRASPORTO_POSTA_CERTIFICATA));
    headers.push(Header::new(DATE_HEADER, locale::date_header(at)));
    headers.push(Header::new(
        SUBJECT_HEADER,
        format!("POSTA CERTIFICATA: {original_subject}"),
    ));
    headers.push(Header::new(
        FROM_HEADER,
        format!(
            "\"Per conto di: {original_from}\" <{}>",
            core.certified_address()
        ),
    ));
    if mail.get_header(REPLY_TO_HEADER).is_none() {
        headers.push(Header::new(REPLY_TO_HEADER, &original_from));
    }

    let text = format!(
        "Messaggio di posta certificata\n\n\
         Il giorno {} alle ore {} ({}) il messaggio\n\
         \"{original_subject}\" \u{e8} stato inviato da \"{original_from}\"\n\
         indirizzato a:\n{}\n\n\
         Il messaggio originale \u{e8} incluso in allegato.\n\
         Identificativo messaggio: {message_id}\n",
        locale::giorno(at),
        locale::ora(at),
        locale::zona(at),
        recipients.join("\n"),
    );

    let certification = DatiCert {
        tipo: Tipo::PostaCertificata,
        errore: "nessuno".to_string(),
        intestazione: Intestazione {
            mittente: original_from.clone(),
            destinatari: Destinatari {
                tipo: "certificato".to_string(),
                addresses: recipients.join(", "),
            },
            risposte: mail
                .get_header_value(REPLY_TO_HEADER)
                .unwrap_or(&original_from)
                .to_string(),
            oggetto: original_subject.to_string(),
        },
        dati: Dati {
            gestore_emittente: core.provider_name.clone(),
            data: locale::data_element(at),
            identificativo: message_id
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string(),
            msgid: message_id.clone(),
            consegna: None,
            errore_esteso: None,
        },
    };

    let payload = build::mixed(vec![
        build::text_part(&text),
        build::rfc822_attachment("messaggio-originale.eml", raw)?,
        build::base64_attachment(
            "application/xml",
            "postacert.xml",
            build::Disposition::Attachment,
            &certification.to_xml()?,
        ),
    ]);

    let bytes = vpec_smime::seal(&core.signer, &headers, &payload)?;

    Ok(Artifact { message_id, bytes })
}
