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

//! The anomaly envelope (`busta di anomalia`): the wrapper the reception
//! point puts around inbound traffic that is neither a valid transport
//! envelope nor a valid receipt from a certified provider.

use vpec_common::pec::{TRASPORTO_ERRORE, X_TRASPORTO_HEADER};
use vpec_mail_parser::build;
use vpec_mail_parser::mail::headers::Header;
use vpec_mail_parser::mail::{
    CC_HEADER, DATE_HEADER, FROM_HEADER, MESSAGE_ID_HEADER, RECEIVED_HEADER, REPLY_TO_HEADER,
    RETURN_PATH_HEADER, SUBJECT_HEADER, TO_HEADER,
};
use vpec_mail_parser::Mail;

use crate::error::ProcessError;
use crate::transport::{from_address, listed_recipients};
use crate::{locale, Artifact, Core};

const INHERITED_HEADERS: [&str; 5] = [
    RECEIVED_HEADER,
    TO_HEADER,
    CC_HEADER,
    RETURN_PATH_HEADER,
    MESSAGE_ID_HEADER,
];

/// Wrap an uncertifiable inbound into a signed anomaly envelope.
///
/// The `X-Trasporto: errore` marker tells the delivery point that the
/// content was not certified, whatever the wrapping signature says.
///
/// # Errors
///
/// * Signing failed.
pub fn build(core: &Core, mail: &Mail, raw: &[u8], reason: &str) -> Result<Artifact, ProcessError> {
    let at = core.now();

    let mut headers = Vec::new();
    for name in INHERITED_HEADERS {
        headers.extend(mail.get_headers(name).cloned());
    }

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

    headers.push(Header::new(X_TRASPORTO_HEADER, TRASPORTO_ERRORE));
    headers.push(Header::new(DATE_HEADER, locale::date_header(at)));
    headers.push(Header::new(
        SUBJECT_HEADER,
        format!("ANOMALIA MESSAGGIO: {original_subject}"),
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
        "Anomalia nel messaggio\n\n\
         Il giorno {} alle ore {} ({}) \u{e8} stato ricevuto\n\
         il messaggio \"{original_subject}\" proveniente da \"{original_from}\"\n\
         ed indirizzato a:\n{}\n\
         Tali dati non sono stati certificati per il seguente errore:\n{reason}\n\
         Il messaggio originale \u{e8} incluso in allegato.\n",
        locale::giorno(at),
        locale::ora(at),
        locale::zona(at),
        listed_recipients(mail).join("\n"),
    );

    let payload = build::mixed(vec![
        build::text_part(&text),
        build::rfc822_attachment("messaggio-originale.eml", raw)?,
    ]);

    let bytes = vpec_smime::seal(&core.signer, &headers, &payload)?;

    Ok(Artifact { message_id, bytes })
}
