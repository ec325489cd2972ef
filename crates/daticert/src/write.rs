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

//! Event-based emitter. Serde serialization is avoided on purpose: the
//! emitted bytes are covered by the artifact signature, so the layout is
//! pinned down here, element by element.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::{DatiCert, DatiCertError};

type XmlWriter = Writer<Vec<u8>>;

pub(crate) fn to_xml(cert: &DatiCert) -> Result<Vec<u8>, DatiCertError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("postacert");
    root.push_attribute(("tipo", cert.tipo.as_str()));
    root.push_attribute(("errore", cert.errore.as_str()));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("intestazione")))?;
    text_element(&mut writer, "mittente", &cert.intestazione.mittente)?;
    {
        let mut destinatari = BytesStart::new("destinatari");
        destinatari.push_attribute(("tipo", cert.intestazione.destinatari.tipo.as_str()));
        if cert.intestazione.destinatari.addresses.is_empty() {
            writer.write_event(Event::Empty(destinatari))?;
        } else {
            writer.write_event(Event::Start(destinatari))?;
            writer.write_event(Event::Text(BytesText::new(
                &cert.intestazione.destinatari.addresses,
            )))?;
            writer.write_event(Event::End(BytesEnd::new("destinatari")))?;
        }
    }
    text_element(&mut writer, "risposte", &cert.intestazione.risposte)?;
    text_element(&mut writer, "oggetto", &cert.intestazione.oggetto)?;
    writer.write_event(Event::End(BytesEnd::new("intestazione")))?;

    writer.write_event(Event::Start(BytesStart::new("dati")))?;
    text_element(&mut writer, "gestore-emittente", &cert.dati.gestore_emittente)?;
    {
        let mut data = BytesStart::new("data");
        data.push_attribute(("zona", cert.dati.data.zona.as_str()));
        writer.write_event(Event::Start(data))?;
        text_element(&mut writer, "giorno", &cert.dati.data.giorno)?;
        text_element(&mut writer, "ora", &cert.dati.data.ora)?;
        writer.write_event(Event::End(BytesEnd::new("data")))?;
    }
    text_element(&mut writer, "identificativo", &cert.dati.identificativo)?;
    text_element(&mut writer, "msgid", &cert.dati.msgid)?;
    if let Some(consegna) = &cert.dati.consegna {
        text_element(&mut writer, "consegna", consegna)?;
    }
    if let Some(errore_esteso) = &cert.dati.errore_esteso {
        text_element(&mut writer, "errore-esteso", errore_esteso)?;
    }
    writer.write_event(Event::End(BytesEnd::new("dati")))?;

    writer.write_event(Event::End(BytesEnd::new("postacert")))?;

    Ok(writer.into_inner())
}

fn text_element(writer: &mut XmlWriter, name: &str, value: &str) -> Result<(), DatiCertError> {
    if value.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
        return Ok(());
    }

    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
