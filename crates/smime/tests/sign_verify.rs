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

use pretty_assertions::assert_eq;

use vpec_common::Domain;
use vpec_mail_parser::mail::headers::Header;
use vpec_mail_parser::{build, Mail};
use vpec_smime::testing::self_signed_credentials;
use vpec_smime::{seal, verify_signed, SignatureError, Signer};

fn signer() -> Signer {
    let (certificate, key) = self_signed_credentials("pec.b.it");
    Signer::new(
        &certificate,
        &key,
        "pec.b.it".parse::<Domain>().unwrap(),
    )
    .unwrap()
}

fn sample_payload() -> vpec_mail_parser::mime::Mime {
    build::mixed(vec![
        build::text_part("Ricevuta di accettazione\r\n"),
        build::base64_attachment(
            "application/xml",
            "daticert.xml",
            build::Disposition::Attachment,
            b"<postacert tipo=\"accettazione\" errore=\"nessuno\"/>",
        ),
    ])
}

fn sample_headers() -> Vec<Header> {
    vec![
        Header::new("From", "posta-certificata@pec.b.it"),
        Header::new("To", "alice@a.it"),
        Header::new("Subject", "ACCETTAZIONE: prova"),
    ]
}

#[test]
fn sign_then_verify_round_trip() {
    let signer = signer();
    let payload = sample_payload();

    let message = seal(&signer, &sample_headers(), &payload).unwrap();
    let mut mail = Mail::try_from(&message[..]).unwrap();

    let verified = verify_signed(&mut mail).unwrap();

    // what was hashed is what is on the wire.
    let canonical = vpec_smime::canonicalize_crlf(payload.to_string().as_bytes());
    assert_eq!(verified.payload, canonical);

    // the signer certificate travels with the signature.
    assert_eq!(
        verified.signer_cert.to_der().unwrap(),
        signer.certificate().to_der().unwrap()
    );
}

#[test]
fn fingerprint_matches_certificate() {
    let (certificate, key) = self_signed_credentials("pec.b.it");
    let signer = Signer::new(
        &certificate,
        &key,
        "pec.b.it".parse::<Domain>().unwrap(),
    )
    .unwrap();

    let message = seal(&signer, &sample_headers(), &sample_payload()).unwrap();
    let mut mail = Mail::try_from(&message[..]).unwrap();
    let verified = verify_signed(&mut mail).unwrap();

    assert_eq!(
        verified.signer_fingerprint,
        certificate.sha1_fingerprint().unwrap()
    );
    assert_eq!(verified.signer_fingerprint.len(), 40);
    assert!(verified
        .signer_fingerprint
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
}

#[test]
fn signed_part_has_no_bare_lf() {
    let message = seal(&signer(), &sample_headers(), &sample_payload()).unwrap();
    let mut mail = Mail::try_from(&message[..]).unwrap();
    let verified = verify_signed(&mut mail).unwrap();

    for (idx, byte) in verified.payload.iter().enumerate() {
        if *byte == b'\n' {
            assert_eq!(verified.payload[idx - 1], b'\r', "bare LF at offset {idx}");
        }
    }
}

#[test]
fn tampered_payload_is_rejected() {
    let message = seal(&signer(), &sample_headers(), &sample_payload()).unwrap();
    let tampered = String::from_utf8(message)
        .unwrap()
        .replace("Ricevuta di accettazione", "Ricevuta di alterazione");

    let mut mail = Mail::try_from(tampered.as_str()).unwrap();
    assert!(matches!(
        verify_signed(&mut mail),
        Err(SignatureError::BadSignature(_))
    ));
}

#[test]
fn unsigned_message_is_rejected() {
    let mut mail = Mail::try_from(
        "From: alice@a.it\r\nSubject: ciao\r\n\r\nnessuna firma\r\n",
    )
    .unwrap();

    assert!(matches!(
        verify_signed(&mut mail),
        Err(SignatureError::NotSigned)
    ));
}

#[test]
fn signature_from_another_signer_still_verifies_but_differs() {
    // RP trust is decided by the registry on the fingerprint, not here.
    let other = {
        let (certificate, key) = self_signed_credentials("pec.evil.it");
        Signer::new(&certificate, &key, "pec.evil.it".parse::<Domain>().unwrap()).unwrap()
    };
    let trusted = signer();

    let message = seal(&other, &sample_headers(), &sample_payload()).unwrap();
    let mut mail = Mail::try_from(&message[..]).unwrap();
    let verified = verify_signed(&mut mail).unwrap();

    assert_ne!(
        verified.signer_cert.to_der().unwrap(),
        trusted.certificate().to_der().unwrap()
    );
}
