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

use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;

use vpec_mail_parser::mail::body::Body;
use vpec_mail_parser::mime::{Mime, Part};
use vpec_mail_parser::{build, Mail};

use crate::canonicalize::canonicalize_crlf;
use crate::certificate;
use crate::{PKCS7_SIGNATURE_TYPE, PKCS7_SIGNATURE_TYPE_LEGACY};

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// The message is not a `multipart/signed` entity.
    #[error("the message does not carry an S/MIME signature")]
    NotSigned,
    /// The signature does not verify against the signed bytes, or is not a
    /// well-formed PKCS#7 structure.
    #[error("signature verification failed: {0}")]
    BadSignature(String),
    /// The signature is formally valid but the signer is not a certified
    /// provider. Raised by the registry cross-check, not here.
    #[error("the signer is not a certified provider")]
    UntrustedSigner,
}

/// Outcome of a successful verification.
pub struct VerifiedSignature {
    /// The signing certificate attached to the PKCS#7 structure.
    pub signer_cert: X509,
    /// Uppercase hex SHA-1 of the signing certificate, the registry key.
    pub signer_fingerprint: String,
    /// The canonical bytes the signature was checked against.
    pub payload: Vec<u8>,
}

fn is_signature_part(part: &Mime) -> bool {
    part.header(vpec_mail_parser::mime::CONTENT_TYPE_HEADER)
        .map_or(false, |content_type| {
            let body = content_type.body();
            body.eq_ignore_ascii_case(PKCS7_SIGNATURE_TYPE)
                || body.eq_ignore_ascii_case(PKCS7_SIGNATURE_TYPE_LEGACY)
        })
}

/// Verify the detached signature of a `multipart/signed` message.
///
/// Only the cryptographic binding between payload and signature is checked
/// here; whether the signer is a certified provider is the registry's
/// business. Certificate chains are intentionally not built (the trust
/// model is the fingerprint index, per the authority registry).
///
/// # Errors
///
/// * see [`SignatureError`]
pub fn verify_signed(mail: &mut Mail) -> Result<VerifiedSignature, SignatureError> {
    let mime = match mail.body_mut() {
        Ok(Body::Mime(mime)) => mime,
        Ok(_) => return Err(SignatureError::NotSigned),
        Err(e) => return Err(SignatureError::BadSignature(e.to_string())),
    };

    let is_multipart_signed = mime.media_type().map_or(false, |(kind, subtype)| {
        kind.eq_ignore_ascii_case("multipart") && subtype.eq_ignore_ascii_case("signed")
    });
    if !is_multipart_signed {
        return Err(SignatureError::NotSigned);
    }

    let Part::Multipart(multipart) = &mime.part else {
        return Err(SignatureError::NotSigned);
    };

    let signature_part = multipart
        .parts
        .iter()
        .find(|part| is_signature_part(part))
        .ok_or(SignatureError::NotSigned)?;
    let payload_part = multipart
        .parts
        .iter()
        .find(|part| !is_signature_part(part))
        .ok_or(SignatureError::NotSigned)?;

    let signature_der = build::decode_part(signature_part)
        .map_err(|e| SignatureError::BadSignature(e.to_string()))?;
    let payload = canonicalize_crlf(payload_part.to_string().as_bytes());

    let pkcs7 =
        Pkcs7::from_der(&signature_der).map_err(|e| SignatureError::BadSignature(e.to_string()))?;

    let empty_store = X509StoreBuilder::new()
        .map_err(|e| SignatureError::BadSignature(e.to_string()))?
        .build();
    let empty_stack =
        Stack::<X509>::new().map_err(|e| SignatureError::BadSignature(e.to_string()))?;

    pkcs7
        .verify(
            &empty_stack,
            &empty_store,
            Some(&payload),
            None,
            Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
        )
        .map_err(|e| SignatureError::BadSignature(e.to_string()))?;

    let signers = pkcs7
        .signers(&empty_stack, Pkcs7Flags::empty())
        .map_err(|e| SignatureError::BadSignature(e.to_string()))?;
    let signer_cert = signers
        .iter()
        .next()
        .ok_or_else(|| SignatureError::BadSignature("no signer certificate attached".to_string()))?
        .to_owned();

    let signer_fingerprint = certificate::fingerprint(&signer_cert)
        .map_err(|e| SignatureError::BadSignature(e.to_string()))?;

    Ok(VerifiedSignature {
        signer_cert,
        signer_fingerprint,
        payload,
    })
}
