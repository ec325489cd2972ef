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
use openssl::pkey::{Id, PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;

use vpec_common::Domain;
use vpec_mail_parser::mail::headers::Header;
use vpec_mail_parser::mime::Mime;

use crate::canonicalize::{canonicalize_crlf, wrap_base64};
use crate::certificate::SmimeCertificate;
use crate::private_key::SmimePrivateKey;
use crate::PKCS7_SIGNATURE_TYPE;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("the private key is not a supported signing key")]
    InvalidKey,
    #[error("signing failed: {0}")]
    SigningFailed(#[from] openssl::error::ErrorStack),
}

/// The S/MIME identity of a provider role: certificate, key and mail
/// domain. Built once at startup and shared by every in-flight task;
/// signing does not mutate the key, so no further synchronization is
/// needed.
pub struct Signer {
    cert: X509,
    chain: Vec<X509>,
    key: PKey<Private>,
    domain: Domain,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// # Errors
    ///
    /// * The key is not of a type PKCS#7 signing supports.
    pub fn new(
        certificate: &SmimeCertificate,
        key: &SmimePrivateKey,
        domain: Domain,
    ) -> Result<Self, SigningError> {
        if !matches!(key.key().id(), Id::RSA | Id::EC) {
            return Err(SigningError::InvalidKey);
        }

        Ok(Self {
            cert: certificate.leaf().clone(),
            chain: certificate.chain().to_vec(),
            key: key.key().clone(),
            domain,
        })
    }

    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    #[must_use]
    pub fn certificate(&self) -> &X509 {
        &self.cert
    }

    /// Produce the detached PKCS#7 signature (DER) over already canonical
    /// payload bytes. SHA-256, one signer, signer certificate attached.
    ///
    /// # Errors
    ///
    /// * The underlying cryptographic operation failed.
    pub fn sign_detached(&self, payload: &[u8]) -> Result<Vec<u8>, SigningError> {
        let mut extra_certs = Stack::new()?;
        for cert in &self.chain {
            extra_certs.push(cert.clone())?;
        }

        let pkcs7 = Pkcs7::sign(
            &self.cert,
            &self.key,
            &extra_certs,
            payload,
            Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY,
        )?;

        Ok(pkcs7.to_der()?)
    }
}

/// Wrap a payload entity into a complete signed message.
///
/// The payload is canonicalized to CRLF, hashed, and those exact bytes are
/// emitted into the signed part; `headers` become the top-level header
/// section, completed with `MIME-Version` and the `multipart/signed`
/// Content-Type.
///
/// # Errors
///
/// * see [`SigningError`]
pub fn seal(signer: &Signer, headers: &[Header], payload: &Mime) -> Result<Vec<u8>, SigningError> {
    let mut payload_bytes = canonicalize_crlf(payload.to_string().as_bytes());
    // the boundary after the signed part needs a preceding line break, and
    // it must be part of the hashed bytes.
    if !payload_bytes.ends_with(b"\r\n") {
        payload_bytes.extend_from_slice(b"\r\n");
    }
    let signature = signer.sign_detached(&payload_bytes)?;

    let boundary = vpec_mail_parser::build::boundary();
    let mut out = Vec::with_capacity(payload_bytes.len() + signature.len() * 2);

    for header in headers {
        out.extend_from_slice(header.to_string().as_bytes());
    }
    out.extend_from_slice(b"MIME-Version: 1.0\r\n");
    out.extend_from_slice(
        format!(
            "Content-Type: multipart/signed; \
             protocol=\"{PKCS7_SIGNATURE_TYPE}\"; micalg=sha256; boundary=\"{boundary}\"\r\n"
        )
        .as_bytes(),
    );
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(b"This is an S/MIME signed message\r\n\r\n");

    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    out.extend_from_slice(&payload_bytes);

    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    out.extend_from_slice(
        format!("Content-Type: {PKCS7_SIGNATURE_TYPE}; name=\"smime.p7s\"\r\n").as_bytes(),
    );
    out.extend_from_slice(b"Content-Transfer-Encoding: base64\r\n");
    out.extend_from_slice(b"Content-Disposition: attachment; filename=\"smime.p7s\"\r\n");
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(wrap_base64(&signature).as_bytes());
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Ok(out)
}
