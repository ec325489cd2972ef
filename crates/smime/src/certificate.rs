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

use openssl::hash::MessageDigest;
use openssl::x509::X509;

#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("does not contain any certificate")]
    Empty,
    #[error("cannot parse pem data: {0}")]
    InvalidPem(#[from] openssl::error::ErrorStack),
}

/// An S/MIME signing certificate, with its optional intermediate chain.
/// The first certificate of the PEM bundle is the signer.
#[derive(Debug, serde_with::DeserializeFromStr)]
pub struct SmimeCertificate {
    source: Box<str>,
    certs: Vec<X509>,
}

impl std::str::FromStr for SmimeCertificate {
    type Err = CertificateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::load_pem(s)
    }
}

impl serde::Serialize for SmimeCertificate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.source)
    }
}

impl SmimeCertificate {
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The signing certificate.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn leaf(&self) -> &X509 {
        // `certs` is checked non-empty on construction.
        &self.certs[0]
    }

    /// Intermediate certificates attached to the signature.
    #[must_use]
    pub fn chain(&self) -> &[X509] {
        &self.certs[1..]
    }

    /// Uppercase hex SHA-1 fingerprint of the signing certificate, the form
    /// indexed by the authority registry.
    ///
    /// # Errors
    ///
    /// * The digest computation failed.
    pub fn sha1_fingerprint(&self) -> Result<String, CertificateError> {
        fingerprint(self.leaf())
    }

    fn load_pem(source: &str) -> Result<Self, CertificateError> {
        let certs = X509::stack_from_pem(source.as_bytes())?;

        if certs.is_empty() {
            return Err(CertificateError::Empty);
        }

        Ok(Self {
            source: source.into(),
            certs,
        })
    }

    pub fn load_pem_file(filepath: &str) -> Result<Self, CertificateError> {
        let source = std::fs::read_to_string(filepath)?;
        Self::load_pem(&source)
    }
}

/// Uppercase hex SHA-1 fingerprint of a certificate.
///
/// # Errors
///
/// * The digest computation failed.
pub fn fingerprint(cert: &X509) -> Result<String, CertificateError> {
    let digest = cert.digest(MessageDigest::sha1())?;
    Ok(digest
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<String>())
}
