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

use openssl::pkey::{Id, PKey, Private};

#[derive(Debug, thiserror::Error)]
pub enum PrivateKeyError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse pem data: {0}")]
    InvalidPem(#[from] openssl::error::ErrorStack),
    #[error("the private key is not in a supported format (pem, rsa or ec, pkcs#1 or pkcs#8)")]
    Unsupported,
}

/// An S/MIME signing key.
#[derive(Debug, serde_with::DeserializeFromStr)]
pub struct SmimePrivateKey {
    source: Box<str>,
    key: PKey<Private>,
}

impl std::str::FromStr for SmimePrivateKey {
    type Err = PrivateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::load_pem(s)
    }
}

impl serde::Serialize for SmimePrivateKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.source)
    }
}

impl SmimePrivateKey {
    #[must_use]
    pub fn key(&self) -> &PKey<Private> {
        &self.key
    }

    fn load_pem(source: &str) -> Result<Self, PrivateKeyError> {
        let key = PKey::private_key_from_pem(source.as_bytes())?;

        // PKCS#7 signing is only defined here for RSA and EC keys.
        if !matches!(key.id(), Id::RSA | Id::EC) {
            return Err(PrivateKeyError::Unsupported);
        }

        Ok(Self {
            source: source.into(),
            key,
        })
    }

    pub fn load_pem_file(filepath: &str) -> Result<Self, PrivateKeyError> {
        let source = std::fs::read_to_string(filepath)?;
        Self::load_pem(&source)
    }
}
