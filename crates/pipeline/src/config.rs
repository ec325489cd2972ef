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

use std::sync::Arc;

use serde_with::{serde_as, DisplayFromStr};

use vpec_common::api::{DeliveryHop, MessageStore, ProviderHop};
use vpec_common::registry::{Authority, MemoryAuthorityRegistry};
use vpec_common::Domain;
use vpec_config::{ConfigResult, Logs};
use vpec_smime::{
    CertificateError, PrivateKeyError, SigningError, SmimeCertificate, SmimePrivateKey,
};

use crate::Core;

/// Configuration shared by the three role services.
#[serde_as]
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub path: std::path::PathBuf,

    /// Mail domain this provider is the authority of.
    #[serde_as(as = "DisplayFromStr")]
    pub domain: Domain,

    /// `gestore-emittente` declared in every certification XML.
    pub provider_name: String,

    /// PEM file with the S/MIME signing certificate (chain appended).
    pub certificate: std::path::PathBuf,
    /// PEM file with the S/MIME signing key.
    pub private_key: std::path::PathBuf,

    /// UTC offset the Italian-locale timestamps are rendered in, `+hhmm`.
    #[serde(default = "PipelineConfig::default_zone")]
    pub zone: String,

    /// The index of certified peer providers.
    #[serde(default)]
    pub authorities: Vec<Authority>,

    #[serde(default)]
    pub logs: Logs,
}

impl PipelineConfig {
    fn default_zone() -> String {
        "+0000".to_string()
    }
}

impl vpec_config::Config for PipelineConfig {
    #[allow(clippy::expect_used)]
    fn with_path(path: &impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        Ok(Self {
            path: path.as_ref().into(),
            domain: Domain::from_utf8("localhost").expect("static domain is valid"),
            provider_name: "vPEC".to_string(),
            certificate: "/etc/vpec/certificate.pem".into(),
            private_key: "/etc/vpec/private-key.pem".into(),
            zone: Self::default_zone(),
            authorities: Vec::new(),
            logs: Logs::default(),
        })
    }

    fn logs(&self) -> &Logs {
        &self.logs
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

/// Errors raised while turning a configuration into a running [`Core`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("cannot load the signing certificate: {0}")]
    Certificate(#[from] CertificateError),
    #[error("cannot load the signing key: {0}")]
    PrivateKey(#[from] PrivateKeyError),
    #[error("{0}")]
    Signer(#[from] SigningError),
    #[error("invalid zone offset '{0}', expected '+hhmm'")]
    Zone(String),
}

/// Parse a `+hhmm` / `-hhmm` offset.
fn parse_zone(zone: &str) -> Result<time::UtcOffset, BuildError> {
    let error = || BuildError::Zone(zone.to_string());

    let (sign, digits) = match zone.as_bytes().first() {
        Some(b'+') => (1i8, &zone[1..]),
        Some(b'-') => (-1i8, &zone[1..]),
        _ => return Err(error()),
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(error());
    }

    let hours: i8 = digits[..2].parse().map_err(|_| error())?;
    let minutes: i8 = digits[2..].parse().map_err(|_| error())?;

    time::UtcOffset::from_hms(sign * hours, sign * minutes, 0).map_err(|_| error())
}

impl Core {
    /// Build the kernel from its configuration and collaborators.
    ///
    /// # Errors
    ///
    /// * see [`BuildError`]
    pub fn from_config(
        config: &PipelineConfig,
        store: Arc<dyn MessageStore>,
        provider_hop: Arc<dyn ProviderHop>,
        delivery_hop: Arc<dyn DeliveryHop>,
    ) -> Result<Arc<Self>, BuildError> {
        let certificate =
            SmimeCertificate::load_pem_file(&config.certificate.to_string_lossy())?;
        let private_key = SmimePrivateKey::load_pem_file(&config.private_key.to_string_lossy())?;
        let signer = vpec_smime::Signer::new(&certificate, &private_key, config.domain.clone())?;

        let registry = Arc::new(MemoryAuthorityRegistry::new(config.authorities.clone()));

        Ok(Self::new(
            signer,
            config.provider_name.clone(),
            parse_zone(&config.zone)?,
            registry,
            store,
            provider_hop,
            delivery_hop,
        ))
    }
}
