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

//! Index of the certified PEC providers.
//!
//! Loaded at startup from the configuration; the kernel only reads it.
//! Refreshing replaces the whole table atomically, so concurrent lookups
//! always observe a consistent snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::{Address, Domain};

/// A certified PEC provider.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Authority {
    /// Display name of the provider.
    pub name: String,
    /// Mail domain the provider is the authority of.
    pub domain: Domain,
    /// Address of the provider's reception point, `host:port`.
    pub smtp_addr: String,
    /// Mailbox receiving taking-charge receipts and notices.
    pub notification_address: Address,
    /// Uppercase hex SHA-1 fingerprints of the provider's signing
    /// certificates.
    pub provider_cert_hashes: HashSet<String>,
}

/// Read-only lookup interface over the provider index.
#[async_trait::async_trait]
pub trait AuthorityRegistry: Send + Sync {
    /// Provider owning a mail domain.
    async fn by_domain(&self, domain: &Domain) -> Option<Authority>;

    /// Provider owning a signing certificate, by uppercase hex SHA-1
    /// fingerprint. Lookup is case-insensitive on the input.
    async fn by_cert_hash(&self, sha1_hex: &str) -> Option<Authority>;
}

#[derive(Debug, Default)]
struct Tables {
    by_domain: HashMap<Domain, Authority>,
    by_hash: HashMap<String, Authority>,
}

/// In-memory provider index.
#[derive(Debug, Default)]
pub struct MemoryAuthorityRegistry {
    tables: RwLock<Tables>,
}

impl MemoryAuthorityRegistry {
    #[must_use]
    pub fn new(authorities: impl IntoIterator<Item = Authority>) -> Self {
        let registry = Self::default();
        registry.refresh(authorities);
        registry
    }

    /// Replace the whole table.
    pub fn refresh(&self, authorities: impl IntoIterator<Item = Authority>) {
        let mut tables = Tables::default();

        for authority in authorities {
            for hash in &authority.provider_cert_hashes {
                tables
                    .by_hash
                    .insert(hash.to_ascii_uppercase(), authority.clone());
            }
            tables
                .by_domain
                .insert(authority.domain.clone(), authority);
        }

        #[allow(clippy::expect_used)]
        let mut guard = self.tables.write().expect("registry lock poisoned");
        *guard = tables;
    }
}

#[async_trait::async_trait]
impl AuthorityRegistry for MemoryAuthorityRegistry {
    async fn by_domain(&self, domain: &Domain) -> Option<Authority> {
        #[allow(clippy::expect_used)]
        self.tables
            .read()
            .expect("registry lock poisoned")
            .by_domain
            .get(domain)
            .cloned()
    }

    async fn by_cert_hash(&self, sha1_hex: &str) -> Option<Authority> {
        #[allow(clippy::expect_used)]
        self.tables
            .read()
            .expect("registry lock poisoned")
            .by_hash
            .get(&sha1_hex.to_ascii_uppercase())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority(domain: &str, hash: &str) -> Authority {
        Authority {
            name: format!("{domain} PEC S.p.A."),
            domain: domain.parse().unwrap(),
            smtp_addr: format!("smtp.{domain}:25"),
            notification_address: format!("ricevute@{domain}").parse().unwrap(),
            provider_cert_hashes: [hash.to_string()].into(),
        }
    }

    #[tokio::test]
    async fn domain_lookup_is_case_insensitive() {
        let registry = MemoryAuthorityRegistry::new([authority("pec.b.it", "AABB")]);

        let found = registry
            .by_domain(&"PEC.B.IT".parse::<Domain>().unwrap())
            .await;
        assert_eq!(found.unwrap().name, "pec.b.it PEC S.p.A.");
    }

    #[tokio::test]
    async fn hash_lookup_normalizes_case() {
        let registry = MemoryAuthorityRegistry::new([authority("pec.b.it", "AABBCC")]);

        assert!(registry.by_cert_hash("aabbcc").await.is_some());
        assert!(registry.by_cert_hash("AABBCC").await.is_some());
        assert!(registry.by_cert_hash("001122").await.is_none());
    }

    #[tokio::test]
    async fn refresh_replaces_the_table() {
        let registry = MemoryAuthorityRegistry::new([authority("pec.b.it", "AABB")]);
        registry.refresh([authority("pec.c.it", "CCDD")]);

        assert!(registry
            .by_domain(&"pec.b.it".parse::<Domain>().unwrap())
            .await
            .is_none());
        assert!(registry
            .by_domain(&"pec.c.it".parse::<Domain>().unwrap())
            .await
            .is_some());
    }
}
