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

//! The PEC protocol kernel: classification, validation, receipt and
//! envelope generation, and the three provider role handlers.
//!
//! One [`Core`] is built at startup and shared by every role; the handlers
//! are stateless per message and re-entrant. Suspension points are limited
//! to the collaborator calls (mailbox store, next-hop sinks, registry
//! lookups); nothing blocks inside the signing path. Cancellation is
//! cooperative: dropping a handler future before an artifact reached a
//! sink abandons the message, while an artifact already handed to a sink
//! is committed.

use std::sync::Arc;

use vpec_common::api::{DeliveryHop, MessageStore, ProviderHop};
use vpec_common::message_id::MessageIdGenerator;
use vpec_common::registry::AuthorityRegistry;
use vpec_common::{Address, Domain, Mailbox};
use vpec_smime::Signer;

pub mod access_point;
pub mod anomaly;
pub mod config;
pub mod delivery_point;
pub mod error;
mod locale;
pub mod receipt;
pub mod reception_point;
pub mod transport;
pub mod validate;

pub use access_point::{AccessPoint, ApOutcome};
pub use config::{BuildError, PipelineConfig};
pub use delivery_point::{DeliveryPoint, DpOutcome};
pub use error::ProcessError;
pub use reception_point::{ReceptionPoint, RpOutcome};
pub use validate::{validate_envelope, ValidationError};

/// A fully formed, ready-to-transmit message produced by the kernel.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// `Message-ID` carried by the artifact, angle brackets included.
    pub message_id: String,
    /// Wire bytes, signed where the artifact kind requires it.
    pub bytes: Vec<u8>,
}

/// Shared state of the three role handlers.
pub struct Core {
    pub(crate) signer: Signer,
    pub(crate) registry: Arc<dyn AuthorityRegistry>,
    pub(crate) store: Arc<dyn MessageStore>,
    pub(crate) provider_hop: Arc<dyn ProviderHop>,
    pub(crate) delivery_hop: Arc<dyn DeliveryHop>,
    pub(crate) message_ids: MessageIdGenerator,
    /// `gestore-emittente` of the certification XML.
    pub(crate) provider_name: String,
    /// Offset the Italian-locale timestamps are rendered in.
    pub(crate) zone: time::UtcOffset,
}

impl Core {
    #[must_use]
    pub fn new(
        signer: Signer,
        provider_name: String,
        zone: time::UtcOffset,
        registry: Arc<dyn AuthorityRegistry>,
        store: Arc<dyn MessageStore>,
        provider_hop: Arc<dyn ProviderHop>,
        delivery_hop: Arc<dyn DeliveryHop>,
    ) -> Arc<Self> {
        let message_ids = MessageIdGenerator::new(signer.domain().clone());
        Arc::new(Self {
            signer,
            registry,
            store,
            provider_hop,
            delivery_hop,
            message_ids,
            provider_name,
            zone,
        })
    }

    /// Domain this provider is the authority of.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        self.signer.domain()
    }

    #[must_use]
    pub fn access_point(self: &Arc<Self>) -> AccessPoint {
        AccessPoint { core: self.clone() }
    }

    #[must_use]
    pub fn reception_point(self: &Arc<Self>) -> ReceptionPoint {
        ReceptionPoint { core: self.clone() }
    }

    #[must_use]
    pub fn delivery_point(self: &Arc<Self>) -> DeliveryPoint {
        DeliveryPoint { core: self.clone() }
    }

    pub(crate) fn now(&self) -> time::OffsetDateTime {
        time::OffsetDateTime::now_utc().to_offset(self.zone)
    }

    /// `posta-certificata@<domain>`, the `From` of every emitted artifact.
    pub(crate) fn certified_address(&self) -> String {
        format!("posta-certificata@{}", self.domain())
    }

    pub(crate) fn certified_mailbox(&self) -> Mailbox {
        Mailbox(Address::new_unchecked(self.certified_address()))
    }
}
