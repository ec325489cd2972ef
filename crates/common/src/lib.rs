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

//! Shared model types of the vPEC kernel.

pub mod address;
pub mod api;
pub mod envelope;
pub mod faker;
pub mod idle;
pub mod message_id;
pub mod pec;
pub mod registry;

pub use address::{Address, AddressFromStrError};
pub use envelope::Envelope;

pub use time;
pub use uuid;

/// A domain name. `trust_dns` names compare and hash case-insensitively,
/// which is exactly the behavior mail routing needs.
pub type Domain = trust_dns_proto::rr::Name;

/// An electronic mailbox, owned by a user of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Mailbox(pub Address);

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Mailbox {
    type Err = AddressFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Address>().map(Self)
    }
}

impl Mailbox {
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.local_part()
    }

    #[must_use]
    pub fn domain(&self) -> Domain {
        self.0.domain()
    }
}
