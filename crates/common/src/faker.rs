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

//! Fakers for property style tests.

use fake::{Dummy, Fake, Faker};

use crate::{Address, Domain, Envelope, Mailbox};

/// Produce syntactically valid mailboxes, optionally pinned to a domain.
pub struct MailboxFaker {
    pub domain: Option<Domain>,
}

impl Dummy<MailboxFaker> for Address {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(config: &MailboxFaker, rng: &mut R) -> Self {
        let local: String = fake::faker::internet::en::Username().fake_with_rng(rng);
        let domain = config.domain.as_ref().map_or_else(
            || {
                let label: String = (8..12).fake_with_rng(rng);
                format!("{}.it", label.to_ascii_lowercase())
            },
            ToString::to_string,
        );

        Self::new_unchecked(format!("{local}@{domain}"))
    }
}

impl Dummy<MailboxFaker> for Mailbox {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(config: &MailboxFaker, rng: &mut R) -> Self {
        Self(Address::dummy_with_rng(config, rng))
    }
}

impl Dummy<Faker> for Mailbox {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_: &Faker, rng: &mut R) -> Self {
        Self(Address::dummy_with_rng(&MailboxFaker { domain: None }, rng))
    }
}

impl Dummy<Faker> for Envelope {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_: &Faker, rng: &mut R) -> Self {
        Self {
            reverse_path: Faker.fake_with_rng(rng),
            forward_paths: (0..rng.gen_range(1..4))
                .map(|_| Faker.fake_with_rng(rng))
                .collect(),
            received_at: time::OffsetDateTime::UNIX_EPOCH
                + time::Duration::seconds(rng.gen_range(1_600_000_000..1_800_000_000)),
        }
    }
}
