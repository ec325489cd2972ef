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

use std::sync::atomic::{AtomicU32, Ordering};

use time::macros::format_description;

use crate::Domain;

/// Generator of PEC message identifiers:
/// `opec<YYMMDD>.<YYYYMMDDhhmmss.microseconds.nnn.1.53>@<domain>`.
///
/// `nnn` is a process-wide rotating counter; together with the microsecond
/// field it makes identifiers unique within a process run.
#[derive(Debug)]
pub struct MessageIdGenerator {
    domain: Domain,
    counter: AtomicU32,
}

impl MessageIdGenerator {
    #[must_use]
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            counter: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Generate an identifier for the current instant, angle brackets
    /// included.
    #[must_use]
    pub fn generate(&self) -> String {
        self.generate_at(time::OffsetDateTime::now_utc())
    }

    /// Generate an identifier for a given instant.
    #[must_use]
    pub fn generate_at(&self, now: time::OffsetDateTime) -> String {
        let short_date = format_description!("[year repr:last_two][month][day]");
        let stamp = format_description!("[year][month][day][hour][minute][second]");

        let micros = now.nanosecond() / 1_000;
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) % 1_000;

        #[allow(clippy::expect_used)]
        format!(
            "<opec{}.{}.{:06}.{:03}.1.53@{}>",
            now.format(short_date).expect("formatting to a string"),
            now.format(stamp).expect("formatting to a string"),
            micros,
            counter,
            self.domain,
        )
    }
}
