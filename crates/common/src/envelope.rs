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

use crate::Mailbox;

/// SMTP-level envelope of a received message, as handed over by the
/// front-end: the reverse-path, the accepted forward-paths in order, and the
/// reception timestamp.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub reverse_path: Mailbox,
    pub forward_paths: Vec<Mailbox>,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: time::OffsetDateTime,
}

impl Envelope {
    /// Envelope for a message received "now".
    #[must_use]
    pub fn new(reverse_path: Mailbox, forward_paths: Vec<Mailbox>) -> Self {
        Self {
            reverse_path,
            forward_paths,
            received_at: time::OffsetDateTime::now_utc(),
        }
    }
}
