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

//! Collaborator interfaces of the kernel: the mailbox store and the two
//! next-hop send primitives. Front-ends provide the implementations; the
//! kernel treats them as linearizable and never retries on its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::idle::IdleBus;
use crate::registry::Authority;
use crate::{Domain, Mailbox};

/// Message sequence identifier, unique and increasing per mailbox.
pub type Uid = u32;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("mailbox '{0}' does not exist")]
    UnknownMailbox(String),
    #[error("no message with uid {uid} in mailbox '{mailbox}'")]
    UnknownMessage { mailbox: String, uid: Uid },
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("no certified provider found for domain '{0}'")]
    NoRoute(Domain),
    #[error("next hop unavailable: {0}")]
    Unavailable(String),
    #[error("next hop rejected the message: {0}")]
    Rejected(String),
}

/// A message at rest in a mailbox.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub uid: Uid,
    pub message: Vec<u8>,
    pub internal_date: time::OffsetDateTime,
}

/// Durable per-user mailbox storage.
///
/// Implementations must be concurrency-safe, with uid assignment atomic per
/// mailbox.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn add_message(&self, mailbox: &Mailbox, message: &[u8]) -> Result<Uid, StoreError>;

    async fn get_messages(&self, mailbox: &Mailbox) -> Result<Vec<StoredMessage>, StoreError>;

    async fn delete(&self, mailbox: &Mailbox, uid: Uid) -> Result<(), StoreError>;
}

/// Provider-to-provider SMTP transmission, addressed through the authority
/// registry.
#[async_trait::async_trait]
pub trait ProviderHop: Send + Sync {
    async fn send(
        &self,
        authority: &Authority,
        reverse_path: &Mailbox,
        forward_paths: &[Mailbox],
        message: &[u8],
    ) -> Result<(), SinkError>;
}

/// In-provider hop from the reception point to the delivery point
/// (`POST /api/receive`).
#[async_trait::async_trait]
pub trait DeliveryHop: Send + Sync {
    async fn receive(&self, message: &[u8]) -> Result<(), SinkError>;
}

#[derive(Debug, Default)]
struct MailboxState {
    next_uid: Uid,
    messages: Vec<StoredMessage>,
}

/// Reference in-memory store. Mailboxes are created on first append;
/// IDLE listeners are signalled once the message is stored.
#[derive(Debug)]
pub struct MemoryStore {
    mailboxes: Mutex<HashMap<String, MailboxState>>,
    idle: Arc<IdleBus>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            mailboxes: Mutex::default(),
            idle: Arc::new(IdleBus::new()),
        }
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The notification bus fed by this store.
    #[must_use]
    pub fn idle(&self) -> Arc<IdleBus> {
        self.idle.clone()
    }
}

fn key(mailbox: &Mailbox) -> String {
    mailbox.to_string().to_ascii_lowercase()
}

#[async_trait::async_trait]
impl MessageStore for MemoryStore {
    async fn add_message(&self, mailbox: &Mailbox, message: &[u8]) -> Result<Uid, StoreError> {
        let uid = {
            #[allow(clippy::expect_used)]
            let mut mailboxes = self.mailboxes.lock().expect("store lock poisoned");
            let state = mailboxes.entry(key(mailbox)).or_default();

            state.next_uid += 1;
            state.messages.push(StoredMessage {
                uid: state.next_uid,
                message: message.to_vec(),
                internal_date: time::OffsetDateTime::now_utc(),
            });
            state.next_uid
        };

        self.idle.publish(mailbox);
        Ok(uid)
    }

    async fn get_messages(&self, mailbox: &Mailbox) -> Result<Vec<StoredMessage>, StoreError> {
        #[allow(clippy::expect_used)]
        self.mailboxes
            .lock()
            .expect("store lock poisoned")
            .get(&key(mailbox))
            .map(|state| state.messages.clone())
            .ok_or_else(|| StoreError::UnknownMailbox(mailbox.to_string()))
    }

    async fn delete(&self, mailbox: &Mailbox, uid: Uid) -> Result<(), StoreError> {
        #[allow(clippy::expect_used)]
        let mut mailboxes = self.mailboxes.lock().expect("store lock poisoned");
        let state = mailboxes
            .get_mut(&key(mailbox))
            .ok_or_else(|| StoreError::UnknownMailbox(mailbox.to_string()))?;

        let before = state.messages.len();
        state.messages.retain(|message| message.uid != uid);
        if state.messages.len() == before {
            return Err(StoreError::UnknownMessage {
                mailbox: mailbox.to_string(),
                uid,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(s: &str) -> Mailbox {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn uids_increase_per_mailbox() {
        let store = MemoryStore::new();
        let bob = mailbox("bob@b.it");

        assert_eq!(store.add_message(&bob, b"one").await.unwrap(), 1);
        assert_eq!(store.add_message(&bob, b"two").await.unwrap(), 2);
        assert_eq!(
            store.add_message(&mailbox("dan@d.it"), b"three").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn append_signals_idle_listeners() {
        let store = MemoryStore::new();
        let bob = mailbox("bob@b.it");
        let listener = store.idle().subscribe(&bob);

        store.add_message(&bob, b"one").await.unwrap();
        listener.wait().await;
    }

    #[tokio::test]
    async fn delete_removes_one_message() {
        let store = MemoryStore::new();
        let bob = mailbox("bob@b.it");

        let uid = store.add_message(&bob, b"one").await.unwrap();
        store.add_message(&bob, b"two").await.unwrap();

        store.delete(&bob, uid).await.unwrap();
        let left = store.get_messages(&bob).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, b"two");

        assert!(matches!(
            store.delete(&bob, uid).await,
            Err(StoreError::UnknownMessage { .. })
        ));
    }

    #[tokio::test]
    async fn mailbox_addressing_ignores_case() {
        let store = MemoryStore::new();
        store.add_message(&mailbox("Bob@B.IT"), b"one").await.unwrap();

        assert_eq!(
            store.get_messages(&mailbox("bob@b.it")).await.unwrap().len(),
            1
        );
    }
}
