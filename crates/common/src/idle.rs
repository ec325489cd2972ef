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

//! Per-mailbox new-mail notifications for IMAP IDLE collaborators.
//!
//! Appenders publish after a message is durably added; each listener holds
//! its own one-permit signal, so notifications coalesce to at most one
//! pending wake-up per listener. No ordering is guaranteed between listeners.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Notify;

use crate::Mailbox;

/// Broadcast bus of mailbox-append events.
#[derive(Debug, Default)]
pub struct IdleBus {
    listeners: Mutex<HashMap<String, Vec<Weak<Notify>>>>,
}

/// Handle of a single IDLE listener.
#[derive(Debug)]
pub struct IdleListener {
    notify: Arc<Notify>,
}

impl IdleListener {
    /// Wait for the next append to the watched mailbox. Returns immediately
    /// if an append happened since the last call.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

impl IdleBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener on a mailbox.
    #[must_use]
    pub fn subscribe(&self, mailbox: &Mailbox) -> IdleListener {
        let notify = Arc::new(Notify::new());

        #[allow(clippy::expect_used)]
        self.listeners
            .lock()
            .expect("idle bus lock poisoned")
            .entry(key(mailbox))
            .or_default()
            .push(Arc::downgrade(&notify));

        IdleListener { notify }
    }

    /// Signal every listener of a mailbox. Dropped listeners are pruned on
    /// the way.
    pub fn publish(&self, mailbox: &Mailbox) {
        #[allow(clippy::expect_used)]
        let mut listeners = self.listeners.lock().expect("idle bus lock poisoned");

        if let Some(watchers) = listeners.get_mut(&key(mailbox)) {
            watchers.retain(|watcher| {
                watcher.upgrade().map_or(false, |notify| {
                    notify.notify_one();
                    true
                })
            });
            if watchers.is_empty() {
                listeners.remove(&key(mailbox));
            }
        }
    }
}

fn key(mailbox: &Mailbox) -> String {
    mailbox.to_string().to_ascii_lowercase()
}
