//! Registry of live client connections.
//!
//! Handlers insert themselves when they start and remove themselves when they
//! exit, concurrently with each other and with the listener enumerating the
//! registry on shutdown. All of that goes through a [`DashMap`].

use super::{ClientRecord, SessionId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tracing::debug;

/// Live mapping from client identifier to its connection record.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: DashMap<String, ClientRecord>,
    next_session: AtomicU64,
    drained: Notify,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a session id for a newly accepted connection.
    pub fn next_session(&self) -> SessionId {
        self.next_session.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Registers a connection.
    ///
    /// A record already stored under the same client id is replaced, and its
    /// connection is closed.
    ///
    /// # Arguments
    ///
    /// * `record` - The new connection's record, keyed by its `client_id`
    ///
    /// # Returns
    ///
    /// The replaced record, if any.
    pub fn insert(&self, record: ClientRecord) -> Option<ClientRecord> {
        let replaced = self.clients.insert(record.client_id.clone(), record);

        if let Some(previous) = &replaced {
            debug!(
                "Replacing session {} for {}",
                previous.session, previous.client_id
            );
            previous.close();
        }

        replaced
    }

    /// Deregisters a connection.
    ///
    /// Only removes the entry if it still belongs to `session`; a handler whose
    /// record was replaced must not evict its successor. Wakes
    /// [`wait_until_empty`](Self::wait_until_empty) when the last entry goes.
    ///
    /// # Arguments
    ///
    /// * `client_id` - Registry key of the connection
    /// * `session` - Session the caller owns
    ///
    /// # Returns
    ///
    /// The removed record, or `None` if nothing matching was registered.
    pub fn remove(&self, client_id: &str, session: SessionId) -> Option<ClientRecord> {
        let removed = self
            .clients
            .remove_if(client_id, |_, record| record.session == session)
            .map(|(_, record)| record);

        if self.clients.is_empty() {
            self.drained.notify_waiters();
        }

        removed
    }

    pub fn get(&self, client_id: &str) -> Option<ClientRecord> {
        self.clients.get(client_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Snapshot of the registered client identifiers.
    pub fn client_ids(&self) -> Vec<String> {
        self.clients.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Fires the close trigger of every registered connection and returns how
    /// many were signalled. Records stay in place until their handlers remove
    /// them.
    pub fn close_all(&self) -> usize {
        let records: Vec<ClientRecord> =
            self.clients.iter().map(|entry| entry.value().clone()).collect();

        for record in &records {
            record.close();
        }

        records.len()
    }

    /// Resolves once no connection is registered.
    pub async fn wait_until_empty(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.clients.is_empty() {
                return;
            }

            notified.await;
        }
    }
}
