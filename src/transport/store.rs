//! Local persistence handoff.
//!
//! In local mode the client does not ship events anywhere: it hands the
//! fully-defaulted event to the embedding application's persistent
//! grouped-message store. The store's "create or increment" semantics
//! (new group vs. another occurrence of an existing one) are entirely
//! its own; the transport only forwards and instruments the call.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::Event;

/// Handle to a stored grouped message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHandle {
    /// Identifier of the group the event was merged into.
    pub group_id: String,
    /// Occurrence count of the group after this event.
    pub times_seen: u64,
}

/// The local persistent grouped-message store collaborator.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Create a new group for this event, or increment the occurrence
    /// count of the group it belongs to.
    async fn create_or_increment(&self, event: &Event) -> Result<StoredHandle, StoreError>;
}

impl std::fmt::Debug for dyn MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MessageStore")
    }
}

/// Transport that persists events through a [`MessageStore`].
pub struct LocalTransport {
    store: Arc<dyn MessageStore>,
}

impl LocalTransport {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Hand the event to the store.
    ///
    /// # Errors
    /// Store failures are collaborator failures and propagate unchanged.
    pub async fn send(&self, event: &Event) -> Result<StoredHandle, StoreError> {
        let handle = self.store.create_or_increment(event).await?;
        tracing::debug!(
            group_id = %handle.group_id,
            times_seen = handle.times_seen,
            "Event stored locally"
        );
        metrics::counter!("faultline_events_stored_total").increment(1);
        Ok(handle)
    }
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport").finish()
    }
}
