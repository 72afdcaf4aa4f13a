//! Event transport: remote serialize-and-POST or local persistence.
//!
//! The two modes are mutually exclusive, selected by configuration:
//! a configured remote endpoint list routes every event through
//! [`RemoteTransport`]; otherwise events go to the embedding
//! application's [`MessageStore`]. Remote failures are recovered
//! per-endpoint and never reach the caller; local store failures are
//! collaborator failures and propagate.

mod remote;
mod store;

pub use remote::RemoteTransport;
pub use store::{LocalTransport, MessageStore, StoredHandle};

use crate::error::StoreError;
use crate::event::Event;

/// Result of a capture that ran the full pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The thrashing limiter suppressed the event. A normal outcome,
    /// not an error: nothing reached the transport.
    Suppressed,
    /// Remote mode: every configured endpoint was attempted;
    /// `delivered` counts the ones that accepted the event.
    Sent { attempted: usize, delivered: usize },
    /// Local mode: the grouped-message store accepted the event.
    Stored(StoredHandle),
}

/// The configured transport for a client.
pub enum Transport {
    Remote(RemoteTransport),
    Local(LocalTransport),
}

impl Transport {
    /// Dispatch a fully-defaulted event.
    ///
    /// # Errors
    /// Only local-mode store failures propagate; remote failures are
    /// logged and folded into the [`CaptureOutcome::Sent`] counts.
    pub async fn send(&self, event: &Event) -> Result<CaptureOutcome, StoreError> {
        match self {
            Transport::Remote(remote) => Ok(remote.send(event).await),
            Transport::Local(local) => Ok(CaptureOutcome::Stored(local.send(event).await?)),
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Remote(remote) => std::fmt::Debug::fmt(remote, f),
            Transport::Local(local) => std::fmt::Debug::fmt(local, f),
        }
    }
}
