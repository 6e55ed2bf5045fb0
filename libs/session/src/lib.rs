mod locks;
mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use locks::KeyedLock;
pub use memory::MemorySessionStore;

/// Shared session store handle used across the relay.
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Conversation handle cached for one SMS sender.
///
/// Created when a conversation is opened and replaced wholesale when the
/// conversation is renewed; the id/token pair is never patched field-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub conversation_id: String,
    pub token: String,
    pub created_unix_ms: i128,
}

impl SessionEntry {
    pub fn new(conversation_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            token: token.into(),
            created_unix_ms: OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000,
        }
    }
}

/// Keyed store mapping a sender identity to its live conversation.
///
/// Eviction policy: entries are removed only by [`SessionStore::delete`] or
/// overwritten by [`SessionStore::put`]; there is no TTL sweep. A store with
/// expiry can be swapped in behind this trait without touching the
/// orchestrator — `created_unix_ms` on the entry carries the age signal.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find(&self, sender: &str) -> Result<Option<SessionEntry>>;
    async fn put(&self, sender: &str, entry: SessionEntry) -> Result<()>;
    async fn delete(&self, sender: &str) -> Result<()>;
}

/// Returns an in-memory session store wrapped in an [`Arc`].
pub fn shared_memory_store() -> SharedSessionStore {
    Arc::new(MemorySessionStore::new())
}
