use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::{SessionEntry, SessionStore};

/// Process-lifetime session table; state is lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, SessionEntry>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find(&self, sender: &str) -> Result<Option<SessionEntry>> {
        Ok(self.entries.get(sender).map(|entry| entry.value().clone()))
    }

    async fn put(&self, sender: &str, entry: SessionEntry) -> Result<()> {
        self.entries.insert(sender.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, sender: &str) -> Result<()> {
        self.entries.remove(sender);
        Ok(())
    }
}
