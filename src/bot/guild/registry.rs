use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::bot::{chat_event::chat_event::GuildId, guild::guild::GuildState};

/// Owns every attached guild. The lock is only held long enough to clone an `Arc` out,
/// so callers that race a removal simply get `None`.
#[derive(Default)]
pub struct GuildRegistry {
    guilds: RwLock<HashMap<GuildId, Arc<GuildState>>>,
}

impl GuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &GuildId) -> Option<Arc<GuildState>> {
        self.guilds.read().await.get(id).cloned()
    }

    /// Returns the guild state this one replaced, if any.
    pub async fn insert(&self, guild: Arc<GuildState>) -> Option<Arc<GuildState>> {
        self.guilds.write().await.insert(guild.id.clone(), guild)
    }

    pub async fn remove(&self, id: &GuildId) -> Option<Arc<GuildState>> {
        self.guilds.write().await.remove(id)
    }

    pub async fn contains(&self, id: &GuildId) -> bool {
        self.guilds.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.guilds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.guilds.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<Arc<GuildState>> {
        self.guilds.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{chat_event::chat_event::GuildInfo, state::def::GuildConfig};

    fn state(id: &str) -> Arc<GuildState> {
        Arc::new(GuildState::new(GuildInfo::new(id, id, "owner"), GuildConfig::default()))
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let registry = GuildRegistry::new();
        assert!(registry.insert(state("a")).await.is_none());
        registry.insert(state("b")).await;
        assert_eq!(registry.len().await, 2);

        let a = registry.get(&GuildId::new("a")).await.unwrap();
        registry.remove(&GuildId::new("a")).await;
        assert!(registry.get(&GuildId::new("a")).await.is_none());
        // callers holding the Arc keep a usable guild
        assert_eq!(a.name().await, "a");
    }

    #[tokio::test]
    async fn snapshot_does_not_hold_the_lock() {
        let registry = GuildRegistry::new();
        registry.insert(state("a")).await;
        let snapshot = registry.snapshot().await;
        registry.insert(state("b")).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len().await, 2);
    }
}
