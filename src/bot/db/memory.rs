use std::{collections::HashMap, sync::atomic::{AtomicBool, Ordering}};

use futures::{future::BoxFuture, FutureExt};
use tokio::sync::RwLock;

use crate::bot::{chat_event::chat_event::{GuildId, UserId}, commands::commands::BotResult, db::{AuditRecord, Store}, state::def::BotError};

/// Process local store used by the console binary and the tests.
#[derive(Debug)]
pub struct MemoryStore {
    healthy: AtomicBool,
    audits: RwLock<Vec<AuditRecord>>,
    members: RwLock<HashMap<UserId, Vec<GuildId>>>,
    defaults: RwLock<HashMap<UserId, GuildId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            audits: RwLock::new(Vec::new()),
            members: RwLock::new(HashMap::new()),
            defaults: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub async fn audits(&self) -> Vec<AuditRecord> {
        self.audits.read().await.clone()
    }

    pub async fn set_default_guild(&self, user: UserId, guild: GuildId) {
        self.defaults.write().await.insert(user, guild);
    }

    fn ensure_healthy(&self) -> BotResult<()> {
        if self.is_healthy() {
            Ok(())
        } else {
            Err(BotError::Store("memory store marked unhealthy".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn audit<'a>(&'a self, record: AuditRecord) -> BoxFuture<'a, BotResult<()>> {
        async move {
            self.ensure_healthy()?;
            self.audits.write().await.push(record);
            Ok(())
        }
        .boxed()
    }

    fn record_member<'a>(&'a self, user: &'a UserId, guild: &'a GuildId) -> BoxFuture<'a, BotResult<()>> {
        async move {
            self.ensure_healthy()?;
            let mut members = self.members.write().await;
            let guilds = members.entry(user.clone()).or_default();
            if !guilds.contains(guild) {
                guilds.push(guild.clone());
            }
            Ok(())
        }
        .boxed()
    }

    fn default_guild<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, BotResult<Option<GuildId>>> {
        async move {
            self.ensure_healthy()?;
            Ok(self.defaults.read().await.get(user).cloned())
        }
        .boxed()
    }

    fn user_guilds<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, BotResult<Vec<GuildId>>> {
        async move {
            self.ensure_healthy()?;
            Ok(self.members.read().await.get(user).cloned().unwrap_or_default())
        }
        .boxed()
    }
}
