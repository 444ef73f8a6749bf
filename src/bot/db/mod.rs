use futures::future::BoxFuture;
use serde::Serialize;

use crate::bot::{chat_event::chat_event::{GuildId, UserId}, commands::commands::BotResult};

pub mod config;
pub mod memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditKind {
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub kind: AuditKind,
    pub user_id: UserId,
    pub user_name: String,
    pub content: String,
    pub guild_id: GuildId,
    pub timestamp: i64,
}

/// Persistence the core leans on. Callers check `is_healthy` before anything privileged.
pub trait Store: Send + Sync {
    fn is_healthy(&self) -> bool;

    fn audit<'a>(&'a self, record: AuditRecord) -> BoxFuture<'a, BotResult<()>>;

    /// Remembers that `user` talked in `guild`.
    fn record_member<'a>(&'a self, user: &'a UserId, guild: &'a GuildId) -> BoxFuture<'a, BotResult<()>>;

    /// Guild the user picked for private commands, if any.
    fn default_guild<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, BotResult<Option<GuildId>>>;

    fn user_guilds<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, BotResult<Vec<GuildId>>>;
}
