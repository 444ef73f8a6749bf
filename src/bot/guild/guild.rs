use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::bot::{chat_event::chat_event::{GuildId, GuildInfo, RoleId, UserId}, commands::{commands::Command, CommandMap, Module}, ratelimit::{cooldown::CooldownTable, saturation::SaturationLimiter}, state::def::GuildConfig};

/// All mutable data of one guild. Each table has its own lock, none of them is the registry lock.
pub struct GuildState {
    pub id: GuildId,
    pub info: RwLock<GuildInfo>,
    pub config: RwLock<GuildConfig>,
    pub command_last: CooldownTable,
    pub command_limit: Mutex<SaturationLimiter>,
    commands: RwLock<CommandMap>,
    modules: RwLock<Vec<Arc<dyn Module>>>,
    lockdown: RwLock<Option<i64>>,
}

impl GuildState {
    pub fn new(info: GuildInfo, config: GuildConfig) -> Self {
        Self {
            id: info.id.clone(),
            info: RwLock::new(info),
            config: RwLock::new(config),
            command_last: CooldownTable::new(),
            command_limit: Mutex::new(SaturationLimiter::new()),
            commands: RwLock::new(CommandMap::new()),
            modules: RwLock::new(Vec::new()),
            lockdown: RwLock::new(None),
        }
    }

    pub async fn name(&self) -> String {
        self.info.read().await.name.clone()
    }

    pub async fn is_owner(&self, user: &UserId) -> bool {
        &self.info.read().await.owner_id == user
    }

    pub async fn update_info(&self, info: GuildInfo) {
        *self.info.write().await = info;
    }

    /// Display names for the given roles; unknown roles are shown by id.
    pub async fn role_names<'a>(&self, roles: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let info = self.info.read().await;
        roles
            .into_iter()
            .map(|id| info.roles.get(&RoleId::new(id)).cloned().unwrap_or_else(|| id.to_string()))
            .collect()
    }

    /// Inserts under the lower cased name. Returns `true` when an existing command was replaced.
    pub async fn add_command(&self, command: Arc<dyn Command>) -> bool {
        let key = command.name().to_lowercase();
        let mut commands = self.commands.write().await;
        let replaced = commands.insert(key.clone(), command).is_some();
        if replaced {
            warn!("Command name collision in guild {}: {key} was registered twice, keeping the last one", self.id);
        }
        replaced
    }

    pub async fn register_module(&self, module: Arc<dyn Module>) {
        for command in module.commands() {
            self.add_command(command).await;
        }
        info!("Registered module {} in guild {}", module.name(), self.id);
        self.modules.write().await.push(module);
    }

    pub async fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().await.get(&name.to_lowercase()).cloned()
    }

    pub async fn command_count(&self) -> usize {
        self.commands.read().await.len()
    }

    /// Snapshot in registration order.
    pub async fn modules(&self) -> Vec<Arc<dyn Module>> {
        self.modules.read().await.clone()
    }

    pub async fn module(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules
            .read()
            .await
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub async fn engage_lockdown(&self, now: i64) {
        *self.lockdown.write().await = Some(now);
    }

    pub async fn lockdown_started(&self) -> Option<i64> {
        *self.lockdown.read().await
    }

    pub async fn disengage_lockdown(&self) {
        *self.lockdown.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::bot::commands::{commands::{CommandGroup, FnCommand}, CommandReply};

    fn echo(name: &str, reply: &'static str) -> Arc<dyn Command> {
        Arc::new(FnCommand::new(name, "", "", move |_, _| async move { Ok(CommandReply::text(reply)) }.boxed()))
    }

    fn guild() -> GuildState {
        GuildState::new(GuildInfo::new("g1", "Guild", "owner"), GuildConfig::default())
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_one_entry() {
        let guild = guild();
        assert!(!guild.add_command(echo("Ping", "first")).await);
        assert!(guild.add_command(echo("ping", "second")).await);
        assert_eq!(guild.command_count().await, 1);
        assert_eq!(guild.command("PING").await.map(|c| c.name().to_string()), Some("ping".to_string()));
    }

    #[tokio::test]
    async fn modules_keep_registration_order() {
        let guild = guild();
        guild.register_module(Arc::new(CommandGroup::new("Fun", "").with(echo("roll", "4")))).await;
        guild.register_module(Arc::new(CommandGroup::new("Info", "").with(echo("about", "me")))).await;

        let names: Vec<String> = guild.modules().await.iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["Fun", "Info"]);
        assert!(guild.module("fun").await.is_some());
        assert_eq!(guild.command_count().await, 2);
    }

    #[tokio::test]
    async fn lockdown_round_trip() {
        let guild = guild();
        assert_eq!(guild.lockdown_started().await, None);
        guild.engage_lockdown(42).await;
        assert_eq!(guild.lockdown_started().await, Some(42));
        guild.disengage_lockdown().await;
        assert_eq!(guild.lockdown_started().await, None);
    }

    #[tokio::test]
    async fn role_names_fall_back_to_ids() {
        let guild = GuildState::new(GuildInfo::new("g", "G", "o").with_role("r1", "Mods"), GuildConfig::default());
        assert_eq!(guild.role_names(["r1", "r2"]).await, vec!["Mods", "r2"]);
    }
}
