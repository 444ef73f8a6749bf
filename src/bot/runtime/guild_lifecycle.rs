use std::sync::Arc;

use tracing::{error, info, warn};

use crate::bot::{chat_event::chat_event::{GuildId, GuildInfo}, commands::commands::BotResult, db::config::{load_guild_config, save_guild_config as write_guild_config}, guild::guild::GuildState, state::def::{AppState, BotError}};

pub async fn attach_guild(state: &Arc<AppState>, info: GuildInfo) -> BotResult<Arc<GuildState>> {
    let config = load_guild_config(&state.settings.config_dir, &info.id).await?;
    let guild = Arc::new(GuildState::new(info, config));

    let modules = state.catalog.build();
    for module in &modules {
        guild.register_module(module.clone()).await;
    }
    for module in &modules {
        if guild.command(module.name()).await.is_some() {
            warn!("Module name {} in guild {} is also a command name, help lookups will show the module", module.name(), guild.id);
        }
    }

    if state.registry.insert(guild.clone()).await.is_some() {
        warn!("Guild {} was attached twice, replaced the old state", guild.id);
    }
    info!("Attached guild {} ({}) with {} commands", guild.id, guild.name().await, guild.command_count().await);
    Ok(guild)
}

pub async fn detach_guild(state: &Arc<AppState>, id: &GuildId) -> BotResult<()> {
    match state.registry.remove(id).await {
        Some(_) => info!("Detached guild {id}"),
        None => warn!("Tried to detach unknown guild {id}"),
    }
    Ok(())
}

pub async fn reload_guild_config(state: &Arc<AppState>, id: &GuildId) -> BotResult<()> {
    let guild = state.registry.get(id).await.ok_or_else(|| BotError::GuildNotFound(id.clone()))?;
    let config = load_guild_config(&state.settings.config_dir, id).await?;
    *guild.config.write().await = config;
    info!("Reloaded config for guild {id}");
    Ok(())
}

pub async fn save_guild_config(state: &Arc<AppState>, id: &GuildId) -> BotResult<()> {
    let guild = state.registry.get(id).await.ok_or_else(|| BotError::GuildNotFound(id.clone()))?;
    let config = guild.config.read().await.clone();
    write_guild_config(&state.settings.config_dir, id, &config).await
}

/// Attaches every guild it can, returning how many made it.
pub async fn attach_guilds(state: &Arc<AppState>, guilds: Vec<GuildInfo>) -> usize {
    let mut attached = 0;
    for info in guilds {
        let id = info.id.clone();
        match attach_guild(state, info).await {
            Ok(_) => attached += 1,
            Err(e) => error!("Failed to attach guild {id}: {e:?}"),
        }
    }
    attached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{db::memory::MemoryStore, platforms::mock::mock::MockChatClient, state::def::BotSettings};

    fn app(dir: &std::path::Path) -> Arc<AppState> {
        let mut settings = BotSettings::new("bot", "main");
        settings.config_dir = dir.to_path_buf();
        Arc::new(AppState::new(settings, Arc::new(MockChatClient::new()), Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn attach_registers_help_first() {
        let dir = tempfile::tempdir().unwrap();
        let state = app(dir.path());

        let guild = attach_guild(&state, GuildInfo::new("main", "Main", "owner")).await.unwrap();
        assert!(state.registry.contains(&GuildId::new("main")).await);
        assert_eq!(guild.modules().await[0].name(), "Information");
        assert!(guild.command("about").await.is_some());
    }

    #[tokio::test]
    async fn reload_and_save_need_an_attached_guild() {
        let dir = tempfile::tempdir().unwrap();
        let state = app(dir.path());
        let missing = GuildId::new("nope");

        assert!(matches!(reload_guild_config(&state, &missing).await, Err(BotError::GuildNotFound(_))));
        assert!(matches!(save_guild_config(&state, &missing).await, Err(BotError::GuildNotFound(_))));
    }

    #[tokio::test]
    async fn reload_picks_up_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let state = app(dir.path());
        let guild = attach_guild(&state, GuildInfo::new("g", "G", "o")).await.unwrap();

        guild.config.write().await.basic.command_prefix = "$".into();
        save_guild_config(&state, &guild.id).await.unwrap();
        guild.config.write().await.basic.command_prefix = "!".into();

        reload_guild_config(&state, &guild.id).await.unwrap();
        assert_eq!(guild.config.read().await.prefix(), '$');
    }

    #[tokio::test]
    async fn batch_attach_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json").unwrap();
        let state = app(dir.path());

        let attached = attach_guilds(&state, vec![GuildInfo::new("good", "Good", "o"), GuildInfo::new("bad", "Bad", "o")]).await;
        assert_eq!(attached, 1);
        assert!(state.registry.get(&GuildId::new("bad")).await.is_none());

        detach_guild(&state, &GuildId::new("good")).await.unwrap();
        assert!(state.registry.is_empty().await);
    }
}
