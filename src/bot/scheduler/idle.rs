use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::bot::{commands::commands::BotResult, guild::guild::GuildState, permissions::permissions::module_enabled, state::def::{AppState, BotError}};

pub fn start_idle_task(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move { run_idle_loop(state).await })
}

/// Ticks every attached guild once per interval until the quit flag is set.
pub async fn run_idle_loop(state: Arc<AppState>) {
    while !state.should_quit() {
        let now = chrono::Utc::now().timestamp();
        tick_all(&state, now).await;
        debug!("Idle check at {now}");

        tokio::time::sleep(state.settings.idle_interval).await;
    }
}

pub async fn tick_all(state: &Arc<AppState>, now: i64) {
    // Snapshot so the registry lock is released before any guild work.
    for guild in state.registry.snapshot().await {
        match tick_guild(state, &guild, now).await {
            Ok(()) => {}
            Err(BotError::ChannelUnavailable(id)) => debug!("Skipping guild {id} this tick, channel list unavailable"),
            Err(e) => error!("Idle tick failed for guild {}: {e:?}", guild.id),
        }
    }
}

pub async fn tick_guild(state: &Arc<AppState>, guild: &Arc<GuildState>, now: i64) -> BotResult<()> {
    let channels = state.chat_client.guild_channels(&guild.id)?;
    let modules = guild.modules().await;
    let cfg = guild.config.read().await.clone();

    for channel in &channels {
        let Some(last) = state.activity.last_message(channel) else {
            continue;
        };
        let idle_for = now - last;

        for module in &modules {
            let Some(hook) = module.idle_hook() else {
                continue;
            };
            if module_enabled(&cfg, module.name(), Some(channel)) && idle_for >= hook.idle_period(&cfg) {
                if let Err(e) = hook.on_idle(state, guild, channel).await {
                    error!("Idle hook of {} failed in {channel}: {e:?}", module.name());
                }
            }
        }
    }

    for module in &modules {
        let Some(hook) = module.tick_hook() else {
            continue;
        };
        if module_enabled(&cfg, module.name(), None) {
            if let Err(e) = hook.on_tick(state, guild).await {
                error!("Tick hook of {} failed in guild {}: {e:?}", module.name(), guild.id);
            }
        }
    }

    if let Some(started) = guild.lockdown_started().await {
        if now - started > cfg.spam.lockdown_duration {
            if let Err(e) = state.chat_client.end_lockdown(&guild.id).await {
                error!("Failed to end lockdown in guild {}: {e:?}", guild.id);
            }
            guild.disengage_lockdown().await;
            info!("Lockdown in guild {} expired", guild.id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;
    use crate::bot::{chat_event::chat_event::{ChannelId, GuildId, GuildInfo}, commands::{commands::Command, HookFuture, IdleHook, Module, ModuleCatalog, TickHook}, db::memory::MemoryStore, platforms::mock::mock::MockChatClient, runtime::guild_lifecycle::attach_guild, state::def::{BotSettings, GuildConfig}};

    #[derive(Default)]
    struct Counters {
        idle: AtomicUsize,
        tick: AtomicUsize,
    }

    struct Watcher(Arc<Counters>);

    impl Module for Watcher {
        fn name(&self) -> &str { "Watcher" }
        fn description(&self) -> &str { "Counts hook calls." }
        fn commands(&self) -> Vec<Arc<dyn Command>> { Vec::new() }
        fn idle_hook(&self) -> Option<&dyn IdleHook> { Some(self) }
        fn tick_hook(&self) -> Option<&dyn TickHook> { Some(self) }
    }

    impl IdleHook for Watcher {
        fn idle_period(&self, _config: &GuildConfig) -> i64 { 60 }

        fn on_idle<'a>(&'a self, _state: &'a Arc<AppState>, _guild: &'a Arc<GuildState>, _channel: &'a ChannelId) -> HookFuture<'a> {
            async move {
                self.0.idle.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        }
    }

    impl TickHook for Watcher {
        fn on_tick<'a>(&'a self, _state: &'a Arc<AppState>, _guild: &'a Arc<GuildState>) -> HookFuture<'a> {
            async move {
                self.0.tick.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        }
    }

    async fn setup() -> (Arc<AppState>, Arc<MockChatClient>, Arc<Counters>, Arc<GuildState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = BotSettings::new("bot", "main");
        settings.config_dir = dir.path().to_path_buf();
        let client = Arc::new(MockChatClient::new());
        client.set_guild_channels(GuildId::new("main"), vec![ChannelId::new("quiet"), ChannelId::new("busy")]);

        let counters = Arc::new(Counters::default());
        let shared = counters.clone();
        let catalog = ModuleCatalog::new().register(move || Arc::new(Watcher(shared.clone())) as Arc<dyn Module>);
        let state = Arc::new(AppState::new(settings, client.clone(), Arc::new(MemoryStore::new())).with_catalog(catalog));
        let guild = attach_guild(&state, GuildInfo::new("main", "Main", "owner")).await.unwrap();
        (state, client, counters, guild, dir)
    }

    #[tokio::test]
    async fn idle_hooks_fire_only_for_quiet_channels() {
        let (state, _client, counters, guild, _dir) = setup().await;
        state.activity.touch(&ChannelId::new("quiet"), 0);
        state.activity.touch(&ChannelId::new("busy"), 90);

        tick_guild(&state, &guild, 100).await.unwrap();
        assert_eq!(counters.idle.load(Ordering::SeqCst), 1);
        assert_eq!(counters.tick.load(Ordering::SeqCst), 1);

        // not deduplicated: still idle on the next tick
        tick_guild(&state, &guild, 120).await.unwrap();
        assert_eq!(counters.idle.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_module_gets_no_hooks() {
        let (state, _client, counters, guild, _dir) = setup().await;
        state.activity.touch(&ChannelId::new("quiet"), 0);
        guild.config.write().await.modules.disabled.insert("watcher".into());

        tick_guild(&state, &guild, 1000).await.unwrap();
        assert_eq!(counters.idle.load(Ordering::SeqCst), 0);
        assert_eq!(counters.tick.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_channel_list_skips_only_that_guild() {
        let (state, _client, counters, _guild, _dir) = setup().await;
        attach_guild(&state, GuildInfo::new("other", "Other", "owner")).await.unwrap();

        tick_all(&state, 10).await;
        // "other" has no channel list in the mock, "main" still ticked
        assert_eq!(counters.tick.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lockdown_expires_strictly_after_duration() {
        let (state, client, _counters, guild, _dir) = setup().await;
        guild.engage_lockdown(1000).await;

        tick_guild(&state, &guild, 1120).await.unwrap();
        assert_eq!(guild.lockdown_started().await, Some(1000));
        assert!(client.ended_lockdowns().await.is_empty());

        tick_guild(&state, &guild, 1121).await.unwrap();
        assert_eq!(guild.lockdown_started().await, None);
        assert_eq!(client.ended_lockdowns().await, vec![GuildId::new("main")]);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_exits_on_quit() {
        let (state, _client, counters, _guild, _dir) = setup().await;
        let handle = start_idle_task(state.clone());

        tokio::time::sleep(std::time::Duration::from_secs(50)).await;
        state.request_quit();
        handle.await.unwrap();
        assert_eq!(counters.tick.load(Ordering::SeqCst), 3);
    }
}
