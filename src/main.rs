use std::{sync::Arc, time::Duration};

use guildwarden::bot::{
    chat_event::chat_event::{ChannelId, ChatUser, GuildInfo},
    db::memory::MemoryStore,
    platforms::console::console::{run_console_reader, ConsoleChatClient},
    run_event_loop,
    runtime::guild_lifecycle::attach_guild,
    scheduler::{deadlock::start_deadlock_detector, idle::start_idle_task},
    state::def::{AppState, BotSettings},
};
use tokio::{sync::mpsc::unbounded_channel, time::timeout};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = match BotSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let guild_id = settings.main_guild.clone();
    let channel = ChannelId::new("console");
    let operator = settings.owners.iter().next().cloned().map(|o| o.to_string()).unwrap_or_else(|| "console-user".to_string());

    let client = Arc::new(ConsoleChatClient::new(guild_id.clone(), channel.clone()));
    let state = Arc::new(AppState::new(settings, client, Arc::new(MemoryStore::new())));

    if let Err(e) = attach_guild(&state, GuildInfo::new(guild_id.as_str(), "Console", operator.as_str())).await {
        error!("Failed to attach main guild {guild_id}: {e}");
        std::process::exit(1);
    }

    let (tx, rx) = unbounded_channel();

    let idle = start_idle_task(state.clone());
    let detector = start_deadlock_detector(state.clone());

    let reader_guild = guild_id.clone();
    tokio::spawn(async move {
        if let Err(e) = run_console_reader(tx, reader_guild, channel, ChatUser::new(operator.as_str(), "operator")).await {
            error!("Console reader failed: {e:?}");
        }
    });

    let quit_state = state.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Shutting down");
        quit_state.request_quit();

        // Both loops check the flag once per interval.
        let grace = quit_state.settings.heartbeat_interval.max(quit_state.settings.idle_interval) + Duration::from_secs(1);
        if timeout(grace, async {
            let _ = idle.await;
            let _ = detector.await;
        })
        .await
        .is_err()
        {
            warn!("Background tasks did not stop within {grace:?}");
        }
        // stdin keeps the event loop's sender alive, so exit here instead of waiting for EOF
        std::process::exit(0);
    });

    info!("guildwarden v{} running in guild {guild_id}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = run_event_loop(state, rx).await {
        error!("Error running event loop: {e:?}");
    }
}
