use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, error, info, warn};

use crate::bot::{chat_event::chat_event::{ChannelId, ChatMessage, Embed, GuildEvent, GuildId, InboundEvent, UserId}, commands::{commands::BotResult, Module}, dispatcher::{dispatcher::{dispatch_heartbeat, dispatch_message}, outcome::DispatchOutcome}, guild::guild::GuildState, permissions::permissions::module_enabled, runtime::guild_lifecycle::{attach_guild, detach_guild}, state::def::AppState};

/// Platform limit for a single bulk delete request.
pub const BULK_DELETE_LIMIT: usize = 100;

/// Outbound side of the chat transport.
pub trait ChatClient: Send + Sync {
    fn send_message<'a>(&'a self, channel: &'a ChannelId, message: &'a str) -> BoxFuture<'a, BotResult<()>>;
    fn send_embed<'a>(&'a self, channel: &'a ChannelId, embed: &'a Embed) -> BoxFuture<'a, BotResult<()>>;
    fn open_private_channel<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, BotResult<ChannelId>>;
    fn bulk_delete<'a>(&'a self, channel: &'a ChannelId, message_ids: &'a [String]) -> BoxFuture<'a, BotResult<()>>;
    /// Reverts whatever the platform did when the guild went into lockdown.
    fn end_lockdown<'a>(&'a self, guild: &'a GuildId) -> BoxFuture<'a, BotResult<()>>;

    /// Live channel list from the transport cache.
    fn guild_channels(&self, guild: &GuildId) -> BotResult<Vec<ChannelId>>;
    fn channel_name(&self, channel: &ChannelId) -> Option<String>;
}

/// Deletes in chunks the platform accepts, stopping at the first failed chunk.
pub async fn bulk_delete_chunked(client: &dyn ChatClient, channel: &ChannelId, message_ids: &[String]) -> BotResult<()> {
    for chunk in message_ids.chunks(BULK_DELETE_LIMIT) {
        client.bulk_delete(channel, chunk).await?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum MessageKind {
    Create,
    Update,
    Delete,
}

pub async fn handle_event(state: Arc<AppState>, event: InboundEvent) -> BotResult<()> {
    match event {
        InboundEvent::MessageCreate(msg) => handle_message_create(&state, msg, false).await,
        InboundEvent::MessageUpdate(msg) => handle_message_change(&state, msg, MessageKind::Update).await,
        InboundEvent::MessageDelete(msg) => handle_message_change(&state, msg, MessageKind::Delete).await,
        InboundEvent::GuildCreate(info) => {
            match state.registry.get(&info.id).await {
                Some(guild) => guild.update_info(info).await,
                None => {
                    attach_guild(&state, info).await?;
                }
            }
            Ok(())
        }
        InboundEvent::GuildDelete(id) => detach_guild(&state, &id).await,
        InboundEvent::Guild(ev) => handle_guild_event(&state, ev).await,
        InboundEvent::Heartbeat(msg) => handle_message_create(&state, msg, true).await,
    }
}

/// Shared by real messages and the deadlock probe, so the probe takes every lock real traffic takes.
async fn handle_message_create(state: &Arc<AppState>, msg: ChatMessage, synthetic: bool) -> BotResult<()> {
    if !synthetic && msg.channel_id.is_heartbeat() {
        debug!("Dropping transport message in the reserved heartbeat channel from {}", msg.author.id);
        return Ok(());
    }
    state.activity.touch(&msg.channel_id, msg.timestamp);

    let guild = match &msg.guild_id {
        Some(id) => match state.registry.get(id).await {
            Some(guild) => Some(guild),
            None => {
                debug!("Dropping message for unknown guild {id}");
                return Ok(());
            }
        },
        None => None,
    };

    if synthetic {
        let Some(guild) = guild else {
            warn!("Failed to get main guild during heartbeat test");
            return Ok(());
        };
        state.heartbeat.checkpoint();
        dispatch_heartbeat(state, guild, &msg, msg.timestamp).await?;
        return Ok(());
    }

    if let Some(guild) = &guild {
        if !state.is_self(&msg.author.id) && state.is_db_guild(&guild.id) && state.store.is_healthy() {
            if let Err(e) = state.store.record_member(&msg.author.id, &guild.id).await {
                warn!("Failed to record member {}: {e}", msg.author.id);
            }
        }
    }

    if state.is_self(&msg.author.id) {
        return Ok(());
    }
    if msg.author.bot {
        let listen = match &guild {
            Some(guild) => guild.config.read().await.basic.listen_to_bots,
            None => false,
        };
        if !listen {
            return Ok(());
        }
    }

    let outcome = dispatch_message(state, guild.clone(), &msg, msg.timestamp).await?;
    if outcome == DispatchOutcome::NotCommand {
        if let Some(guild) = guild {
            fan_out_message(state, &guild, &msg, MessageKind::Create).await;
        }
    }
    Ok(())
}

async fn handle_message_change(state: &Arc<AppState>, msg: ChatMessage, kind: MessageKind) -> BotResult<()> {
    let Some(guild_id) = &msg.guild_id else {
        return Ok(());
    };
    let Some(guild) = state.registry.get(guild_id).await else {
        return Ok(());
    };
    if matches!(kind, MessageKind::Update) && state.is_self(&msg.author.id) {
        return Ok(());
    }

    fan_out_message(state, &guild, &msg, kind).await;
    Ok(())
}

async fn enabled_modules(guild: &GuildState, channel: Option<&ChannelId>) -> Vec<Arc<dyn Module>> {
    let modules = guild.modules().await;
    let cfg = guild.config.read().await;
    modules.into_iter().filter(|m| module_enabled(&cfg, m.name(), channel)).collect()
}

async fn fan_out_message(state: &Arc<AppState>, guild: &Arc<GuildState>, msg: &ChatMessage, kind: MessageKind) {
    for module in enabled_modules(guild, Some(&msg.channel_id)).await {
        let Some(hook) = module.message_hook() else {
            continue;
        };
        let result = match kind {
            MessageKind::Create => hook.on_message_create(state, guild, msg).await,
            MessageKind::Update => hook.on_message_update(state, guild, msg).await,
            MessageKind::Delete => hook.on_message_delete(state, guild, msg).await,
        };
        if let Err(e) = result {
            error!("Module {} failed on {kind:?} in guild {}: {e:?}", module.name(), guild.id);
        }
    }
}

async fn handle_guild_event(state: &Arc<AppState>, ev: GuildEvent) -> BotResult<()> {
    let Some(guild) = state.registry.get(ev.guild_id()).await else {
        return Ok(());
    };

    match &ev {
        GuildEvent::MemberRemove { user, .. } if state.is_self(&user.id) => {
            info!("Removed from guild {}", guild.id);
            return detach_guild(state, &guild.id).await;
        }
        GuildEvent::Update(info) => guild.update_info(info.clone()).await,
        GuildEvent::RoleDelete { role_id, .. } => {
            guild.info.write().await.roles.remove(role_id);
        }
        _ => {}
    }

    for module in enabled_modules(&guild, None).await {
        if let Some(hook) = module.guild_hook() {
            if let Err(e) = hook.on_guild_event(state, &guild, &ev).await {
                error!("Module {} failed on guild event in {}: {e:?}", module.name(), guild.id);
            }
        }
    }
    Ok(())
}
