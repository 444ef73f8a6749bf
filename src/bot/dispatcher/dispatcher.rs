use std::sync::Arc;

use rand::Rng;
use tracing::{debug, error, warn};

use crate::bot::{chat_event::chat_event::{ChannelId, ChatMessage, GuildId, UserId}, commands::{commands::{parse_arguments, Argument, BotResult}, CommandContext, CommandReply}, db::{AuditKind, AuditRecord}, dispatcher::outcome::{Denial, DispatchOutcome, RoutingMiss}, guild::guild::GuildState, permissions::permissions::{check_access, module_enabled, Invoker}, replies::Replies, state::{def::{AppState, GuildConfig}, state::DEFAULT_PREFIX}};

/// Returns the text after the prefix when `content` is a command candidate.
/// A lone prefix or a doubled one (`!!`) is not a command.
pub fn strip_prefix(content: &str, prefix: char) -> Option<&str> {
    let body = content.strip_prefix(prefix)?;
    if body.is_empty() || body.starts_with(prefix) {
        return None;
    }
    Some(body)
}

/// Resolves and runs one command message from the transport.
///
/// `guild` is `None` for private messages, which get routed to a guild first.
pub async fn dispatch_message(state: &Arc<AppState>, guild: Option<Arc<GuildState>>, msg: &ChatMessage, now: i64) -> BotResult<DispatchOutcome> {
    dispatch(state, guild, msg, now, false).await
}

/// Runs the deadlock probe through the same path as real traffic. It is never audited, rate limited
/// or answered; finishing it bumps the heartbeat counter instead.
pub async fn dispatch_heartbeat(state: &Arc<AppState>, guild: Arc<GuildState>, msg: &ChatMessage, now: i64) -> BotResult<DispatchOutcome> {
    dispatch(state, Some(guild), msg, now, true).await
}

async fn dispatch(state: &Arc<AppState>, guild: Option<Arc<GuildState>>, msg: &ChatMessage, now: i64, synthetic: bool) -> BotResult<DispatchOutcome> {
    let is_self = state.is_self(&msg.author.id);
    let process_owner = state.is_owner(&msg.author.id);
    let private = guild.is_none();

    let prefix = match &guild {
        Some(guild) => guild.config.read().await.prefix(),
        None => DEFAULT_PREFIX,
    };
    let Some(body) = strip_prefix(&msg.content, prefix) else {
        return Ok(DispatchOutcome::NotCommand);
    };

    if let Some(guild) = &guild {
        if !is_self && command_hooks_ignore(guild, msg).await && !process_owner && !guild.is_owner(&msg.author.id).await {
            debug!("Command from {} ignored by a module in guild {}", msg.author.id, guild.id);
            return Ok(DispatchOutcome::Ignored);
        }
    }

    let mut args = parse_arguments(body);
    let Some(first) = args.first() else {
        return Ok(DispatchOutcome::NotCommand);
    };
    let mut name = first.text.to_lowercase();

    let guild = match guild {
        Some(guild) => guild,
        None => match route_private(state, &msg.author.id, &name).await {
            Ok(guild) => guild,
            Err(miss) => {
                let denial = Denial::Routing(miss);
                if let Some(text) = denial.message(&[]) {
                    send_diagnostic(state, &msg.channel_id, &text).await?;
                }
                return Ok(DispatchOutcome::Denied { command: name, denial });
            }
        },
    };

    let cfg = guild.config.read().await.clone();
    if synthetic {
        state.heartbeat.checkpoint();
    }

    // Real commands win over aliases, and an alias target is looked up in the command table only.
    let mut command = guild.command(&name).await;
    if command.is_none() {
        if let Some(target) = cfg.basic.aliases.get(&name) {
            let rewritten = match args.get(1) {
                Some(rest) => format!("{target} {}", &body[rest.start..]),
                None => target.clone(),
            };
            args = parse_arguments(&rewritten);
            if let Some(first) = args.first() {
                name = first.text.to_lowercase();
                command = guild.command(&name).await;
            }
        }
    }
    if synthetic {
        state.heartbeat.checkpoint();
    }

    let Some(command) = command else {
        let reported = !cfg.basic.ignore_invalid_commands && !synthetic;
        if reported {
            let shown = args.first().map(|a| a.text.as_str()).unwrap_or(name.as_str());
            send_diagnostic(state, &msg.channel_id, &Replies::not_a_command(shown, prefix)).await?;
        }
        return Ok(DispatchOutcome::Unknown { name, reported });
    };
    let cmd_name = command.name().to_lowercase();

    let db_guild = state.is_db_guild(&guild.id);
    if db_guild && !is_self && !synthetic && state.store.is_healthy() {
        audit(state, &guild.id, msg, now).await;
    }

    let invoker = Invoker {
        process_owner,
        guild_owner: guild.is_owner(&msg.author.id).await,
        is_self,
        db_guild,
        private,
    };
    if let Err(denial) = check_access(&cfg, &cmd_name, &msg.author, &msg.channel_id, invoker, &state.settings.restricted_commands) {
        return deny(state, &guild, &cfg, msg, cmd_name, denial, synthetic).await;
    }

    if !private && !is_self {
        if let Err(denial) = check_rate_limits(&guild, &cfg, msg, &cmd_name, now).await {
            return deny(state, &guild, &cfg, msg, cmd_name, denial, synthetic).await;
        }
    }

    let rest: Vec<String> = args.into_iter().skip(1).map(|a: Argument| a.text).collect();
    let ctx = CommandContext {
        state: state.clone(),
        guild: guild.clone(),
        message: msg.clone(),
        private,
    };
    let reply = command.execute(rest, ctx).await?;

    if synthetic {
        state.heartbeat.beat();
    } else {
        deliver_reply(state, msg, private, reply).await?;
    }
    Ok(DispatchOutcome::Executed { command: cmd_name })
}

async fn command_hooks_ignore(guild: &Arc<GuildState>, msg: &ChatMessage) -> bool {
    let modules = guild.modules().await;
    let cfg = guild.config.read().await;
    let mut ignore = false;
    for module in modules.iter().filter(|m| module_enabled(&cfg, m.name(), Some(&msg.channel_id))) {
        if let Some(hook) = module.command_hook() {
            ignore |= hook.on_command(guild, msg);
        }
    }
    ignore
}

/// Picks the guild a private command runs against.
async fn route_private(state: &Arc<AppState>, user: &UserId, name: &str) -> Result<Arc<GuildState>, RoutingMiss> {
    if !state.store.is_healthy() {
        return Err(RoutingMiss::StoreUnavailable);
    }

    match state.store.default_guild(user).await {
        Ok(Some(id)) => {
            if let Some(guild) = state.registry.get(&id).await {
                return Ok(guild);
            }
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Failed to read default guild for {user}: {e}");
            return Err(RoutingMiss::StoreUnavailable);
        }
    }

    let guilds = state.store.user_guilds(user).await.map_err(|e| {
        warn!("Failed to read guilds for {user}: {e}");
        RoutingMiss::StoreUnavailable
    })?;

    let independent = state.settings.non_server_commands.contains(name);
    if !independent && guilds.len() != 1 {
        return Err(RoutingMiss::UnknownServer);
    }

    let target: GuildId = guilds.into_iter().next().unwrap_or_else(|| state.settings.main_guild.clone());
    state.registry.get(&target).await.ok_or(RoutingMiss::GuildNotLoaded)
}

/// Tier A (guild saturation) then Tier B (per channel cooldown). A Tier B denial keeps the Tier A slot.
async fn check_rate_limits(guild: &GuildState, cfg: &GuildConfig, msg: &ChatMessage, cmd_name: &str, now: i64) -> Result<(), Denial> {
    if cfg.is_free_channel(msg.channel_id.as_str()) {
        return Ok(());
    }

    let per_duration = cfg.modules.command_per_duration;
    let alert = cfg.basic.alert_role.as_ref().is_some_and(|r| msg.author.has_role(r.as_str()));
    if per_duration > 0 && !alert {
        let window = cfg.modules.command_max_duration;
        let mut limiter = guild.command_limit.lock().await;
        if let Err(remaining) = limiter.try_acquire(per_duration, window, now) {
            return Err(Denial::Saturated { limit: per_duration, window, remaining });
        }
    }

    let limit = cfg.command_limit(cmd_name);
    if limit > 0 {
        if let Err(remaining) = guild.command_last.try_acquire(&msg.channel_id, cmd_name, limit, now).await {
            return Err(Denial::Cooldown { limit, remaining });
        }
    }
    Ok(())
}

async fn deny(state: &Arc<AppState>, guild: &GuildState, cfg: &GuildConfig, msg: &ChatMessage, command: String, denial: Denial, synthetic: bool) -> BotResult<DispatchOutcome> {
    debug!("Denied {command} for {} in guild {}: {denial:?}", msg.author.id, guild.id);

    let role_names = match &denial {
        Denial::MissingRole { allowed } => guild.role_names(allowed.iter().map(String::as_str)).await,
        _ => Vec::new(),
    };

    if let Some(mut text) = denial.message(&role_names) {
        if denial.is_rate_limit() {
            if let Some(name) = cfg.basic.bot_channel.as_ref().and_then(|c| state.chat_client.channel_name(c)) {
                text.push_str(&Replies::bot_channel_hint(&name));
            }
        }
        if !synthetic {
            send_diagnostic(state, &msg.channel_id, &text).await?;
        }
    }
    Ok(DispatchOutcome::Denied { command, denial })
}

async fn audit(state: &Arc<AppState>, guild: &GuildId, msg: &ChatMessage, now: i64) {
    let record = AuditRecord {
        kind: AuditKind::Command,
        user_id: msg.author.id.clone(),
        user_name: msg.author.name.clone(),
        content: msg.content.clone(),
        guild_id: guild.clone(),
        timestamp: now,
    };
    if let Err(e) = state.store.audit(record).await {
        error!("Failed to audit command in guild {guild}: {e}");
    }
}

async fn send_diagnostic(state: &Arc<AppState>, channel: &ChannelId, text: &str) -> BotResult<()> {
    state.chat_client.send_message(channel, &Replies::code_block(text)).await
}

/// Sends a command reply, moving it to a private channel when the command asked for that.
async fn deliver_reply(state: &Arc<AppState>, msg: &ChatMessage, private: bool, reply: CommandReply) -> BotResult<()> {
    if reply.is_empty() {
        return Ok(());
    }

    let client = &state.chat_client;
    let mut target = msg.channel_id.clone();
    if reply.prefer_private && !private {
        match client.open_private_channel(&msg.author.id).await {
            Ok(channel) => {
                target = channel;
                let joke = rand::thread_rng().gen_bool(0.01);
                let notice = if joke { Replies::check_pm_joke() } else { Replies::check_pm() };
                client.send_message(&msg.channel_id, &notice).await?;
            }
            Err(e) => {
                warn!("Error opening private channel for {}: {e}", msg.author.id);
                client.send_message(&msg.channel_id, &Replies::pm_failed()).await?;
            }
        }
    }

    match &reply.embed {
        Some(embed) => client.send_embed(&target, embed).await,
        None => client.send_message(&target, &reply.text).await,
    }
}
