use std::collections::HashSet;

use crate::bot::{chat_event::chat_event::{ChannelId, ChatUser}, dispatcher::outcome::Denial, state::def::GuildConfig};

/// Entry that turns an allow list into a deny list.
pub const REVERSE_SENTINEL: &str = "!";

/// Who is asking, as far as the gate cares.
#[derive(Debug, Clone, Copy, Default)]
pub struct Invoker {
    pub process_owner: bool,
    pub guild_owner: bool,
    pub is_self: bool,
    pub db_guild: bool,
    pub private: bool,
}

impl Invoker {
    fn trusted(&self) -> bool {
        self.process_owner || self.is_self
    }
}

/// An empty set admits everything. Otherwise the channel must be listed, or with the sentinel
/// present, must not be listed.
pub fn channel_allowed(set: &HashSet<String>, channel: &ChannelId) -> bool {
    if set.is_empty() {
        return true;
    }
    let reverse = set.contains(REVERSE_SENTINEL);
    set.contains(channel.as_str()) != reverse
}

/// Same rules as channels: the user needs one listed role, or with the sentinel none of them.
pub fn role_allowed(set: &HashSet<String>, user: &ChatUser) -> bool {
    if set.is_empty() {
        return true;
    }
    let reverse = set.contains(REVERSE_SENTINEL);
    let holds_any = set.iter().filter(|r| r.as_str() != REVERSE_SENTINEL).any(|r| user.has_role(r));
    holds_any != reverse
}

/// Whether a module's hooks may run in `channel`. `None` is used for guild wide hooks.
pub fn module_enabled(config: &GuildConfig, module: &str, channel: Option<&ChannelId>) -> bool {
    let module = module.to_lowercase();
    if config.modules.disabled.contains(&module) {
        return false;
    }
    match (channel, config.modules.channels.get(&module)) {
        (Some(channel), Some(set)) => channel_allowed(set, channel),
        _ => true,
    }
}

/// Runs the disabled, restricted, channel and role checks in that order.
pub fn check_access(config: &GuildConfig, command: &str, user: &ChatUser, channel: &ChannelId, invoker: Invoker, restricted: &HashSet<String>) -> Result<(), Denial> {
    if config.is_command_disabled(command) && !invoker.trusted() && !invoker.guild_owner {
        return Err(Denial::Disabled);
    }

    if restricted.contains(command) && !invoker.db_guild {
        return Err(Denial::Restricted);
    }

    if invoker.trusted() {
        return Ok(());
    }

    if !invoker.private {
        if let Some(set) = config.modules.command_channels.get(command) {
            if !channel_allowed(set, channel) {
                return Err(Denial::Channel);
            }
        }
    }

    if !invoker.guild_owner {
        if let Some(set) = config.modules.command_roles.get(command) {
            if !role_allowed(set, user) {
                let mut allowed: Vec<String> = set.iter().filter(|r| r.as_str() != REVERSE_SENTINEL).cloned().collect();
                allowed.sort();
                return Err(Denial::MissingRole { allowed });
            }
        }
    }

    Ok(())
}
