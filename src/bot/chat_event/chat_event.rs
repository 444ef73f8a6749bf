use core::fmt;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Reserved pseudo-channel the heartbeat probe is addressed to.
pub const HEARTBEAT_CHANNEL: &str = "heartbeat";

macro_rules! opaque_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                pub fn new(id: impl Into<String>) -> Self {
                    Self(id.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<&str> for $name {
                fn from(id: &str) -> Self {
                    Self(id.to_string())
                }
            }
        )+
    };
}

opaque_id!(GuildId, ChannelId, UserId, RoleId);

impl ChannelId {
    pub fn heartbeat() -> Self {
        Self(HEARTBEAT_CHANNEL.to_string())
    }

    pub fn is_heartbeat(&self) -> bool {
        self.0 == HEARTBEAT_CHANNEL
    }
}

#[derive(Debug, Clone)]
pub struct ChatUser {
    pub id: UserId,
    pub name: String,
    pub bot: bool,
    pub roles: HashSet<RoleId>,
}

impl ChatUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            bot: false,
            roles: HashSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(RoleId::new(role));
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    /// `None` for private channels.
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author: ChatUser,
    pub content: String,
    /// Unix seconds.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn is_private(&self) -> bool {
        self.guild_id.is_none()
    }

    /// Builds the synthetic probe the deadlock detector pushes through the pipeline.
    pub fn heartbeat(guild_id: GuildId, author: UserId, content: String, timestamp: i64) -> Self {
        Self {
            id: format!("heartbeat-{timestamp}"),
            guild_id: Some(guild_id),
            channel_id: ChannelId::heartbeat(),
            author: ChatUser {
                id: author,
                name: "heartbeat".to_string(),
                bot: true,
                roles: HashSet::new(),
            },
            content,
            timestamp,
        }
    }
}

/// Snapshot of guild metadata delivered by the transport.
#[derive(Debug, Clone)]
pub struct GuildInfo {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
    pub roles: HashMap<RoleId, String>,
}

impl GuildInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: GuildId::new(id),
            name: name.into(),
            owner_id: UserId::new(owner_id),
            roles: HashMap::new(),
        }
    }

    pub fn with_role(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.roles.insert(RoleId::new(id), name.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum GuildEvent {
    MemberAdd { guild_id: GuildId, user: ChatUser },
    MemberRemove { guild_id: GuildId, user: ChatUser },
    MemberUpdate { guild_id: GuildId, user: ChatUser },
    BanAdd { guild_id: GuildId, user_id: UserId },
    BanRemove { guild_id: GuildId, user_id: UserId },
    RoleDelete { guild_id: GuildId, role_id: RoleId },
    Update(GuildInfo),
}

impl GuildEvent {
    pub fn guild_id(&self) -> &GuildId {
        match self {
            GuildEvent::MemberAdd { guild_id, .. }
            | GuildEvent::MemberRemove { guild_id, .. }
            | GuildEvent::MemberUpdate { guild_id, .. }
            | GuildEvent::BanAdd { guild_id, .. }
            | GuildEvent::BanRemove { guild_id, .. }
            | GuildEvent::RoleDelete { guild_id, .. } => guild_id,
            GuildEvent::Update(info) => &info.id,
        }
    }
}

/// Everything the transport (or the deadlock detector) can hand to the core.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    MessageCreate(ChatMessage),
    MessageUpdate(ChatMessage),
    MessageDelete(ChatMessage),
    GuildCreate(GuildInfo),
    GuildDelete(GuildId),
    Guild(GuildEvent),
    Heartbeat(ChatMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured reply payload; rendering is the transport's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_probe_targets_pseudo_channel() {
        let msg = ChatMessage::heartbeat(GuildId::new("1"), UserId::new("bot"), "!about".into(), 10);
        assert!(msg.channel_id.is_heartbeat());
        assert!(!msg.is_private());
        assert!(msg.author.bot);
    }

    #[test]
    fn guild_event_exposes_guild() {
        let ev = GuildEvent::RoleDelete { guild_id: GuildId::new("9"), role_id: RoleId::new("r") };
        assert_eq!(ev.guild_id().as_str(), "9");
    }
}
