use std::{collections::{HashMap, HashSet}, io, path::PathBuf, sync::{atomic::{AtomicBool, Ordering}, Arc}, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bot::{chat_event::chat_event::{ChannelId, GuildId, RoleId, UserId}, commands::ModuleCatalog, db::Store, guild::registry::GuildRegistry, handler::handler::ChatClient, runtime::channel_activity::ChannelActivity, scheduler::deadlock::Heartbeat};

pub struct AppState {
    pub settings: Arc<BotSettings>,
    pub registry: GuildRegistry,
    pub catalog: ModuleCatalog,
    pub chat_client: Arc<dyn ChatClient>,
    pub store: Arc<dyn Store>,
    pub activity: ChannelActivity,
    pub heartbeat: Heartbeat,
    /// Unix seconds.
    pub started_at: i64,
    quit: AtomicBool,
}

impl AppState {
    pub fn new(settings: BotSettings, chat_client: Arc<dyn ChatClient>, store: Arc<dyn Store>) -> Self {
        Self {
            settings: Arc::new(settings),
            registry: GuildRegistry::new(),
            catalog: ModuleCatalog::new(),
            chat_client,
            store,
            activity: ChannelActivity::new(),
            heartbeat: Heartbeat::new(),
            started_at: chrono::Utc::now().timestamp(),
            quit: AtomicBool::new(false),
        }
    }

    pub fn with_catalog(mut self, catalog: ModuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn should_quit(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    pub fn is_self(&self, user: &UserId) -> bool {
        &self.settings.self_id == user
    }

    pub fn is_owner(&self, user: &UserId) -> bool {
        self.settings.owners.contains(user)
    }

    /// Guilds allowed to use the store and the restricted commands.
    pub fn is_db_guild(&self, guild: &GuildId) -> bool {
        self.settings.db_guilds.contains(guild)
    }
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub self_id: UserId,
    pub main_guild: GuildId,
    pub owners: HashSet<UserId>,
    pub db_guilds: HashSet<GuildId>,
    pub restricted_commands: HashSet<String>,
    pub non_server_commands: HashSet<String>,
    pub config_dir: PathBuf,
    pub heartbeat_interval: Duration,
    pub idle_interval: Duration,
    pub max_missed_heartbeats: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct GuildConfig {
    #[serde(default)]
    pub basic: BasicConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub spam: SpamConfig,
    // Command specific settings we carry but never interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct BasicConfig {
    #[serde(rename = "ignoreinvalidcommands")]
    pub ignore_invalid_commands: bool,
    #[serde(rename = "alertrole")]
    pub alert_role: Option<RoleId>,
    #[serde(rename = "freechannels")]
    pub free_channels: HashSet<String>,
    #[serde(rename = "botchannel")]
    pub bot_channel: Option<ChannelId>,
    pub aliases: HashMap<String, String>,
    #[serde(rename = "listentobots")]
    pub listen_to_bots: bool,
    #[serde(rename = "commandprefix")]
    pub command_prefix: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct ModulesConfig {
    #[serde(rename = "modulechannels")]
    pub channels: HashMap<String, HashSet<String>>,
    #[serde(rename = "moduledisabled")]
    pub disabled: HashSet<String>,
    #[serde(rename = "commandroles")]
    pub command_roles: HashMap<String, HashSet<String>>,
    #[serde(rename = "commandchannels")]
    pub command_channels: HashMap<String, HashSet<String>>,
    #[serde(rename = "commandlimits")]
    pub command_limits: HashMap<String, i64>,
    #[serde(rename = "commanddisabled")]
    pub command_disabled: HashSet<String>,
    #[serde(rename = "commandperduration")]
    pub command_per_duration: usize,
    #[serde(rename = "commandmaxduration")]
    pub command_max_duration: i64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct SpamConfig {
    #[serde(rename = "lockdownduration")]
    pub lockdown_duration: i64,
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Guild not loaded: {0}")]
    GuildNotFound(GuildId),
    #[error("Channel list unavailable for guild: {0}")]
    ChannelUnavailable(GuildId),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("{0}")]
    Custom(String),
}
