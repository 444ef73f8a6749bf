use std::{collections::{HashMap, HashSet}, env, path::PathBuf, str::FromStr, time::Duration};

use crate::bot::{chat_event::chat_event::{GuildId, UserId}, commands::commands::BotResult, state::def::{BasicConfig, BotError, BotSettings, GuildConfig, ModulesConfig, SpamConfig}};

pub const DEFAULT_PREFIX: char = '!';

const DEFAULT_RESTRICTED: &[&str] = &["search", "lastping", "setstatus"];
const DEFAULT_NON_SERVER: &[&str] = &[
    "about", "roll", "episodegen", "episodequote", "help", "listguilds", "update", "announce", "dumptables", "defaultserver",
];

impl Default for BasicConfig {
    fn default() -> Self {
        BasicConfig {
            ignore_invalid_commands: false,
            alert_role: None,
            free_channels: HashSet::new(),
            bot_channel: None,
            aliases: HashMap::new(),
            listen_to_bots: false,
            command_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl Default for ModulesConfig {
    fn default() -> Self {
        ModulesConfig {
            channels: HashMap::new(),
            disabled: HashSet::new(),
            command_roles: HashMap::new(),
            command_channels: HashMap::new(),
            command_limits: HashMap::new(),
            command_disabled: HashSet::new(),
            command_per_duration: 3,
            command_max_duration: 20,
        }
    }
}

impl Default for SpamConfig {
    fn default() -> Self {
        SpamConfig { lockdown_duration: 120 }
    }
}

impl GuildConfig {
    /// The configured prefix when it is a single ASCII character, `!` otherwise.
    pub fn prefix(&self) -> char {
        let mut chars = self.basic.command_prefix.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => c,
            _ => DEFAULT_PREFIX,
        }
    }

    /// Per-channel cooldown for a command in seconds, 0 when unset.
    pub fn command_limit(&self, command: &str) -> i64 {
        self.modules.command_limits.get(command).copied().unwrap_or(0).max(0)
    }

    pub fn is_free_channel(&self, channel: &str) -> bool {
        self.basic.free_channels.contains(channel)
    }

    pub fn is_command_disabled(&self, command: &str) -> bool {
        self.modules.command_disabled.contains(command)
    }

    pub fn is_module_disabled(&self, module: &str) -> bool {
        self.modules.disabled.contains(&module.to_lowercase())
    }
}

impl BotSettings {
    pub fn new(self_id: impl Into<String>, main_guild: impl Into<String>) -> Self {
        let main_guild = GuildId::new(main_guild);
        BotSettings {
            self_id: UserId::new(self_id),
            db_guilds: HashSet::from([main_guild.clone()]),
            main_guild,
            owners: HashSet::new(),
            restricted_commands: DEFAULT_RESTRICTED.iter().map(|s| s.to_string()).collect(),
            non_server_commands: DEFAULT_NON_SERVER.iter().map(|s| s.to_string()).collect(),
            config_dir: PathBuf::from("config"),
            heartbeat_interval: Duration::from_secs(20),
            idle_interval: Duration::from_secs(20),
            max_missed_heartbeats: 5,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owners.insert(UserId::new(owner));
        self
    }

    /// Loads settings from the environment, reading a `.env` file first if one exists.
    pub fn from_env() -> BotResult<Self> {
        dotenvy::dotenv().ok();

        let self_id = required("BOT_USER_ID")?;
        let main_guild = required("MAIN_GUILD_ID")?;
        let mut settings = BotSettings::new(self_id, main_guild);

        if let Ok(owners) = env::var("BOT_OWNERS") {
            settings.owners = split_list(&owners).map(UserId::new).collect();
        }
        if let Ok(guilds) = env::var("DB_GUILDS") {
            settings.db_guilds.extend(split_list(&guilds).map(GuildId::new));
        }
        if let Ok(restricted) = env::var("RESTRICTED_COMMANDS") {
            settings.restricted_commands = split_list(&restricted).map(str::to_lowercase).collect();
        }
        if let Ok(independent) = env::var("NON_SERVER_COMMANDS") {
            settings.non_server_commands = split_list(&independent).map(str::to_lowercase).collect();
        }
        if let Ok(dir) = env::var("CONFIG_DIR") {
            settings.config_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_var::<u64>("HEARTBEAT_INTERVAL_SECS")? {
            settings.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("IDLE_INTERVAL_SECS")? {
            settings.idle_interval = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<u32>("MAX_MISSED_HEARTBEATS")? {
            if max == 0 {
                return Err(BotError::Config("MAX_MISSED_HEARTBEATS must be at least 1".into()));
            }
            settings.max_missed_heartbeats = max;
        }

        Ok(settings)
    }
}

fn required(key: &'static str) -> BotResult<String> {
    env::var(key).map_err(|_| BotError::Config(format!("Missing {key} environment variable. Set it in your environment or .env file.")))
}

fn parse_var<T: FromStr>(key: &'static str) -> BotResult<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| BotError::Config(format!("Invalid value for {key}: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
