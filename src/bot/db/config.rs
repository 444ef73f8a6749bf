use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bot::{chat_event::chat_event::GuildId, commands::commands::BotResult, state::def::GuildConfig};

pub const DEFAULT_CONFIG_FILE: &str = "default.json";

pub fn guild_config_path(dir: &Path, guild: &GuildId) -> PathBuf {
    dir.join(format!("{}.json", guild.as_str()))
}

/// Reads `<dir>/<guild>.json`, then `<dir>/default.json`, then falls back to the built in defaults.
pub async fn load_guild_config(dir: &Path, guild: &GuildId) -> BotResult<GuildConfig> {
    for path in [guild_config_path(dir, guild), dir.join(DEFAULT_CONFIG_FILE)] {
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let config: GuildConfig = serde_json::from_str(&raw)?;
                debug!("Loaded config for guild {guild} from {}", path.display());
                return Ok(config);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
    }

    info!("No config file for guild {guild}, using defaults");
    Ok(GuildConfig::default())
}

pub async fn save_guild_config(dir: &Path, guild: &GuildId, config: &GuildConfig) -> BotResult<()> {
    tokio::fs::create_dir_all(dir).await?;
    let json = serde_json::to_string_pretty(config)?;
    tokio::fs::write(guild_config_path(dir, guild), json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::def::BotError;

    #[tokio::test]
    async fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_guild_config(dir.path(), &GuildId::new("1")).await.unwrap();
        assert_eq!(cfg.prefix(), '!');
    }

    #[tokio::test]
    async fn default_file_is_used_when_guild_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.json"), r#"{"basic":{"commandprefix":"?"}}"#).unwrap();

        let cfg = load_guild_config(dir.path(), &GuildId::new("1")).await.unwrap();
        assert_eq!(cfg.prefix(), '?');
    }

    #[tokio::test]
    async fn save_then_load_keeps_free_form_settings() {
        let dir = tempfile::tempdir().unwrap();
        let guild = GuildId::new("42");
        let mut cfg = GuildConfig::default();
        cfg.modules.command_limits.insert("ping".into(), 5);
        cfg.extra.insert("markov".into(), serde_json::json!({ "maxpms": 3 }));

        save_guild_config(dir.path(), &guild, &cfg).await.unwrap();
        let loaded = load_guild_config(dir.path(), &guild).await.unwrap();

        assert_eq!(loaded.command_limit("ping"), 5);
        assert_eq!(loaded.extra.get("markov"), Some(&serde_json::json!({ "maxpms": 3 })));
    }

    #[tokio::test]
    async fn broken_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("7.json"), "{ not json").unwrap();
        let err = load_guild_config(dir.path(), &GuildId::new("7")).await.unwrap_err();
        assert!(matches!(err, BotError::JsonError(_)));
    }
}
