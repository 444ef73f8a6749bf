pub mod channel_activity;
pub mod guild_lifecycle;
