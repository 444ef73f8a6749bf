use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::DashMap;
use futures::{future::BoxFuture, FutureExt};
use tokio::sync::Mutex;

use crate::bot::{chat_event::chat_event::{ChannelId, Embed, GuildId, UserId}, commands::commands::BotResult, handler::handler::ChatClient, state::def::BotError};

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub channel: ChannelId,
    pub text: Option<String>,
    pub embed: Option<Embed>,
}

/// Records everything the core sends instead of talking to a platform.
#[derive(Debug, Default)]
pub struct MockChatClient {
    sent: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<Vec<String>>>,
    ended_lockdowns: Mutex<Vec<GuildId>>,
    channels: DashMap<GuildId, Vec<ChannelId>>,
    channel_names: DashMap<ChannelId, String>,
    fail_private: AtomicBool,
    /// Bulk delete calls that succeed before every further one fails; 0 means never fail.
    delete_budget: AtomicUsize,
    fail_deletes: AtomicBool,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_guild_channels(&self, guild: GuildId, channels: Vec<ChannelId>) {
        self.channels.insert(guild, channels);
    }

    pub fn set_channel_name(&self, channel: ChannelId, name: impl Into<String>) {
        self.channel_names.insert(channel, name.into());
    }

    pub fn set_private_failure(&self, fail: bool) {
        self.fail_private.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes_after(&self, successful_calls: usize) {
        self.delete_budget.store(successful_calls, Ordering::SeqCst);
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Plain text messages sent to `channel`, in order.
    pub async fn texts_in(&self, channel: &ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| &m.channel == channel)
            .filter_map(|m| m.text.clone())
            .collect()
    }

    pub async fn embeds_in(&self, channel: &ChannelId) -> Vec<Embed> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| &m.channel == channel)
            .filter_map(|m| m.embed.clone())
            .collect()
    }

    pub async fn deleted_batches(&self) -> Vec<Vec<String>> {
        self.deleted.lock().await.clone()
    }

    pub async fn ended_lockdowns(&self) -> Vec<GuildId> {
        self.ended_lockdowns.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

impl ChatClient for MockChatClient {
    fn send_message<'a>(&'a self, channel: &'a ChannelId, message: &'a str) -> BoxFuture<'a, BotResult<()>> {
        async move {
            self.sent.lock().await.push(SentMessage { channel: channel.clone(), text: Some(message.to_string()), embed: None });
            Ok(())
        }
        .boxed()
    }

    fn send_embed<'a>(&'a self, channel: &'a ChannelId, embed: &'a Embed) -> BoxFuture<'a, BotResult<()>> {
        async move {
            self.sent.lock().await.push(SentMessage { channel: channel.clone(), text: None, embed: Some(embed.clone()) });
            Ok(())
        }
        .boxed()
    }

    fn open_private_channel<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, BotResult<ChannelId>> {
        async move {
            if self.fail_private.load(Ordering::SeqCst) {
                return Err(BotError::Transport(format!("cannot message {user}")));
            }
            Ok(ChannelId::new(format!("dm-{user}")))
        }
        .boxed()
    }

    fn bulk_delete<'a>(&'a self, _channel: &'a ChannelId, message_ids: &'a [String]) -> BoxFuture<'a, BotResult<()>> {
        async move {
            if self.fail_deletes.load(Ordering::SeqCst) {
                let left = self.delete_budget.load(Ordering::SeqCst);
                if left == 0 {
                    return Err(BotError::Transport("bulk delete rejected".into()));
                }
                self.delete_budget.store(left - 1, Ordering::SeqCst);
            }
            self.deleted.lock().await.push(message_ids.to_vec());
            Ok(())
        }
        .boxed()
    }

    fn end_lockdown<'a>(&'a self, guild: &'a GuildId) -> BoxFuture<'a, BotResult<()>> {
        async move {
            self.ended_lockdowns.lock().await.push(guild.clone());
            Ok(())
        }
        .boxed()
    }

    fn guild_channels(&self, guild: &GuildId) -> BotResult<Vec<ChannelId>> {
        self.channels
            .get(guild)
            .map(|c| c.clone())
            .ok_or_else(|| BotError::ChannelUnavailable(guild.clone()))
    }

    fn channel_name(&self, channel: &ChannelId) -> Option<String> {
        self.channel_names.get(channel).map(|n| n.clone())
    }
}
