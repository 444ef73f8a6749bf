use futures::{future::BoxFuture, FutureExt};
use tokio::{io::{AsyncBufReadExt, AsyncWriteExt, BufReader}, sync::mpsc::UnboundedSender};
use tracing::info;

use crate::bot::{chat_event::chat_event::{ChannelId, ChatMessage, ChatUser, Embed, GuildId, InboundEvent, UserId}, commands::commands::BotResult, handler::handler::ChatClient, state::def::BotError};

/// Local transport: prints outbound messages and reads one chat line per stdin line.
pub struct ConsoleChatClient {
    guild: GuildId,
    channel: ChannelId,
}

impl ConsoleChatClient {
    pub fn new(guild: GuildId, channel: ChannelId) -> Self {
        Self { guild, channel }
    }

    async fn write_line(&self, line: String) -> BotResult<()> {
        let mut out = tokio::io::stdout();
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

fn render_embed(embed: &Embed) -> String {
    let mut text = format!("== {} ==", embed.title);
    if !embed.description.is_empty() {
        text.push_str(&format!("\n{}", embed.description));
    }
    for field in &embed.fields {
        text.push_str(&format!("\n  {}: {}", field.name, field.value.replace('\n', ", ")));
    }
    if let Some(footer) = &embed.footer {
        text.push_str(&format!("\n({footer})"));
    }
    text
}

impl ChatClient for ConsoleChatClient {
    fn send_message<'a>(&'a self, channel: &'a ChannelId, message: &'a str) -> BoxFuture<'a, BotResult<()>> {
        self.write_line(format!("[#{channel}] {message}")).boxed()
    }

    fn send_embed<'a>(&'a self, channel: &'a ChannelId, embed: &'a Embed) -> BoxFuture<'a, BotResult<()>> {
        self.write_line(format!("[#{channel}] {}", render_embed(embed))).boxed()
    }

    fn open_private_channel<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, BotResult<ChannelId>> {
        async move { Ok(ChannelId::new(format!("dm-{user}"))) }.boxed()
    }

    fn bulk_delete<'a>(&'a self, channel: &'a ChannelId, message_ids: &'a [String]) -> BoxFuture<'a, BotResult<()>> {
        async move {
            info!("Would delete {} messages in {channel}", message_ids.len());
            Ok(())
        }
        .boxed()
    }

    fn end_lockdown<'a>(&'a self, guild: &'a GuildId) -> BoxFuture<'a, BotResult<()>> {
        async move {
            info!("Lockdown lifted in guild {guild}");
            Ok(())
        }
        .boxed()
    }

    fn guild_channels(&self, guild: &GuildId) -> BotResult<Vec<ChannelId>> {
        if guild == &self.guild {
            Ok(vec![self.channel.clone()])
        } else {
            Err(BotError::ChannelUnavailable(guild.clone()))
        }
    }

    fn channel_name(&self, channel: &ChannelId) -> Option<String> {
        (channel == &self.channel).then(|| "console".to_string())
    }
}

/// Turns stdin lines into message events until stdin closes or the receiver is dropped.
pub async fn run_console_reader(tx: UnboundedSender<InboundEvent>, guild: GuildId, channel: ChannelId, author: ChatUser) -> BotResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        next_id += 1;
        let msg = ChatMessage {
            id: next_id.to_string(),
            guild_id: Some(guild.clone()),
            channel_id: channel.clone(),
            author: author.clone(),
            content: line,
            timestamp: chrono::Utc::now().timestamp(),
        };
        if tx.send(InboundEvent::MessageCreate(msg)).is_err() {
            break;
        }
    }

    info!("Console input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_render_as_plain_text() {
        let embed = Embed::new("Commands").field("Fun", "ping\necho", true).footer("type !help");
        assert_eq!(render_embed(&embed), "== Commands ==\n  Fun: ping, echo\n(type !help)");
    }
}
