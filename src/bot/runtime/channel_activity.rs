use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use crate::bot::chat_event::chat_event::ChannelId;

/// Last message time per channel, written by every inbound message and read by the idle scheduler.
#[derive(Debug, Default)]
pub struct ChannelActivity {
    last: DashMap<ChannelId, i64>,
    messages_seen: AtomicU32,
}

impl ChannelActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&self, channel: &ChannelId, timestamp: i64) {
        self.messages_seen.fetch_add(1, Ordering::Relaxed);
        self.last.insert(channel.clone(), timestamp);
    }

    pub fn last_message(&self, channel: &ChannelId) -> Option<i64> {
        self.last.get(channel).map(|t| *t)
    }

    pub fn messages_seen(&self) -> u32 {
        self.messages_seen.load(Ordering::Relaxed)
    }
}
