use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::bot::chat_event::chat_event::ChannelId;

/// Last invocation time of every command, per channel.
#[derive(Debug, Default)]
pub struct CooldownTable {
    last: RwLock<HashMap<ChannelId, HashMap<String, i64>>>,
}

impl CooldownTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_used(&self, channel: &ChannelId, command: &str) -> Option<i64> {
        self.last.read().await.get(channel).and_then(|cmds| cmds.get(command)).copied()
    }

    /// Allows the command when at least `limit` seconds passed since it last ran in `channel`
    /// and stamps `now`. On denial returns the seconds still to wait and leaves the table untouched.
    pub async fn try_acquire(&self, channel: &ChannelId, command: &str, limit: i64, now: i64) -> Result<(), i64> {
        let mut table = self.last.write().await;
        let cmds = table.entry(channel.clone()).or_default();

        if let Some(&last) = cmds.get(command) {
            let elapsed = now.saturating_sub(last);
            if elapsed < limit {
                return Err(limit.saturating_sub(elapsed));
            }
        }

        cmds.insert(command.to_string(), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn boundary_is_inclusive() {
        let table = CooldownTable::new();
        let ch = ChannelId::new("general");

        assert_eq!(table.try_acquire(&ch, "ping", 5, 100).await, Ok(()));
        assert_eq!(table.try_acquire(&ch, "ping", 5, 104).await, Err(1));
        assert_eq!(table.try_acquire(&ch, "ping", 5, 105).await, Ok(()));
        assert_eq!(table.last_used(&ch, "ping").await, Some(105));
    }

    #[tokio::test]
    async fn extreme_limits_and_timestamps_do_not_overflow() {
        let table = CooldownTable::new();
        let ch = ChannelId::new("general");

        table.try_acquire(&ch, "ping", i64::MAX, 100).await.unwrap();
        assert_eq!(table.try_acquire(&ch, "ping", i64::MAX, 103).await, Err(i64::MAX - 3));

        table.try_acquire(&ch, "roll", 5, i64::MAX).await.unwrap();
        assert_eq!(table.try_acquire(&ch, "roll", 5, i64::MIN).await, Err(i64::MAX));
    }

    #[tokio::test]
    async fn channels_and_commands_are_independent() {
        let table = CooldownTable::new();
        let a = ChannelId::new("a");
        let b = ChannelId::new("b");

        table.try_acquire(&a, "ping", 10, 0).await.unwrap();
        assert_eq!(table.try_acquire(&b, "ping", 10, 1).await, Ok(()));
        assert_eq!(table.try_acquire(&a, "pong", 10, 1).await, Ok(()));
        assert_eq!(table.try_acquire(&a, "ping", 10, 3).await, Err(7));
    }

    #[tokio::test]
    async fn concurrent_callers_only_one_wins() {
        let table = std::sync::Arc::new(CooldownTable::new());
        let ch = ChannelId::new("busy");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let table = table.clone();
            let ch = ch.clone();
            handles.push(tokio::spawn(async move { table.try_acquire(&ch, "roll", 30, 50).await.is_ok() }));
        }

        let mut allowed = 0;
        for h in handles {
            if h.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 1);
    }
}
