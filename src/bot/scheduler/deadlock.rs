use std::sync::{atomic::{AtomicU32, Ordering}, Arc};

use thiserror::Error;
use tokio::{task::JoinHandle, time::{sleep, timeout}};
use tracing::{error, info, warn};

use crate::bot::{chat_event::chat_event::{ChatMessage, InboundEvent}, handler::handler::handle_event, state::{def::AppState, state::DEFAULT_PREFIX}};

/// Cheap, side effect free command the probe runs.
pub const HEARTBEAT_COMMAND: &str = "about";

/// Counter bumped once per completed probe, plus a diagnostic count of lock checkpoints the
/// current probe got past. Starts close to the top so wrap around gets exercised early.
#[derive(Debug)]
pub struct Heartbeat {
    beats: AtomicU32,
    checkpoints: AtomicU32,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            beats: AtomicU32::new(u32::MAX - 5),
            checkpoints: AtomicU32::new(0),
        }
    }

    pub fn beat(&self) {
        self.beats.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> u32 {
        self.beats.load(Ordering::SeqCst)
    }

    pub fn checkpoint(&self) {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
    }

    pub fn checkpoints(&self) -> u32 {
        self.checkpoints.load(Ordering::SeqCst)
    }

    pub fn reset_checkpoints(&self) {
        self.checkpoints.store(0, Ordering::SeqCst);
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Waiting,
    Armed,
    Fatal,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("deadlock detected: {missed} heartbeats missed in a row ({checkpoints} checkpoints reached)")]
pub struct DeadlockDetected {
    pub missed: u32,
    pub checkpoints: u32,
}

/// WAITING -> ARMED when a probe goes out, back to WAITING when the cycle is judged,
/// FATAL once `max_missed` cycles in a row saw no beat.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    state: MonitorState,
    baseline: u32,
    missed: u32,
    max_missed: u32,
}

impl HeartbeatMonitor {
    pub fn new(max_missed: u32) -> Self {
        Self { state: MonitorState::Waiting, baseline: 0, missed: 0, max_missed: max_missed.max(1) }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }

    pub fn arm(&mut self, baseline: u32) {
        self.baseline = baseline;
        self.state = MonitorState::Armed;
    }

    /// Judges the armed cycle against the current counter value.
    pub fn observe(&mut self, current: u32) -> MonitorState {
        if self.state == MonitorState::Fatal {
            return self.state;
        }
        if current == self.baseline.wrapping_add(1) {
            self.missed = 0;
        } else {
            self.missed += 1;
        }
        self.state = if self.missed >= self.max_missed { MonitorState::Fatal } else { MonitorState::Waiting };
        self.state
    }
}

pub fn start_deadlock_detector(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_deadlock_detector(state).await {
            error!("FATAL: {e}. Terminating process");
            std::process::exit(1);
        }
    })
}

/// Sends the probe through the normal event path every interval and returns `Err` once too many
/// probes in a row never completed. Returns the monitor when the quit flag ends the loop.
pub async fn run_deadlock_detector(state: Arc<AppState>) -> Result<HeartbeatMonitor, DeadlockDetected> {
    let interval = state.settings.heartbeat_interval;
    let mut monitor = HeartbeatMonitor::new(state.settings.max_missed_heartbeats);
    let mut prefix = DEFAULT_PREFIX;

    sleep(interval).await;
    while !state.should_quit() {
        monitor.arm(state.heartbeat.count());
        state.heartbeat.reset_checkpoints();

        // A stuck registry lock must count as a miss, not stall the watchdog itself.
        let main = match timeout(interval, state.registry.get(&state.settings.main_guild)).await {
            Ok(Some(guild)) => Some(guild),
            Ok(None) => {
                warn!("Main guild {} cannot be found, deadlock detector is idle until it is attached", state.settings.main_guild);
                sleep(interval).await;
                continue;
            }
            Err(_) => None,
        };

        if let Some(main) = main {
            if let Ok(cfg) = main.config.try_read() {
                prefix = cfg.prefix();
            }
            let probe = ChatMessage::heartbeat(
                main.id.clone(),
                state.settings.self_id.clone(),
                format!("{prefix}{HEARTBEAT_COMMAND}"),
                chrono::Utc::now().timestamp(),
            );
            let task_state = state.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_event(task_state, InboundEvent::Heartbeat(probe)).await {
                    error!("Heartbeat dispatch failed: {e:?}");
                }
            });
            sleep(interval).await;
        }

        let verdict = monitor.observe(state.heartbeat.count());
        let checkpoints = state.heartbeat.checkpoints();
        if verdict == MonitorState::Fatal {
            return Err(DeadlockDetected { missed: monitor.missed(), checkpoints });
        }
        if monitor.missed() > 0 {
            warn!("Missed heartbeat signal {} times in a row ({checkpoints} checkpoints reached)", monitor.missed());
        }
    }

    info!("Deadlock detector stopped");
    Ok(monitor)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;

    use super::*;
    use crate::bot::{chat_event::chat_event::GuildInfo, commands::{commands::{CommandGroup, FnCommand}, CommandReply, Module, ModuleCatalog}, db::memory::MemoryStore, platforms::mock::mock::MockChatClient, runtime::guild_lifecycle::attach_guild, state::def::BotSettings};

    #[test]
    fn monitor_goes_fatal_after_consecutive_misses() {
        let mut monitor = HeartbeatMonitor::new(5);
        for i in 1..5 {
            monitor.arm(10);
            assert_eq!(monitor.observe(10), MonitorState::Waiting);
            assert_eq!(monitor.missed(), i);
        }
        monitor.arm(10);
        assert_eq!(monitor.observe(10), MonitorState::Fatal);
    }

    #[test]
    fn a_beat_resets_the_miss_count() {
        let mut monitor = HeartbeatMonitor::new(5);
        monitor.arm(7);
        monitor.observe(7);
        monitor.arm(7);
        monitor.observe(7);
        assert_eq!(monitor.missed(), 2);

        monitor.arm(u32::MAX);
        assert_eq!(monitor.observe(0), MonitorState::Waiting);
        assert_eq!(monitor.missed(), 0);
    }

    #[test]
    fn two_beats_in_one_cycle_is_a_miss() {
        let mut monitor = HeartbeatMonitor::new(5);
        monitor.arm(1);
        monitor.observe(3);
        assert_eq!(monitor.missed(), 1);
    }

    async fn app(catalog: ModuleCatalog, dir: &std::path::Path) -> Arc<AppState> {
        let mut settings = BotSettings::new("bot", "main");
        settings.config_dir = dir.to_path_buf();
        let state = Arc::new(AppState::new(settings, Arc::new(MockChatClient::new()), Arc::new(MemoryStore::new())).with_catalog(catalog));
        attach_guild(&state, GuildInfo::new("main", "Main", "owner")).await.unwrap();
        state
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_pipeline_never_misses() {
        let dir = tempfile::tempdir().unwrap();
        let state = app(ModuleCatalog::new(), dir.path()).await;
        let start = state.heartbeat.count();

        let detector = tokio::spawn(run_deadlock_detector(state.clone()));
        sleep(Duration::from_secs(20 * 8 + 5)).await;
        state.request_quit();

        let monitor = detector.await.unwrap().unwrap();
        assert_eq!(monitor.missed(), 0);
        // the counter wrapped past u32::MAX along the way
        assert!(state.heartbeat.count() < start);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_probe_is_fatal_after_five_misses() {
        let dir = tempfile::tempdir().unwrap();
        // later registration of the same name wins, so this replaces the built in probe command
        let catalog = ModuleCatalog::new().register(|| {
            Arc::new(CommandGroup::new("Stuck", "").with(Arc::new(FnCommand::new("about", "", "", |_, _| {
                async {
                    futures::future::pending::<()>().await;
                    Ok(CommandReply::empty())
                }
                .boxed()
            })))) as Arc<dyn Module>
        });
        let state = app(catalog, dir.path()).await;

        let result = run_deadlock_detector(state.clone()).await;
        let err = result.unwrap_err();
        assert_eq!(err.missed, 5);
        // registry lookup, config read and command lookup all went through before the hang
        assert_eq!(err.checkpoints, 3);
    }
}
