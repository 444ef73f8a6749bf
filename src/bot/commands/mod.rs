use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;

use crate::bot::{chat_event::chat_event::{ChannelId, ChatMessage, Embed, GuildEvent}, commands::{commands::{BotResult, Command}, help::help::HelpModule}, guild::guild::GuildState, state::def::{AppState, GuildConfig}};

pub mod commands;
pub mod help;

pub type CommandMap = HashMap<String, Arc<dyn Command>>;

pub type HookFuture<'a> = BoxFuture<'a, BotResult<()>>;

/// What a command hands back to the dispatcher. Empty text and no embed means nothing is sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandReply {
    pub text: String,
    pub prefer_private: bool,
    pub embed: Option<Embed>,
}

impl CommandReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn embed(embed: Embed) -> Self {
        Self { embed: Some(embed), ..Default::default() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn private(mut self) -> Self {
        self.prefer_private = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.embed.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageParam {
    pub name: String,
    pub description: String,
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandUsage {
    pub description: String,
    pub params: Vec<UsageParam>,
}

impl CommandUsage {
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into(), params: Vec::new() }
    }

    pub fn param(mut self, name: impl Into<String>, description: impl Into<String>, optional: bool) -> Self {
        self.params.push(UsageParam { name: name.into(), description: description.into(), optional });
        self
    }
}

/// Everything a command gets to look at while it runs.
#[derive(Clone)]
pub struct CommandContext {
    pub state: Arc<AppState>,
    pub guild: Arc<GuildState>,
    pub message: ChatMessage,
    pub private: bool,
}

pub trait Module: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn commands(&self) -> Vec<Arc<dyn Command>>;

    fn command_hook(&self) -> Option<&dyn CommandHook> { None }
    fn message_hook(&self) -> Option<&dyn MessageHook> { None }
    fn idle_hook(&self) -> Option<&dyn IdleHook> { None }
    fn tick_hook(&self) -> Option<&dyn TickHook> { None }
    fn guild_hook(&self) -> Option<&dyn GuildHook> { None }
}

/// Sees every command candidate first; returning `true` asks the dispatcher to drop it.
pub trait CommandHook: Send + Sync {
    fn on_command(&self, guild: &GuildState, message: &ChatMessage) -> bool;
}

pub trait MessageHook: Send + Sync {
    fn on_message_create<'a>(&'a self, state: &'a Arc<AppState>, guild: &'a Arc<GuildState>, message: &'a ChatMessage) -> HookFuture<'a>;

    fn on_message_update<'a>(&'a self, _state: &'a Arc<AppState>, _guild: &'a Arc<GuildState>, _message: &'a ChatMessage) -> HookFuture<'a> {
        Box::pin(async { Ok(()) })
    }

    fn on_message_delete<'a>(&'a self, _state: &'a Arc<AppState>, _guild: &'a Arc<GuildState>, _message: &'a ChatMessage) -> HookFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}

pub trait IdleHook: Send + Sync {
    /// Seconds a channel must stay quiet before `on_idle` fires for it.
    fn idle_period(&self, config: &GuildConfig) -> i64;
    fn on_idle<'a>(&'a self, state: &'a Arc<AppState>, guild: &'a Arc<GuildState>, channel: &'a ChannelId) -> HookFuture<'a>;
}

pub trait TickHook: Send + Sync {
    fn on_tick<'a>(&'a self, state: &'a Arc<AppState>, guild: &'a Arc<GuildState>) -> HookFuture<'a>;
}

pub trait GuildHook: Send + Sync {
    fn on_guild_event<'a>(&'a self, state: &'a Arc<AppState>, guild: &'a Arc<GuildState>, event: &'a GuildEvent) -> HookFuture<'a>;
}

pub type ModuleFactory = Arc<dyn Fn() -> Arc<dyn Module> + Send + Sync>;

/// Builds a fresh set of module instances for each guild. Help always comes first.
#[derive(Clone)]
pub struct ModuleCatalog {
    factories: Vec<ModuleFactory>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        let help: ModuleFactory = Arc::new(|| Arc::new(HelpModule) as Arc<dyn Module>);
        Self { factories: vec![help] }
    }

    pub fn register<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Module> + Send + Sync + 'static,
    {
        self.factories.push(Arc::new(factory));
        self
    }

    pub fn build(&self) -> Vec<Arc<dyn Module>> {
        self.factories.iter().map(|f| f()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::new()
    }
}
