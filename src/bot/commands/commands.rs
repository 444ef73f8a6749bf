use std::sync::Arc;

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::bot::{commands::{CommandContext, CommandReply, CommandUsage, Module}, state::def::{BotError, GuildConfig}};

pub type BotResult<T> = Result<T, BotError>;

pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn usage(&self, config: &GuildConfig) -> CommandUsage;
    fn usage_short(&self) -> &str;

    fn execute(&self, args: Vec<String>, ctx: CommandContext) -> BoxFuture<'static, BotResult<CommandReply>>;
}

pub struct FnCommand<F> {func: F, name: String, desc: String, short: String} impl<F> FnCommand<F>
    where
        F: Fn(Vec<String>, CommandContext) -> BoxFuture<'static, BotResult<CommandReply>> + Send + Sync + 'static {
    pub fn new(name: impl Into<String>, desc: impl Into<String>, short: impl Into<String>, func: F) -> Self {
        Self {
            func,
            name: name.into(),
            desc: desc.into(),
            short: short.into(),
        }
    }
}

impl<F> Command for FnCommand<F> where
    F: Fn(Vec<String>, CommandContext) -> BoxFuture<'static, BotResult<CommandReply>> + Send + Sync + 'static {
        fn execute(&self, args: Vec<String>, ctx: CommandContext) -> BoxFuture<'static, BotResult<CommandReply>> {
            (self.func)(args, ctx)
        }

        fn name(&self) -> &str { &self.name }
        fn usage(&self, _config: &GuildConfig) -> CommandUsage { CommandUsage::new(self.desc.clone()) }
        fn usage_short(&self) -> &str { &self.short }
}

/// A module that is nothing more than a named list of commands.
pub struct CommandGroup {
    pub name: String,
    pub description: String,
    pub commands: Vec<Arc<dyn Command>>,
}

impl CommandGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), commands: Vec::new() }
    }

    pub fn with(mut self, command: Arc<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }
}

impl Module for CommandGroup {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { &self.description }
    fn commands(&self) -> Vec<Arc<dyn Command>> { self.commands.clone() }
}

static ARGUMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""((?:[^"\\]|\\.)*)"|(\S+)"#).expect("argument regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub text: String,
    /// Byte offset of the token in the parsed input.
    pub start: usize,
}

/// Splits command text into arguments. Double quoted runs form a single argument with `\"` unescaped.
pub fn parse_arguments(input: &str) -> Vec<Argument> {
    ARGUMENT_RE
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let text = match caps.get(1) {
                Some(quoted) => quoted.as_str().replace("\\\"", "\""),
                None => whole.as_str().to_string(),
            };
            Some(Argument { text, start: whole.start() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(input: &str) -> Vec<String> {
        parse_arguments(input).into_iter().map(|a| a.text).collect()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(texts("roll  1d6   +2"), vec!["roll", "1d6", "+2"]);
    }

    #[test]
    fn keeps_quoted_runs_together() {
        assert_eq!(texts(r#"quote "two words" after"#), vec!["quote", "two words", "after"]);
        assert_eq!(texts(r#"say "she said \"hi\"""#), vec!["say", r#"she said "hi""#]);
        assert_eq!(texts(r#"empty """#), vec!["empty", ""]);
    }

    #[test]
    fn records_token_offsets() {
        let args = parse_arguments(r#"pick "a b" c"#);
        let starts: Vec<usize> = args.iter().map(|a| a.start).collect();
        assert_eq!(starts, vec![0, 5, 11]);
    }

    #[test]
    fn blank_input_has_no_arguments() {
        assert!(parse_arguments("   ").is_empty());
    }
}
