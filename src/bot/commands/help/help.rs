use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt};

use crate::bot::{chat_event::chat_event::Embed, commands::{commands::{BotResult, Command}, CommandContext, CommandReply, CommandUsage, Module}, guild::guild::GuildState, replies::{format_duration, pluralize, Replies}, state::def::GuildConfig};

const LIST_COLOR: u32 = 0x3e92e5;
const ENABLED_COLOR: u32 = 0x56d34f;
const DISABLED_COLOR: u32 = 0xd54141;
const DISABLED_TAG: &str = " [disabled]";

pub struct HelpModule;

impl Module for HelpModule {
    fn name(&self) -> &str {
        "Information"
    }

    fn description(&self) -> &str {
        "Commands for finding out what the bot can do and how it is doing."
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![Arc::new(HelpCommand), Arc::new(AboutCommand)]
    }
}

fn disabled_tag(disabled: bool) -> &'static str {
    if disabled { DISABLED_TAG } else { "" }
}

fn footer(prefix: char) -> String {
    format!("For more information on a specific command, type {prefix}help [command].")
}

/// Long usage rendered as an embed.
pub fn render_usage(name: &str, usage: &CommandUsage, prefix: char, disabled: bool) -> Embed {
    let mut signature = format!("{prefix}{name}");
    for p in &usage.params {
        if p.optional {
            signature.push_str(&format!(" [{}]", p.name));
        } else {
            signature.push_str(&format!(" {}", p.name));
        }
    }

    let mut embed = Embed::new(format!("{signature}{}", disabled_tag(disabled)))
        .description(usage.description.clone())
        .color(if disabled { DISABLED_COLOR } else { LIST_COLOR });
    for p in &usage.params {
        embed = embed.field(p.name.clone(), p.description.clone(), false);
    }
    embed
}

async fn module_listing(guild: &GuildState, cfg: &GuildConfig) -> Embed {
    let prefix = cfg.prefix();
    let mut embed = Embed::new("Commands").color(LIST_COLOR).footer(footer(prefix));
    for module in guild.modules().await {
        let commands = module.commands();
        let value = if commands.is_empty() {
            "*[no commands]*".to_string()
        } else {
            commands
                .iter()
                .map(|c| format!("{}{}", c.name(), disabled_tag(cfg.is_command_disabled(&c.name().to_lowercase()))))
                .collect::<Vec<_>>()
                .join("\n")
        };
        embed = embed.field(format!("{}{}", module.name(), disabled_tag(cfg.is_module_disabled(module.name()))), value, true);
    }
    embed
}

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn usage(&self, _config: &GuildConfig) -> CommandUsage {
        CommandUsage::new("Lists every module and command, or explains a single module or command.")
            .param("command/module", "The command or module to show help for.", true)
    }

    fn usage_short(&self) -> &str {
        "[PM Only] Generates the list you are looking at right now."
    }

    fn execute(&self, args: Vec<String>, ctx: CommandContext) -> BoxFuture<'static, BotResult<CommandReply>> {
        async move {
            let cfg = ctx.guild.config.read().await.clone();
            let prefix = cfg.prefix();

            let Some(topic) = args.first() else {
                return Ok(CommandReply::embed(module_listing(&ctx.guild, &cfg).await).private());
            };

            if let Some(module) = ctx.guild.module(topic).await {
                let disabled = cfg.is_module_disabled(module.name());
                let mut embed = Embed::new(format!("{} Module Command List{}", module.name(), disabled_tag(disabled)))
                    .description(module.description())
                    .color(if disabled { DISABLED_COLOR } else { ENABLED_COLOR })
                    .footer(footer(prefix));
                for c in module.commands() {
                    let name = format!("{}{}", c.name(), disabled_tag(cfg.is_command_disabled(&c.name().to_lowercase())));
                    embed = embed.field(name, c.usage_short(), false);
                }
                return Ok(CommandReply::embed(embed).private());
            }

            match ctx.guild.command(topic).await {
                Some(c) => {
                    let disabled = cfg.is_command_disabled(&c.name().to_lowercase());
                    Ok(CommandReply::embed(render_usage(c.name(), &c.usage(&cfg), prefix, disabled)).private())
                }
                None => Ok(CommandReply::text(Replies::unknown_help_topic(prefix))),
            }
        }
        .boxed()
    }
}

/// Cheap and side effect free, so the deadlock detector uses it as its probe.
pub struct AboutCommand;

impl Command for AboutCommand {
    fn name(&self) -> &str {
        "about"
    }

    fn usage(&self, _config: &GuildConfig) -> CommandUsage {
        CommandUsage::new("Shows the bot version, how many servers it is in and how long it has been running.")
    }

    fn usage_short(&self) -> &str {
        "Displays information about the bot."
    }

    fn execute(&self, _args: Vec<String>, ctx: CommandContext) -> BoxFuture<'static, BotResult<CommandReply>> {
        async move {
            let state = &ctx.state;
            let mut owners: Vec<String> = state.settings.owners.iter().map(|o| o.to_string()).collect();
            owners.sort();
            let uptime = chrono::Utc::now().timestamp() - state.started_at;

            let embed = Embed::new(format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
                .color(LIST_COLOR)
                .field("Owner ID(s)", owners.join(", "), true)
                .field("Presence", pluralize(state.registry.len().await as i64, "server"), true)
                .field("Uptime", format_duration(uptime), true)
                .field("Messages Seen", state.activity.messages_seen().to_string(), true);
            Ok(CommandReply::embed(embed))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_signature_marks_optional_params() {
        let usage = CommandUsage::new("Rolls dice.").param("dice", "What to roll.", false).param("label", "Shown with the result.", true);
        let embed = render_usage("roll", &usage, '!', false);
        assert_eq!(embed.title, "!roll dice [label]");
        assert_eq!(embed.fields.len(), 2);

        let disabled = render_usage("roll", &usage, '?', true);
        assert_eq!(disabled.title, "?roll dice [label] [disabled]");
        assert_eq!(disabled.color, DISABLED_COLOR);
    }
}
