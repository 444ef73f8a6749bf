pub struct Replies;

impl Replies {
    pub fn code_block(text: &str) -> String {
        format!("```{text}```")
    }

    pub fn not_a_command(name: &str, prefix: char) -> String {
        format!("Sorry, {name} is not a valid command.\nFor a list of valid commands, type {prefix}help.")
    }

    pub fn saturated(limit: usize, window: i64, remaining: i64) -> String {
        format!(
            "You can't input more than {limit} commands every {}! Try again in {}.",
            format_duration(window),
            format_duration(remaining)
        )
    }

    pub fn cooldown(limit: i64, remaining: i64) -> String {
        format!(
            "You can only run that command once every {}! Try again in {}.",
            format_duration(limit),
            format_duration(remaining)
        )
    }

    pub fn bot_channel_hint(channel_name: &str) -> String {
        format!(" Try going to #{channel_name} instead.")
    }

    pub fn no_permission(roles: &[String]) -> String {
        format!("You don't have permission to run this command! Allowed Roles: {}", roles.join(", "))
    }

    pub fn check_pm() -> String {
        Self::code_block("Check your Private Messages for my reply!")
    }

    pub fn check_pm_joke() -> String {
        "Check your ~~privilege~~ Private Messages for my reply!".to_string()
    }

    pub fn pm_failed() -> String {
        Self::code_block("I couldn't send you a private message, so here is my reply.")
    }

    pub fn db_unavailable() -> String {
        "A temporary database error means I can't process any private message commands right now.".to_string()
    }

    pub fn unknown_server() -> String {
        "Cannot determine what server you belong to! Use !defaultserver to set which server I should use when you PM me.".to_string()
    }

    pub fn guild_not_loaded() -> String {
        "I haven't been loaded on that server yet!".to_string()
    }

    pub fn unknown_help_topic(prefix: char) -> String {
        Self::code_block(&format!("I don't recognize that command or module. You can check what commands I know by typing {prefix}help with no arguments."))
    }
}

pub fn pluralize(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// "5 seconds", "1 minute", "2 hours 3 minutes": at most the two largest units.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let units = [("day", 86_400), ("hour", 3_600), ("minute", 60), ("second", 1)];

    let mut parts = Vec::new();
    let mut rest = seconds;
    for (unit, size) in units {
        let count = rest / size;
        rest %= size;
        if count > 0 {
            parts.push(pluralize(count, unit));
        } else if !parts.is_empty() {
            // a gap stops the listing so "1 hour 5 seconds" never happens
            break;
        }
        if parts.len() == 2 {
            break;
        }
    }

    if parts.is_empty() {
        return pluralize(0, "second");
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "0 seconds");
        assert_eq!(format_duration(1), "1 second");
        assert_eq!(format_duration(5), "5 seconds");
        assert_eq!(format_duration(60), "1 minute");
        assert_eq!(format_duration(125), "2 minutes 5 seconds");
        assert_eq!(format_duration(7_380), "2 hours 3 minutes");
        assert_eq!(format_duration(3_605), "1 hour");
        assert_eq!(format_duration(90_061), "1 day 1 hour");
    }

    #[test]
    fn cooldown_wording() {
        assert_eq!(
            Replies::cooldown(5, 2),
            "You can only run that command once every 5 seconds! Try again in 2 seconds."
        );
    }
}
