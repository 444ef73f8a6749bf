use crate::bot::replies::Replies;

/// Why a private message could not be tied to a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingMiss {
    StoreUnavailable,
    UnknownServer,
    GuildNotLoaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Disabled,
    Restricted,
    Channel,
    MissingRole { allowed: Vec<String> },
    Saturated { limit: usize, window: i64, remaining: i64 },
    Cooldown { limit: i64, remaining: i64 },
    Routing(RoutingMiss),
}

impl Denial {
    /// Silent denials never tell the user a feature exists.
    pub fn is_silent(&self) -> bool {
        matches!(self, Denial::Disabled | Denial::Restricted | Denial::Channel)
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Denial::Saturated { .. } | Denial::Cooldown { .. })
    }

    /// The diagnostic shown to the user, `None` for silent denials.
    pub fn message(&self, role_names: &[String]) -> Option<String> {
        match self {
            Denial::Disabled | Denial::Restricted | Denial::Channel => None,
            Denial::MissingRole { .. } => Some(Replies::no_permission(role_names)),
            Denial::Saturated { limit, window, remaining } => Some(Replies::saturated(*limit, *window, *remaining)),
            Denial::Cooldown { limit, remaining } => Some(Replies::cooldown(*limit, *remaining)),
            Denial::Routing(RoutingMiss::StoreUnavailable) => Some(Replies::db_unavailable()),
            Denial::Routing(RoutingMiss::UnknownServer) => Some(Replies::unknown_server()),
            Denial::Routing(RoutingMiss::GuildNotLoaded) => Some(Replies::guild_not_loaded()),
        }
    }
}

/// Result of pushing one message through the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No prefix, doubled prefix or nothing after it.
    NotCommand,
    /// Dropped before resolution (on-command hook, missing guild).
    Ignored,
    Unknown { name: String, reported: bool },
    Denied { command: String, denial: Denial },
    Executed { command: String },
}

impl DispatchOutcome {
    pub fn executed(&self) -> bool {
        matches!(self, DispatchOutcome::Executed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_gate_denials_are_silent() {
        assert!(Denial::Disabled.is_silent());
        assert!(Denial::Channel.is_silent());
        assert!(!Denial::MissingRole { allowed: vec![] }.is_silent());
        assert!(Denial::Cooldown { limit: 5, remaining: 2 }.is_rate_limit());
        assert_eq!(Denial::Restricted.message(&[]), None);
    }

    #[test]
    fn cooldown_message_names_the_wait() {
        let msg = Denial::Cooldown { limit: 5, remaining: 2 }.message(&[]).unwrap();
        assert!(msg.contains("5 seconds"));
        assert!(msg.contains("2 seconds"));
    }
}
