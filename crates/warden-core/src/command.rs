//! Moderation command detection and target resolution.

use crate::domain::UserId;
use crate::event::InboundMessage;

/// What a moderation command does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// Remove the target from the group.
    Kick,
    /// Clear the target's violation counter.
    ResetWarnings,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Kick => "kick",
            CommandKind::ResetWarnings => "resetwarns",
        }
    }
}

/// One literal token in the alias table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandAlias {
    pub token: String,
    pub kind: CommandKind,
}

impl CommandAlias {
    pub fn new(token: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            token: token.into(),
            kind,
        }
    }
}

/// Outcome of running the resolver over one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    NotACommand,
    Resolved { kind: CommandKind, target: UserId },
    /// Syntactically a command, but no mention/quote/argument yields a target.
    MissingTarget { kind: CommandKind },
}

/// Matches messages against a declarative alias table and resolves the
/// command target.
#[derive(Clone, Debug)]
pub struct CommandResolver {
    aliases: Vec<CommandAlias>,
}

impl CommandResolver {
    pub fn new(aliases: Vec<CommandAlias>) -> Self {
        Self { aliases }
    }

    /// Detect a command and resolve its target.
    ///
    /// Matching is a case-sensitive comparison of the first
    /// whitespace-delimited token against the ordered alias table.
    ///
    /// Target priority: first mention, else the quoted message's author,
    /// else the first argument normalized into the platform's user-id form
    /// via `normalize_arg`. An explicit mention is the least ambiguous and
    /// must win over positional arguments.
    pub fn resolve(
        &self,
        msg: &InboundMessage,
        normalize_arg: impl Fn(&str) -> Option<UserId>,
    ) -> CommandOutcome {
        let mut tokens = msg.text.split_whitespace();
        let Some(first) = tokens.next() else {
            return CommandOutcome::NotACommand;
        };

        let Some(alias) = self.aliases.iter().find(|a| a.token == first) else {
            return CommandOutcome::NotACommand;
        };
        let kind = alias.kind;

        if let Some(&target) = msg.mentioned.first() {
            return CommandOutcome::Resolved { kind, target };
        }
        if let Some(target) = msg.quoted_author {
            return CommandOutcome::Resolved { kind, target };
        }
        if let Some(target) = tokens.next().and_then(|arg| normalize_arg(arg)) {
            return CommandOutcome::Resolved { kind, target };
        }

        CommandOutcome::MissingTarget { kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId, MessageRef};

    fn resolver() -> CommandResolver {
        CommandResolver::new(vec![
            CommandAlias::new(".kick", CommandKind::Kick),
            CommandAlias::new("#kick", CommandKind::Kick),
            CommandAlias::new(".k", CommandKind::Kick),
            CommandAlias::new("kick", CommandKind::Kick),
            CommandAlias::new(".resetwarns", CommandKind::ResetWarnings),
        ])
    }

    fn msg(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: ChatId(-100),
            sender_id: UserId(1),
            text: text.to_string(),
            message_ref: MessageRef {
                chat_id: ChatId(-100),
                message_id: MessageId(7),
            },
            mentioned: vec![],
            quoted_author: None,
        }
    }

    fn numeric(raw: &str) -> Option<UserId> {
        raw.trim_start_matches('@').parse::<i64>().ok().map(UserId)
    }

    #[test]
    fn non_commands_pass_through() {
        let r = resolver();
        assert_eq!(r.resolve(&msg("hello there"), numeric), CommandOutcome::NotACommand);
        // Only the first token counts.
        assert_eq!(
            r.resolve(&msg("please .kick 42"), numeric),
            CommandOutcome::NotACommand
        );
        // Matching is case-sensitive and exact per token.
        assert_eq!(r.resolve(&msg(".KICK 42"), numeric), CommandOutcome::NotACommand);
        assert_eq!(r.resolve(&msg(".kickoff"), numeric), CommandOutcome::NotACommand);
    }

    #[test]
    fn all_aliases_map_to_kick() {
        let r = resolver();
        for alias in [".kick", "#kick", ".k", "kick"] {
            let m = msg(&format!("{alias} 42"));
            assert_eq!(
                r.resolve(&m, numeric),
                CommandOutcome::Resolved {
                    kind: CommandKind::Kick,
                    target: UserId(42)
                },
                "alias {alias}"
            );
        }
    }

    #[test]
    fn mention_beats_quote_beats_argument() {
        let r = resolver();

        let mut m = msg(".kick 3");
        m.mentioned = vec![UserId(1), UserId(2)];
        m.quoted_author = Some(UserId(5));
        assert_eq!(
            r.resolve(&m, numeric),
            CommandOutcome::Resolved {
                kind: CommandKind::Kick,
                target: UserId(1)
            }
        );

        let mut m = msg(".kick 3");
        m.quoted_author = Some(UserId(5));
        assert_eq!(
            r.resolve(&m, numeric),
            CommandOutcome::Resolved {
                kind: CommandKind::Kick,
                target: UserId(5)
            }
        );

        let m = msg(".kick @3");
        assert_eq!(
            r.resolve(&m, numeric),
            CommandOutcome::Resolved {
                kind: CommandKind::Kick,
                target: UserId(3)
            }
        );
    }

    #[test]
    fn missing_target_when_nothing_resolves() {
        let r = resolver();
        assert_eq!(
            r.resolve(&msg(".kick"), numeric),
            CommandOutcome::MissingTarget {
                kind: CommandKind::Kick
            }
        );
        // An argument the platform can't normalize is no target either.
        assert_eq!(
            r.resolve(&msg(".kick @someone"), numeric),
            CommandOutcome::MissingTarget {
                kind: CommandKind::Kick
            }
        );
    }

    #[test]
    fn reset_warnings_resolves_like_kick() {
        let r = resolver();
        let mut m = msg(".resetwarns");
        m.quoted_author = Some(UserId(9));
        assert_eq!(
            r.resolve(&m, numeric),
            CommandOutcome::Resolved {
                kind: CommandKind::ResetWarnings,
                target: UserId(9)
            }
        );
    }
}
