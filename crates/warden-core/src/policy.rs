//! Violation policies and tier escalation.
//!
//! Policies are independent matchers sharing one counter per (chat, user):
//! the first matching policy increments once per message, so simultaneous
//! matches never double-count.

use regex::Regex;

use crate::domain::Action;
use crate::event::InboundMessage;

/// A content policy the engine can enforce.
pub trait ViolationPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// One short clause for warning messages, e.g. "links are not allowed".
    fn describe(&self) -> &'static str;

    fn matches(&self, msg: &InboundMessage) -> bool;
}

/// Flags messages carrying URLs.
pub struct LinkPolicy {
    pattern: Regex,
}

impl LinkPolicy {
    pub fn new() -> Self {
        let pattern = Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid regex");
        Self { pattern }
    }
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ViolationPolicy for LinkPolicy {
    fn name(&self) -> &'static str {
        "link"
    }

    fn describe(&self) -> &'static str {
        "links are not allowed in this group"
    }

    fn matches(&self, msg: &InboundMessage) -> bool {
        self.pattern.is_match(&msg.text)
    }
}

/// First matching policy, if any.
pub fn first_match<'a>(
    policies: &'a [Box<dyn ViolationPolicy>],
    msg: &InboundMessage,
) -> Option<&'a dyn ViolationPolicy> {
    policies.iter().find(|p| p.matches(msg)).map(|p| p.as_ref())
}

/// What one violation escalates to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Escalation {
    pub actions: Vec<Action>,
    /// Terminal tier reached: the caller must reset the counter whether or
    /// not the removal goes through.
    pub reset: bool,
    /// The terminal tier called for removal but the bot lacks the role.
    pub removal_skipped: bool,
}

/// Tier-specific actions for the `count`-th violation.
///
/// - count 1: warn, quoting the offending message
/// - 1 < count < threshold: warn + delete the offending message
/// - count >= threshold: delete + remove the sender iff the bot is admin
pub fn escalate(
    remove_threshold: u32,
    count: u32,
    msg: &InboundMessage,
    description: &str,
    bot_is_admin: bool,
) -> Escalation {
    let threshold = remove_threshold.max(1);

    if count >= threshold {
        let mut actions = vec![Action::DeleteMessage {
            message: msg.message_ref,
        }];
        let mut removal_skipped = false;
        if bot_is_admin {
            actions.push(Action::RemoveParticipant {
                chat_id: msg.chat_id,
                user_id: msg.sender_id,
            });
        } else {
            removal_skipped = true;
        }
        return Escalation {
            actions,
            reset: true,
            removal_skipped,
        };
    }

    let mut actions = vec![Action::SendText {
        chat_id: msg.chat_id,
        text: format!("⚠️ Warning {count}/{threshold}: {description}."),
        quote: Some(msg.message_ref),
    }];
    if count > 1 {
        actions.push(Action::DeleteMessage {
            message: msg.message_ref,
        });
    }

    Escalation {
        actions,
        reset: false,
        removal_skipped: false,
    }
}
