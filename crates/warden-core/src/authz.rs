//! Authorization for privileged actions.

use crate::domain::{Action, ChatRole, UserId};

/// Why a privileged action was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    SelfTarget,
    ProtectedOwner,
    SenderNotAuthorized,
    BotNotPrivileged,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::SelfTarget => "self_target",
            DenyReason::ProtectedOwner => "protected_owner",
            DenyReason::SenderNotAuthorized => "sender_not_authorized",
            DenyReason::BotNotPrivileged => "bot_not_privileged",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthzDecision {
    Allow,
    Deny(DenyReason),
}

/// Identities that must never be targeted by moderation.
#[derive(Clone, Copy, Debug)]
pub struct ProtectedSet {
    pub group_owner: Option<UserId>,
    pub bot_owner: Option<UserId>,
    pub self_id: UserId,
}

/// The human who asked for the action. Policy escalations are
/// system-initiated and carry no initiator.
#[derive(Clone, Copy, Debug)]
pub struct Initiator {
    pub user_id: UserId,
    pub role: ChatRole,
}

/// Decide whether a prospective action may run.
///
/// Rules are evaluated in order, first match wins. Target protection
/// (rules 1–2) comes before sender authorization (rule 3) so an admin
/// cannot be talked into removing a protected identity.
pub fn authorize(
    action: &Action,
    initiator: Option<Initiator>,
    bot_role: ChatRole,
    protected: ProtectedSet,
) -> AuthzDecision {
    if let Some(target) = action_target(action) {
        if target == protected.self_id {
            return AuthzDecision::Deny(DenyReason::SelfTarget);
        }
        if Some(target) == protected.group_owner || Some(target) == protected.bot_owner {
            return AuthzDecision::Deny(DenyReason::ProtectedOwner);
        }
    }

    if is_privileged(action) {
        if let Some(initiator) = initiator {
            if !initiator.role.is_privileged() {
                return AuthzDecision::Deny(DenyReason::SenderNotAuthorized);
            }
        }
    }

    if requires_bot_privilege(action) && !bot_role.is_privileged() {
        return AuthzDecision::Deny(DenyReason::BotNotPrivileged);
    }

    AuthzDecision::Allow
}

fn action_target(action: &Action) -> Option<UserId> {
    match action {
        Action::RemoveParticipant { user_id, .. } => Some(*user_id),
        _ => None,
    }
}

/// Removal and deleting others' messages require an authorized sender.
fn is_privileged(action: &Action) -> bool {
    matches!(
        action,
        Action::RemoveParticipant { .. } | Action::DeleteMessage { .. }
    )
}

/// Only participant removal needs elevated platform capability on our side.
fn requires_bot_privilege(action: &Action) -> bool {
    matches!(action, Action::RemoveParticipant { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatId;

    const SELF: UserId = UserId(999);
    const GROUP_OWNER: UserId = UserId(100);
    const BOT_OWNER: UserId = UserId(200);

    fn protected() -> ProtectedSet {
        ProtectedSet {
            group_owner: Some(GROUP_OWNER),
            bot_owner: Some(BOT_OWNER),
            self_id: SELF,
        }
    }

    fn remove(target: UserId) -> Action {
        Action::RemoveParticipant {
            chat_id: ChatId(-100),
            user_id: target,
        }
    }

    fn admin(user: UserId) -> Option<Initiator> {
        Some(Initiator {
            user_id: user,
            role: ChatRole::Admin,
        })
    }

    #[test]
    fn denies_self_targeting_even_for_admins() {
        let d = authorize(&remove(SELF), admin(UserId(1)), ChatRole::Admin, protected());
        assert_eq!(d, AuthzDecision::Deny(DenyReason::SelfTarget));
    }

    #[test]
    fn denies_owner_targeting_even_for_admins() {
        let d = authorize(
            &remove(GROUP_OWNER),
            admin(UserId(1)),
            ChatRole::Admin,
            protected(),
        );
        assert_eq!(d, AuthzDecision::Deny(DenyReason::ProtectedOwner));

        let d = authorize(
            &remove(BOT_OWNER),
            admin(UserId(1)),
            ChatRole::Admin,
            protected(),
        );
        assert_eq!(d, AuthzDecision::Deny(DenyReason::ProtectedOwner));
    }

    #[test]
    fn protection_is_checked_before_sender_authorization() {
        // Unauthorized sender targeting the owner: the denial names the
        // protected target, not the sender.
        let initiator = Some(Initiator {
            user_id: UserId(1),
            role: ChatRole::None,
        });
        let d = authorize(&remove(GROUP_OWNER), initiator, ChatRole::Admin, protected());
        assert_eq!(d, AuthzDecision::Deny(DenyReason::ProtectedOwner));
    }

    #[test]
    fn denies_unprivileged_senders() {
        let initiator = Some(Initiator {
            user_id: UserId(1),
            role: ChatRole::None,
        });
        let d = authorize(&remove(UserId(5)), initiator, ChatRole::Admin, protected());
        assert_eq!(d, AuthzDecision::Deny(DenyReason::SenderNotAuthorized));
    }

    #[test]
    fn denies_removal_when_bot_is_not_admin() {
        let d = authorize(&remove(UserId(5)), admin(UserId(1)), ChatRole::None, protected());
        assert_eq!(d, AuthzDecision::Deny(DenyReason::BotNotPrivileged));
    }

    #[test]
    fn allows_admin_removing_ordinary_member() {
        let d = authorize(&remove(UserId(5)), admin(UserId(1)), ChatRole::Admin, protected());
        assert_eq!(d, AuthzDecision::Allow);
    }

    #[test]
    fn system_initiated_actions_skip_sender_authorization() {
        // Policy escalations have no human initiator; target protection and
        // bot capability still apply.
        let d = authorize(&remove(UserId(5)), None, ChatRole::Admin, protected());
        assert_eq!(d, AuthzDecision::Allow);

        let d = authorize(&remove(GROUP_OWNER), None, ChatRole::Admin, protected());
        assert_eq!(d, AuthzDecision::Deny(DenyReason::ProtectedOwner));

        let d = authorize(&remove(UserId(5)), None, ChatRole::None, protected());
        assert_eq!(d, AuthzDecision::Deny(DenyReason::BotNotPrivileged));
    }

    #[test]
    fn unprivileged_actions_are_always_allowed() {
        let send = Action::SendText {
            chat_id: ChatId(-100),
            text: "hi".to_string(),
            quote: None,
        };
        let initiator = Some(Initiator {
            user_id: UserId(1),
            role: ChatRole::None,
        });
        let d = authorize(&send, initiator, ChatRole::None, protected());
        assert_eq!(d, AuthzDecision::Allow);
    }
}
