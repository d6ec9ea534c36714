/// Platform user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Group chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Message id (numeric, per-chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A user's standing in a chat.
///
/// Always sourced fresh from the roster at decision time; the core never
/// caches roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    None,
    Admin,
    Owner,
}

impl ChatRole {
    pub fn is_privileged(self) -> bool {
        !matches!(self, ChatRole::None)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RosterMember {
    pub user_id: UserId,
    pub role: ChatRole,
}

/// Role information for one chat.
///
/// May contain privileged members only; a user absent from `members` has
/// role `None`, which is the fail-closed default every caller wants.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    pub owner_id: Option<UserId>,
    pub members: Vec<RosterMember>,
}

impl Roster {
    pub fn role_of(&self, user_id: UserId) -> ChatRole {
        self.members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.role)
            .unwrap_or(ChatRole::None)
    }
}

/// A single side-effecting operation against the chat platform.
///
/// Produced by the policy/command logic, consumed only by the dispatcher;
/// never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SendText {
        chat_id: ChatId,
        text: String,
        quote: Option<MessageRef>,
    },
    DeleteMessage {
        message: MessageRef,
    },
    RemoveParticipant {
        chat_id: ChatId,
        user_id: UserId,
    },
    React {
        message: MessageRef,
        emoji: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_of_defaults_to_none() {
        let roster = Roster {
            owner_id: Some(UserId(1)),
            members: vec![
                RosterMember {
                    user_id: UserId(1),
                    role: ChatRole::Owner,
                },
                RosterMember {
                    user_id: UserId(2),
                    role: ChatRole::Admin,
                },
            ],
        };

        assert_eq!(roster.role_of(UserId(1)), ChatRole::Owner);
        assert_eq!(roster.role_of(UserId(2)), ChatRole::Admin);
        assert_eq!(roster.role_of(UserId(3)), ChatRole::None);
    }
}
