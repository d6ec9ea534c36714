//! Canonical inbound events and the raw-to-canonical normalizer.

use crate::domain::{ChatId, MessageId, MessageRef, UserId};

/// Raw platform event as delivered by the transport adapter.
///
/// The adapter fills these without understanding moderation; everything
/// optional here is genuinely optional on the wire.
#[derive(Clone, Debug)]
pub enum RawEvent {
    Message(RawMessage),
    Membership {
        chat_id: ChatId,
        users: Vec<UserId>,
        kind: MembershipKind,
    },
    Connection {
        connected: bool,
    },
}

#[derive(Clone, Debug)]
pub struct RawMessage {
    pub chat_id: ChatId,
    pub sender_id: Option<UserId>,
    pub message_id: MessageId,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub mentioned: Vec<UserId>,
    pub quoted_author: Option<UserId>,
    pub is_group: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipKind {
    Joined,
    Left,
}

/// Canonical text message. Immutable; lives for one processing pass.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub text: String,
    pub message_ref: MessageRef,
    /// Mentioned user ids, in message order.
    pub mentioned: Vec<UserId>,
    /// Author of the message this one replies to, if any.
    pub quoted_author: Option<UserId>,
}

#[derive(Clone, Debug)]
pub struct MembershipChange {
    pub chat_id: ChatId,
    pub users: Vec<UserId>,
    pub kind: MembershipKind,
}

#[derive(Clone, Debug)]
pub enum InboundEvent {
    Message(InboundMessage),
    Membership(MembershipChange),
}

/// Map a raw event into its canonical form, or `None` when the engine must
/// ignore it. Pure; fails closed: anything malformed is dropped here, not
/// propagated as an error.
pub fn normalize(event: RawEvent, self_id: UserId) -> Option<InboundEvent> {
    match event {
        RawEvent::Message(raw) => normalize_message(raw, self_id).map(InboundEvent::Message),
        RawEvent::Membership {
            chat_id,
            users,
            kind,
        } => {
            if users.is_empty() {
                return None;
            }
            Some(InboundEvent::Membership(MembershipChange {
                chat_id,
                users,
                kind,
            }))
        }
        // Reconnects are the transport's problem; the engine never sees them.
        RawEvent::Connection { .. } => None,
    }
}

fn normalize_message(raw: RawMessage, self_id: UserId) -> Option<InboundMessage> {
    // Only group chats are moderated.
    if !raw.is_group {
        return None;
    }

    let sender_id = raw.sender_id?;
    // Our own messages would feed back into the policy engine.
    if sender_id == self_id {
        return None;
    }

    let text = raw.text.or(raw.caption).unwrap_or_default();
    if text.trim().is_empty() {
        return None;
    }

    Some(InboundMessage {
        chat_id: raw.chat_id,
        sender_id,
        text,
        message_ref: MessageRef {
            chat_id: raw.chat_id,
            message_id: raw.message_id,
        },
        mentioned: raw.mentioned,
        quoted_author: raw.quoted_author,
    })
}
