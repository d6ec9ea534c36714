//! Update listener: maps Telegram updates into raw engine events.
//!
//! The engine consumes a channel of `RawEvent`s; this module owns the
//! producing side. Polling, backoff, and reconnection are teloxide's
//! business and never leak past this file.

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::MessageEntityKind};

use tokio::sync::mpsc;
use tracing::{info, warn};

use warden_core::domain::{ChatId, MessageId, UserId};
use warden_core::event::{MembershipKind, RawEvent, RawMessage};

pub async fn run_polling(bot: Bot, tx: mpsc::Sender<RawEvent>) -> anyhow::Result<()> {
    if let Ok(me) = bot.get_me().await {
        info!(username = %me.username(), "warden connected");
    }
    let _ = tx.send(RawEvent::Connection { connected: true }).await;

    let handler = Update::filter_message().endpoint(on_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![tx])
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn on_message(msg: Message, tx: mpsc::Sender<RawEvent>) -> ResponseResult<()> {
    if let Some(event) = map_message(&msg) {
        if tx.send(event).await.is_err() {
            warn!("engine channel closed, dropping update");
        }
    }
    Ok(())
}

fn map_message(msg: &Message) -> Option<RawEvent> {
    let chat_id = ChatId(msg.chat.id.0);

    if let Some(users) = msg.new_chat_members() {
        return Some(RawEvent::Membership {
            chat_id,
            users: users.iter().map(|u| UserId(u.id.0 as i64)).collect(),
            kind: MembershipKind::Joined,
        });
    }
    if let Some(user) = msg.left_chat_member() {
        return Some(RawEvent::Membership {
            chat_id,
            users: vec![UserId(user.id.0 as i64)],
            kind: MembershipKind::Left,
        });
    }

    // Plain @username mentions carry no user id; only text mentions (the
    // ones produced by tapping a profile) resolve to a target here.
    let mentioned = msg
        .entities()
        .map(|entities| {
            entities
                .iter()
                .filter_map(|e| match &e.kind {
                    MessageEntityKind::TextMention { user } => Some(UserId(user.id.0 as i64)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let quoted_author = msg
        .reply_to_message()
        .and_then(|r| r.from())
        .map(|u| UserId(u.id.0 as i64));

    Some(RawEvent::Message(RawMessage {
        chat_id,
        sender_id: msg.from().map(|u| UserId(u.id.0 as i64)),
        message_id: MessageId(msg.id.0),
        text: msg.text().map(str::to_owned),
        caption: msg.caption().map(str::to_owned),
        mentioned,
        quoted_author,
        is_group: msg.chat.is_group() || msg.chat.is_supergroup(),
    }))
}
