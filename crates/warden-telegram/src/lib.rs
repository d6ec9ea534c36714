//! Telegram adapter (teloxide).
//!
//! Implements the `warden-core` TransportPort over the Telegram Bot API.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

pub mod listener;

use warden_core::{
    domain::{ChatId, ChatRole, MessageId, MessageRef, Roster, RosterMember, UserId},
    errors::Error,
    transport::port::TransportPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    self_id: UserId,
}

impl TelegramTransport {
    /// Resolve the bot's own identity once, up front.
    pub async fn connect(bot: Bot) -> Result<Self> {
        let me = bot.get_me().await.map_err(Self::map_err)?;
        Ok(Self {
            bot,
            self_id: UserId(me.user.id.0 as i64),
        })
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn tg_user(user_id: UserId) -> teloxide::types::UserId {
        teloxide::types::UserId(user_id.0 as u64)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

/// Telegram reports removal of a user who already left as an API error;
/// the port contract says that is a successful no-op.
fn is_absent_member(e: &Error) -> bool {
    let Error::Transport(msg) = e else {
        return false;
    };
    let msg = msg.to_ascii_lowercase();
    msg.contains("user_not_participant")
        || msg.contains("user not found")
        || msg.contains("participant_id_invalid")
}

#[async_trait]
impl TransportPort for TelegramTransport {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        quote: Option<MessageRef>,
    ) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_message(Self::tg_chat(chat_id), text.to_string());
                if let Some(quote) = quote {
                    req = req.reply_to_message_id(Self::tg_msg_id(quote.message_id));
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot.delete_message(
                Self::tg_chat(message.chat_id),
                Self::tg_msg_id(message.message_id),
            )
        })
        .await?;
        Ok(())
    }

    async fn remove_participant(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        let banned = self
            .with_retry(|| {
                self.bot
                    .ban_chat_member(Self::tg_chat(chat_id), Self::tg_user(user_id))
            })
            .await;

        match banned {
            Ok(_) => {
                // Lift the ban so this is a removal, not a permanent ban; the
                // user can rejoin via invite.
                let _ = self
                    .with_retry(|| {
                        self.bot
                            .unban_chat_member(Self::tg_chat(chat_id), Self::tg_user(user_id))
                    })
                    .await;
                Ok(())
            }
            Err(e) if is_absent_member(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn react(&self, _message: MessageRef, _emoji: &str) -> Result<()> {
        // Reactions need a newer Bot API surface than this teloxide exposes;
        // keep this best-effort and optional.
        Ok(())
    }

    async fn get_roster(&self, chat_id: ChatId) -> Result<Roster> {
        let admins = self
            .with_retry(|| self.bot.get_chat_administrators(Self::tg_chat(chat_id)))
            .await
            .map_err(|e| Error::RosterUnavailable {
                chat_id,
                reason: e.to_string(),
            })?;

        let mut owner_id = None;
        let members = admins
            .iter()
            .map(|m| {
                let user_id = UserId(m.user.id.0 as i64);
                let role = if m.kind.is_owner() {
                    owner_id = Some(user_id);
                    ChatRole::Owner
                } else {
                    ChatRole::Admin
                };
                RosterMember { user_id, role }
            })
            .collect();

        Ok(Roster { owner_id, members })
    }

    fn self_identity(&self) -> UserId {
        self.self_id
    }

    fn normalize_user_arg(&self, raw: &str) -> Option<UserId> {
        let digits = raw.trim().trim_start_matches('@');
        let id = digits.parse::<i64>().ok()?;
        if id <= 0 {
            return None;
        }
        Some(UserId(id))
    }
}
