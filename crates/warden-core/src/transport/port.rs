use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, Roster, UserId},
    Result,
};

/// Action-side port to the chat platform.
///
/// Telegram is the first implementation; the shape leaves room for other
/// platforms behind the same interface. Inbound events arrive separately as
/// `RawEvent` values on the channel owned by the adapter; the engine never
/// learns about connections or reconnects.
#[async_trait]
pub trait TransportPort: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        quote: Option<MessageRef>,
    ) -> Result<MessageRef>;

    async fn delete_message(&self, message: MessageRef) -> Result<()>;

    /// Removing an already-absent member is a successful no-op.
    async fn remove_participant(&self, chat_id: ChatId, user_id: UserId) -> Result<()>;

    async fn react(&self, message: MessageRef, emoji: &str) -> Result<()>;

    /// Fresh role information for one chat. Callers must not cache this.
    async fn get_roster(&self, chat_id: ChatId) -> Result<Roster>;

    /// The bot's own identity, resolved once at connect time.
    fn self_identity(&self) -> UserId;

    /// Normalize a raw command argument into the platform's user-id form.
    fn normalize_user_arg(&self, raw: &str) -> Option<UserId>;
}
