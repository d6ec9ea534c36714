//! Sequential action execution against the transport.

use tracing::warn;

use crate::domain::Action;
use crate::transport::port::TransportPort;
use crate::Error;

/// Outcome of dispatching one action sequence.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub attempted: usize,
    pub failures: Vec<(Action, Error)>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply `actions` in order.
///
/// A failed action is recorded and the rest of the queue still runs: a
/// delete failure must not swallow the notification that follows it.
/// Retrying is the transport's business, not policy logic.
pub async fn dispatch(transport: &dyn TransportPort, actions: Vec<Action>) -> DispatchReport {
    let mut report = DispatchReport::default();

    for action in actions {
        report.attempted += 1;
        let outcome = match &action {
            Action::SendText {
                chat_id,
                text,
                quote,
            } => transport.send_text(*chat_id, text, *quote).await.map(|_| ()),
            Action::DeleteMessage { message } => transport.delete_message(*message).await,
            Action::RemoveParticipant { chat_id, user_id } => {
                transport.remove_participant(*chat_id, *user_id).await
            }
            Action::React { message, emoji } => transport.react(*message, emoji).await,
        };

        if let Err(e) = outcome {
            warn!(action = ?action, error = %e, "action failed, continuing with the rest of the batch");
            report.failures.push((action, e));
        }
    }

    report
}
