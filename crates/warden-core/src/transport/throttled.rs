use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef, Roster, UserId},
    transport::port::TransportPort,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound platform calls.
    pub global_min_interval: Duration,
    /// Minimum spacing between calls per chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),
            per_chat_min_interval: Duration::from_millis(1050),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// TransportPort decorator that rate-limits outbound calls.
///
/// Best-effort flood control: an escalation burst (warn + delete + remove)
/// should not trip platform limits. It does not guarantee zero 429s.
pub struct ThrottledTransport {
    inner: Arc<dyn TransportPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledTransport {
    pub fn new(inner: Arc<dyn TransportPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: i64) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if wait > Duration::from_millis(0) {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl TransportPort for ThrottledTransport {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        quote: Option<MessageRef>,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_text(chat_id, text, quote).await
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        self.throttle_chat(message.chat_id.0).await;
        self.inner.delete_message(message).await
    }

    async fn remove_participant(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.throttle_chat(chat_id.0).await;
        self.inner.remove_participant(chat_id, user_id).await
    }

    async fn react(&self, message: MessageRef, emoji: &str) -> Result<()> {
        self.throttle_chat(message.chat_id.0).await;
        self.inner.react(message, emoji).await
    }

    async fn get_roster(&self, chat_id: ChatId) -> Result<Roster> {
        self.throttle_chat(chat_id.0).await;
        self.inner.get_roster(chat_id).await
    }

    fn self_identity(&self) -> UserId {
        self.inner.self_identity()
    }

    fn normalize_user_arg(&self, raw: &str) -> Option<UserId> {
        self.inner.normalize_user_arg(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limiter_spaces_out_reservations() {
        let mut lim = IntervalLimiter::new(Duration::from_millis(100));

        // First reservation is immediate; later ones queue behind it. Allow
        // slack for the wall-clock time between calls.
        assert_eq!(lim.reserve(), Duration::ZERO);
        let second = lim.reserve();
        assert!(second > Duration::from_millis(50));
        let third = lim.reserve();
        assert!(third > second);
    }
}
