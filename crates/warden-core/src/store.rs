//! Per-(chat, user) violation counters.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{ChatId, UserId};

/// The only mutable shared state in the core.
///
/// Counters are keyed per (chat, user) and guarded by per-key locks:
/// `increment` is an atomic read-modify-write, so two concurrent violations
/// from the same user observe distinct counts instead of both reading the
/// same one. Keys are independent; there is no cross-key blocking.
///
/// Counters live for the process lifetime; losing them on restart is
/// acceptable, the policy is advisory.
#[derive(Default)]
pub struct ViolationStore {
    counters: Mutex<HashMap<(ChatId, UserId), Arc<Mutex<u32>>>>,
}

impl ViolationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, chat_id: ChatId, user_id: UserId) -> Arc<Mutex<u32>> {
        let mut map = self.counters.lock().await;
        map.entry((chat_id, user_id))
            .or_insert_with(|| Arc::new(Mutex::new(0)))
            .clone()
    }

    pub async fn get(&self, chat_id: ChatId, user_id: UserId) -> u32 {
        *self.entry(chat_id, user_id).await.lock().await
    }

    pub async fn increment(&self, chat_id: ChatId, user_id: UserId) -> u32 {
        let counter = self.entry(chat_id, user_id).await;
        let mut n = counter.lock().await;
        *n = n.saturating_add(1);
        *n
    }

    pub async fn reset(&self, chat_id: ChatId, user_id: UserId) {
        let counter = self.entry(chat_id, user_id).await;
        *counter.lock().await = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: ChatId = ChatId(-100);
    const USER: UserId = UserId(5);

    #[tokio::test]
    async fn increment_and_reset() {
        let store = ViolationStore::new();
        assert_eq!(store.get(CHAT, USER).await, 0);

        assert_eq!(store.increment(CHAT, USER).await, 1);
        assert_eq!(store.increment(CHAT, USER).await, 2);
        assert_eq!(store.get(CHAT, USER).await, 2);

        store.reset(CHAT, USER).await;
        assert_eq!(store.get(CHAT, USER).await, 0);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = ViolationStore::new();
        store.increment(CHAT, USER).await;
        store.increment(ChatId(-200), USER).await;
        store.increment(CHAT, UserId(6)).await;

        assert_eq!(store.get(CHAT, USER).await, 1);
        assert_eq!(store.get(ChatId(-200), USER).await, 1);
        assert_eq!(store.get(CHAT, UserId(6)).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_do_not_lose_updates() {
        let store = Arc::new(ViolationStore::new());

        let mut handles = Vec::new();
        for _ in 0..64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment(CHAT, USER).await;
            }));
        }
        for h in handles {
            h.await.expect("task panicked");
        }

        assert_eq!(store.get(CHAT, USER).await, 64);
    }
}
