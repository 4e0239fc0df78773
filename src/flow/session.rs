//! Per-chat conversation session records.
//!
//! One record per chat that has a login conversation in progress; the absence
//! of a record is the idle state. A record holds at most one live
//! [`PendingLogin`] handle, and every way a record leaves the store hands that
//! handle back to the caller so it can be torn down outside the lock.

use crate::backend::{BackendKind, PendingLogin};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Position of a chat within the login conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    /// No conversation in progress
    #[default]
    Idle,
    /// Waiting for the user to pick a backend
    SelectingBackend,
    /// Waiting for the phone number
    AwaitingPhone,
    /// Code requested, waiting for the verification code
    AwaitingCode,
}

/// Mutable conversational context for one chat
pub struct SessionRecord {
    /// Current conversation step
    pub state: FlowState,
    /// Backend chosen at the selection step
    pub backend: Option<BackendKind>,
    /// Phone number collected at the phone step
    pub phone: Option<String>,
    /// Live login handle, present only between code request and sign-in
    pub pending: Option<Box<dyn PendingLogin>>,
    last_activity: Instant,
}

impl SessionRecord {
    fn new() -> Self {
        Self {
            state: FlowState::SelectingBackend,
            backend: None,
            phone: None,
            pending: None,
            last_activity: Instant::now(),
        }
    }

    /// Mark qualifying input, resetting the inactivity clock
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// How long this conversation has been waiting for input
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

/// All live conversations, keyed by chat id.
///
/// The lock is only held for record bookkeeping, never across a network call
/// to a backend.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<i64, SessionRecord>>,
}

impl SessionStore {
    /// New empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a chat; chats without a record are idle
    pub async fn state_of(&self, chat_id: i64) -> FlowState {
        self.inner
            .lock()
            .await
            .get(&chat_id)
            .map_or(FlowState::Idle, |record| record.state)
    }

    /// Start (or restart) a conversation at the backend-selection step.
    ///
    /// Returns the previous record's pending handle, if any, so the caller
    /// can tear it down.
    pub async fn begin(&self, chat_id: i64) -> Option<Box<dyn PendingLogin>> {
        let mut inner = self.inner.lock().await;
        inner
            .insert(chat_id, SessionRecord::new())
            .and_then(|record| record.pending)
    }

    /// Remove a chat's record, returning any pending handle for teardown
    pub async fn clear(&self, chat_id: i64) -> Option<Box<dyn PendingLogin>> {
        self.inner
            .lock()
            .await
            .remove(&chat_id)
            .and_then(|record| record.pending)
    }

    /// Attach a freshly-requested login handle and advance to the code step.
    ///
    /// `Ok` carries any stale handle that was replaced; `Err` hands the new
    /// handle back because the conversation disappeared while the code
    /// request was on the wire.
    #[allow(clippy::type_complexity)]
    pub async fn attach_pending(
        &self,
        chat_id: i64,
        pending: Box<dyn PendingLogin>,
    ) -> Result<Option<Box<dyn PendingLogin>>, Box<dyn PendingLogin>> {
        let mut inner = self.inner.lock().await;
        match inner.get_mut(&chat_id) {
            Some(record) => {
                let old = record.pending.replace(pending);
                record.state = FlowState::AwaitingCode;
                record.touch();
                Ok(old)
            }
            None => Err(pending),
        }
    }

    /// Run `f` against the chat's record if one exists
    pub async fn with_record<T>(
        &self,
        chat_id: i64,
        f: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Option<T> {
        self.inner.lock().await.get_mut(&chat_id).map(f)
    }

    /// Remove every record idle for at least `max_idle`.
    ///
    /// Returns the expired chat ids with their pending handles so teardown
    /// can run outside the lock.
    pub async fn drain_idle(
        &self,
        max_idle: Duration,
    ) -> Vec<(i64, Option<Box<dyn PendingLogin>>)> {
        let mut inner = self.inner.lock().await;
        let expired: Vec<i64> = inner
            .iter()
            .filter(|(_, record)| record.idle_for() >= max_idle)
            .map(|(chat_id, _)| *chat_id)
            .collect();
        expired
            .into_iter()
            .filter_map(|chat_id| inner.remove(&chat_id).map(|record| (chat_id, record.pending)))
            .collect()
    }

    /// Number of conversations in progress
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether no conversation is in progress
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_record_is_idle() {
        let store = SessionStore::new();
        assert_eq!(store.state_of(7).await, FlowState::Idle);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_begin_and_clear_lifecycle() {
        let store = SessionStore::new();
        assert!(store.begin(7).await.is_none());
        assert_eq!(store.state_of(7).await, FlowState::SelectingBackend);

        store
            .with_record(7, |record| {
                record.backend = Some(BackendKind::Telethon);
                record.state = FlowState::AwaitingPhone;
            })
            .await;
        assert_eq!(store.state_of(7).await, FlowState::AwaitingPhone);

        assert!(store.clear(7).await.is_none());
        assert_eq!(store.state_of(7).await, FlowState::Idle);
    }

    #[tokio::test]
    async fn test_drain_idle_respects_threshold() {
        let store = SessionStore::new();
        store.begin(1).await;
        store.begin(2).await;

        // Nothing is that old yet
        assert!(store.drain_idle(Duration::from_secs(600)).await.is_empty());
        assert_eq!(store.len().await, 2);

        // Zero threshold expires everything
        let expired = store.drain_idle(Duration::ZERO).await;
        assert_eq!(expired.len(), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_touch_resets_idle_clock() {
        let store = SessionStore::new();
        store.begin(1).await;
        let idle_before = store
            .with_record(1, |record| {
                record.touch();
                record.idle_for()
            })
            .await
            .expect("record exists");
        assert!(idle_before < Duration::from_secs(1));
    }
}
