//! Active-session registry
//!
//! Tracks the single in-flight focus session per user. The store is an
//! injected trait so the in-memory map can be swapped for a durable
//! backing store without touching the lifecycle logic. A user is either
//! idle (no entry) or active (one entry); there is no other state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::focus::ActiveSession;

/// Store holding at most one active session per user
#[async_trait]
pub trait ActiveSessionStore: Send + Sync {
    /// Insert or replace the session for `user_id` unconditionally
    async fn put(&self, user_id: Uuid, session: ActiveSession);

    /// Insert only if the slot is empty; on an occupied slot the existing
    /// session is returned and nothing changes. This is the atomic
    /// check-and-insert that keeps two concurrent starts from both
    /// succeeding.
    async fn try_put(&self, user_id: Uuid, session: ActiveSession)
    -> Result<(), ActiveSession>;

    /// Snapshot of the session for `user_id`, if any
    async fn get(&self, user_id: Uuid) -> Option<ActiveSession>;

    /// Remove and return the session for `user_id`. Acts as a claim: only
    /// one caller can observe a given session here.
    async fn remove(&self, user_id: Uuid) -> Option<ActiveSession>;

    /// Drop all entries. Called once at startup since in-flight sessions
    /// do not survive a restart.
    async fn clear(&self);
}

/// Process-local registry backed by a mutex-guarded map
#[derive(Default)]
pub struct InMemoryActiveSessionStore {
    sessions: Mutex<HashMap<Uuid, ActiveSession>>,
}

impl InMemoryActiveSessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ActiveSessionStore for InMemoryActiveSessionStore {
    async fn put(&self, user_id: Uuid, session: ActiveSession) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(user_id, session);
    }

    async fn try_put(
        &self,
        user_id: Uuid,
        session: ActiveSession,
    ) -> Result<(), ActiveSession> {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(&user_id) {
            return Err(existing.clone());
        }
        sessions.insert(user_id, session);
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Option<ActiveSession> {
        let sessions = self.sessions.lock().await;
        sessions.get(&user_id).cloned()
    }

    async fn remove(&self, user_id: Uuid) -> Option<ActiveSession> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&user_id)
    }

    async fn clear(&self) {
        let mut sessions = self.sessions.lock().await;
        sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::focus::SessionType;
    use chrono::Utc;

    fn session_for(user_id: Uuid) -> ActiveSession {
        ActiveSession {
            id: Uuid::new_v4(),
            user_id,
            task_id: None,
            session_type: SessionType::Work,
            start_at: Utc::now(),
            estimated_duration: Some(25),
        }
    }

    #[tokio::test]
    async fn test_try_put_rejects_second_writer() {
        let store = InMemoryActiveSessionStore::new();
        let user_id = Uuid::new_v4();
        let first = session_for(user_id);

        store.try_put(user_id, first.clone()).await.unwrap();

        let second = session_for(user_id);
        let existing = store.try_put(user_id, second).await.unwrap_err();
        assert_eq!(existing.id, first.id);

        // The original session is untouched
        let stored = store.get(user_id).await.unwrap();
        assert_eq!(stored.id, first.id);
    }

    #[tokio::test]
    async fn test_remove_claims_the_session_once() {
        let store = InMemoryActiveSessionStore::new();
        let user_id = Uuid::new_v4();
        let session = session_for(user_id);

        store.put(user_id, session.clone()).await;

        let claimed = store.remove(user_id).await.unwrap();
        assert_eq!(claimed.id, session.id);
        assert!(store.remove(user_id).await.is_none());
        assert!(store.get(user_id).await.is_none());
    }

    #[tokio::test]
    async fn test_users_do_not_share_slots() {
        let store = InMemoryActiveSessionStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.try_put(alice, session_for(alice)).await.unwrap();
        store.try_put(bob, session_for(bob)).await.unwrap();

        assert!(store.get(alice).await.is_some());
        store.remove(alice).await;
        assert!(store.get(bob).await.is_some());
    }

    #[tokio::test]
    async fn test_clear_empties_every_slot() {
        let store = InMemoryActiveSessionStore::new();
        for _ in 0..3 {
            let user_id = Uuid::new_v4();
            store.put(user_id, session_for(user_id)).await;
        }

        store.clear().await;

        let sessions = store.sessions.lock().await;
        assert!(sessions.is_empty());
    }
}
