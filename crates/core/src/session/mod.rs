//! Per-user conversation state.
//!
//! Sessions live in process memory only; a restart drops every active session
//! together with the record of which users have written since start, so the
//! first event from each user afterwards carries the expiry notice.

pub mod sequencer;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{FlowKind, Session, UserId};

pub use sequencer::{Ticket, TurnGuard, UserSequencer};

/// Keyed session storage. At most one session exists per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Option<Session>;
    /// Starts a fresh session, replacing any existing one for the user.
    async fn create(&self, user_id: &UserId, kind: FlowKind, now: DateTime<Utc>) -> Session;
    async fn put(&self, session: Session);
    async fn delete(&self, user_id: &UserId) -> Option<Session>;
    async fn active_count(&self) -> usize;
    /// Records contact from the user; true only for their first event since
    /// the process started.
    async fn first_contact(&self, user_id: &UserId) -> bool;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
    seen: RwLock<HashSet<UserId>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: &UserId) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(user_id).cloned()
    }

    async fn create(&self, user_id: &UserId, kind: FlowKind, now: DateTime<Utc>) -> Session {
        let session = Session::start(user_id.clone(), kind, now);
        let mut sessions = self.sessions.write().await;
        sessions.insert(user_id.clone(), session.clone());
        session
    }

    async fn put(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_id.clone(), session);
    }

    async fn delete(&self, user_id: &UserId) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(user_id)
    }

    async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn first_contact(&self, user_id: &UserId) -> bool {
        if self.seen.read().await.contains(user_id) {
            return false;
        }
        self.seen.write().await.insert(user_id.clone())
    }
}
