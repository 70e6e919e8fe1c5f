//! Live onboarding sessions, keyed by user id.
//!
//! The store hands out one `Arc<Mutex<Session>>` per user: holding that lock
//! while handling an event serializes a single user's events in arrival
//! order, while different users proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::onboarding::state::{Intent, OnboardingStep};

/// Fields accumulated across onboarding turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub intent: Option<Intent>,
}

/// One user's in-progress onboarding conversation.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub username: Option<String>,
    pub step: OnboardingStep,
    pub collected: Collected,
    /// Touched on every handled event; drives idle eviction.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: i64, username: Option<String>) -> Self {
        Self {
            user_id,
            username,
            step: OnboardingStep::default(),
            collected: Collected::default(),
            last_activity: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Reset to a fresh AwaitingContact session, dropping collected data.
    /// Used when the user sends /start mid-flow.
    pub fn restart(&mut self) {
        self.step = OnboardingStep::default();
        self.collected = Collected::default();
        self.touch();
    }
}

/// In-memory session store with per-user serialized access.
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, Arc<Mutex<Session>>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Get the live session for a user, if any.
    pub async fn get(&self, user_id: i64) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Get the live session for a user, creating a fresh one if absent.
    pub async fn get_or_create(
        &self,
        user_id: i64,
        username: Option<String>,
    ) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(user_id, username))))
            .clone()
    }

    /// Remove a session from the live set (terminal transition).
    pub async fn remove(&self, user_id: i64) {
        self.sessions.write().await.remove(&user_id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Evict sessions idle longer than the configured timeout.
    /// Returns the number of sessions evicted.
    pub async fn evict_idle(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.idle_timeout).unwrap_or(chrono::Duration::zero());

        let mut sessions = self.sessions.write().await;
        let mut stale = Vec::new();
        for (user_id, session) in sessions.iter() {
            // try_lock: a session mid-event is active by definition.
            if let Ok(guard) = session.try_lock() {
                if guard.last_activity < cutoff {
                    stale.push(*user_id);
                }
            }
        }
        for user_id in &stale {
            sessions.remove(user_id);
            tracing::info!(user_id, "Evicted idle onboarding session");
        }
        stale.len()
    }
}

/// Spawn the periodic idle-session sweep.
pub fn spawn_idle_sweep(store: Arc<SessionStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            store.evict_idle().await;
        }
    })
}
