//! Live player sessions, keyed by session id
//!
//! Each session sits behind its own mutex so that at most one transition
//! (`start_round`, `cash_out`, `forfeit`) runs against it at a time. Sessions
//! never share a lock with each other.
//!
//! Sessions idle longer than the configured TTL are dropped, and the store
//! never holds more than `max_sessions`: opening one more at capacity evicts
//! the least recently used session.

use crate::games::{round_engine::RoundEngine, session::GameSession, types::Amount};
use crate::metrics::GameMetrics;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type SharedSession = Arc<Mutex<GameSession>>;

pub const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Bounds on how long and how many sessions are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

struct Entry {
    session: SharedSession,
    last_access: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_access) > ttl
    }
}

pub struct SessionStore {
    sessions: DashMap<String, Entry>,
    engine: Arc<RoundEngine>,
    metrics: Arc<GameMetrics>,
    starting_balance: Amount,
    history_limit: usize,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(engine: Arc<RoundEngine>, starting_balance: Amount, history_limit: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            engine,
            metrics: Arc::new(GameMetrics::new()),
            starting_balance,
            history_limit,
            limits: SessionLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = SessionLimits {
            idle_ttl: limits.idle_ttl,
            max_sessions: limits.max_sessions.max(1),
        };
        self
    }

    /// Open a session for a new player context. Expired sessions are swept
    /// first; at capacity the least recently used one makes room.
    pub fn create(&self) -> (String, SharedSession) {
        self.evict_expired();
        while self.sessions.len() >= self.limits.max_sessions {
            if !self.evict_least_recent() {
                break;
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = GameSession::new(id.clone(), self.starting_balance, self.engine.clone())
            .with_history_limit(self.history_limit);
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(
            id.clone(),
            Entry {
                session: shared.clone(),
                last_access: Instant::now(),
            },
        );
        self.metrics.session_opened();

        info!(session_id = %id, balance = %self.starting_balance, "Session created");
        (id, shared)
    }

    /// Look up a live session and mark it as used. An expired session is
    /// dropped on the spot and reported as missing.
    pub fn get(&self, id: &str) -> Option<SharedSession> {
        let now = Instant::now();
        let ttl = self.limits.idle_ttl;
        {
            let mut entry = self.sessions.get_mut(id)?;
            if !entry.is_expired(now, ttl) {
                entry.last_access = now;
                return Some(entry.session.clone());
            }
        }

        // Guard released above; the shard lock is not reentrant
        self.drop_entry(id, |entry| entry.is_expired(now, ttl), "expired");
        None
    }

    /// End a player context. An open round goes with it, its bet already lost.
    pub fn remove(&self, id: &str) -> Option<SharedSession> {
        self.drop_entry(id, |_| true, "closed")
    }

    /// Drop every session idle past the TTL. Returns how many went.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.limits.idle_ttl;
        let mut evicted = 0;
        self.sessions.retain(|id, entry| {
            let keep = !entry.is_expired(now, ttl);
            if !keep {
                evicted += 1;
                debug!(session_id = %id, "Session expired");
            }
            keep
        });
        for _ in 0..evicted {
            self.metrics.session_closed();
        }
        if evicted > 0 {
            info!(evicted, live = self.sessions.len(), "Expired sessions swept");
        }
        evicted
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().last_access)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(id) => {
                warn!(session_id = %id, "Session store full, evicting least recently used");
                self.drop_entry(&id, |_| true, "evicted").is_some()
            }
            None => false,
        }
    }

    fn drop_entry(
        &self,
        id: &str,
        condition: impl FnOnce(&Entry) -> bool,
        reason: &'static str,
    ) -> Option<SharedSession> {
        let (_, entry) = self.sessions.remove_if(id, |_, entry| condition(entry))?;
        self.metrics.session_closed();
        info!(session_id = %id, reason, "Session removed");
        Some(entry.session)
    }

    /// Run one transition while holding the session's lock
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut GameSession) -> R) -> Option<R> {
        let shared = self.get(id)?;
        Some(lock_session(&shared, f))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn engine(&self) -> &Arc<RoundEngine> {
        &self.engine
    }

    pub fn metrics(&self) -> &Arc<GameMetrics> {
        &self.metrics
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }
}

/// Lock a shared session for the duration of `f`. Transitions never panic
/// half-way, so a poisoned lock still guards consistent state.
pub fn lock_session<R>(session: &SharedSession, f: impl FnOnce(&mut GameSession) -> R) -> R {
    let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut *guard)
}
