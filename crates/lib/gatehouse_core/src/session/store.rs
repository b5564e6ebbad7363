//! Expiring token → session store.
//!
//! Each token maps to one entry holding both the session and its last-access
//! time, so the two can never disagree. Entries live in a sharded
//! [`DashMap`]; every operation on a token runs under that token's shard
//! lock, which makes `get`/`put`/`remove` on one token linearizable while
//! different tokens proceed independently.
//!
//! Expiry is lazy: an idle entry is evicted by the `get` that finds it stale.
//! A dead token therefore lingers in memory until looked up, unless the
//! optional sweeper ([`SessionStore::spawn_sweeper`]) is running.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::Session;
use crate::config::SessionConfig;
use crate::token::fingerprint;

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

struct StoreEntry {
    session: Arc<Session>,
    last_access: Instant,
}

/// Thread-safe, expiring map from token to [`Session`].
pub struct SessionStore {
    entries: DashMap<String, StoreEntry>,
    idle_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// Store using the system clock. The idle timeout is fixed here.
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            idle_timeout_ms = millis(config.idle_timeout),
            "sessions will expire after this much inactivity"
        );
        Self {
            entries: DashMap::new(),
            idle_timeout: config.idle_timeout,
            clock,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    fn is_stale(&self, last_access: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last_access) > self.idle_timeout
    }

    /// Look up a token.
    ///
    /// A live entry has its last-access time refreshed before the session is
    /// returned. An entry idle for longer than the timeout is removed, its
    /// session invalidated, and `None` returned, exactly as if the token had
    /// never existed.
    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        let now = self.clock.now();

        let evicted = match self.entries.entry(token.to_owned()) {
            Entry::Vacant(_) => return None,
            Entry::Occupied(mut occupied) => {
                if !self.is_stale(occupied.get().last_access, now) {
                    let entry = occupied.get_mut();
                    entry.last_access = now;
                    entry.session.touch(now);
                    return Some(entry.session.clone());
                }
                occupied.remove().session
            }
        };

        debug!(token = %fingerprint(token), "session has timed out");
        evicted.invalidate();
        None
    }

    /// Insert or replace the session for `token`, marking it accessed now.
    /// A replaced session is returned to the caller, not invalidated.
    pub fn put(&self, token: impl Into<String>, session: Arc<Session>) -> Option<Arc<Session>> {
        let now = self.clock.now();
        session.touch(now);
        self.entries
            .insert(
                token.into(),
                StoreEntry {
                    session,
                    last_access: now,
                },
            )
            .map(|previous| previous.session)
    }

    /// Remove and return the session for `token`. Invalidating it is the
    /// caller's job.
    pub fn remove(&self, token: &str) -> Option<Arc<Session>> {
        self.entries.remove(token).map(|(_, entry)| entry.session)
    }

    /// Whether `token` is currently held, without touching or expiring it.
    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Number of entries, including stale ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict and invalidate every stale entry. Returns how many were evicted.
    pub fn evict_expired(&self) -> usize {
        let started = self.clock.now();
        let mut evicted = Vec::new();
        self.entries.retain(|_, entry| {
            if self.is_stale(entry.last_access, started) {
                evicted.push(entry.session.clone());
                false
            } else {
                true
            }
        });

        for session in &evicted {
            session.invalidate();
        }
        debug!(
            evicted = evicted.len(),
            elapsed_ms = millis(self.clock.now().saturating_duration_since(started)),
            "session sweep complete"
        );
        evicted.len()
    }

    /// Remove every entry, returning the sessions for the caller to
    /// invalidate.
    pub fn drain(&self) -> Vec<Arc<Session>> {
        let tokens: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        tokens
            .iter()
            .filter_map(|token| self.remove(token))
            .collect()
    }

    /// Sweep stale entries every `interval` until `cancel` fires. Trades a
    /// background task for bounded memory held by abandoned tokens.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        info!(interval_secs = interval.as_secs(), "starting background session sweeper");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        store.evict_expired();
                    }
                }
            }
            debug!("session sweeper stopped");
        })
    }
}
