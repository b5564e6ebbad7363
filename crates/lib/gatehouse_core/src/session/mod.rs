//! Per-login session state and the token → session store.
//!
//! A [`Session`] owns everything tied to one login: the identity and
//! authorization contexts handed back by the authenticator, plus any live
//! resources (tunnels) opened on the user's behalf. It is either active or
//! invalidated; invalidation is terminal.

pub mod clock;
pub mod store;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::{AuthorizationContext, Identity};
use crate::events::{AuthEvent, Listeners};

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::SessionStore;

/// Lock a mutex, recovering the guard if a panicking holder poisoned it.
/// Every critical section here leaves the data consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resource errors.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Unable to close resource: {0}")]
    Close(String),

    #[error("Session has been invalidated")]
    SessionInvalidated,
}

/// A live resource tied to a login, closed when the login ends.
pub trait SessionResource: Send + Sync {
    fn close(&self) -> Result<(), ResourceError>;

    /// When the resource was opened.
    fn created_at(&self) -> Instant;
}

/// Lifecycle of a session. `Invalidated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Invalidated,
}

struct Resources {
    state: SessionState,
    entries: HashMap<String, Arc<dyn SessionResource>>,
}

/// Server-side state for one authenticated login.
pub struct Session {
    identity: RwLock<Arc<Identity>>,
    resources: Mutex<Resources>,
    last_accessed: Mutex<Instant>,
    login_time: DateTime<Utc>,
    listeners: Listeners,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username())
            .field("state", &self.state())
            .field("resources", &self.resource_count())
            .field("login_time", &self.login_time)
            .finish()
    }
}

impl Session {
    /// A new active session with no resources, last accessed at `now`.
    pub fn new(identity: Identity, now: Instant) -> Self {
        Self {
            identity: RwLock::new(Arc::new(identity)),
            resources: Mutex::new(Resources {
                state: SessionState::Active,
                entries: HashMap::new(),
            }),
            last_accessed: Mutex::new(now),
            login_time: Utc::now(),
            listeners: Listeners::none(),
        }
    }

    /// Listeners told when this session is invalidated.
    pub fn with_listeners(mut self, listeners: Listeners) -> Self {
        self.listeners = listeners;
        self
    }

    /// Snapshot of the current identity.
    pub fn identity(&self) -> Arc<Identity> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace identity and authorization contexts after a credential
    /// refresh. The session, its token and its resources are kept.
    pub fn replace_identity(&self, identity: Identity) {
        *self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(identity);
    }

    pub fn username(&self) -> String {
        self.identity().user.username.clone()
    }

    /// The authorization context issued by `provider`, if any.
    pub fn context(&self, provider: &str) -> Option<AuthorizationContext> {
        self.identity().context(provider).cloned()
    }

    pub fn login_time(&self) -> DateTime<Utc> {
        self.login_time
    }

    pub fn last_accessed(&self) -> Instant {
        *lock(&self.last_accessed)
    }

    /// Record an access. Never moves the timestamp backwards.
    pub(crate) fn touch(&self, now: Instant) {
        let mut last = lock(&self.last_accessed);
        if now > *last {
            *last = now;
        }
    }

    pub fn state(&self) -> SessionState {
        lock(&self.resources).state
    }

    pub fn is_valid(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Associate a resource with this session, replacing any resource with
    /// the same id. Fails once the session is invalidated.
    pub fn add_resource(
        &self,
        id: impl Into<String>,
        resource: Arc<dyn SessionResource>,
    ) -> Result<(), ResourceError> {
        let mut resources = lock(&self.resources);
        if resources.state == SessionState::Invalidated {
            return Err(ResourceError::SessionInvalidated);
        }
        resources.entries.insert(id.into(), resource);
        Ok(())
    }

    /// Disassociate a resource without closing it. Returns whether it was
    /// present.
    pub fn remove_resource(&self, id: &str) -> bool {
        lock(&self.resources).entries.remove(id).is_some()
    }

    pub fn resource(&self, id: &str) -> Option<Arc<dyn SessionResource>> {
        lock(&self.resources).entries.get(id).cloned()
    }

    pub fn resource_count(&self) -> usize {
        lock(&self.resources).entries.len()
    }

    pub fn has_resources(&self) -> bool {
        self.resource_count() > 0
    }

    /// Age of the oldest resource, zero when there are none.
    pub fn oldest_resource_age(&self, now: Instant) -> Duration {
        lock(&self.resources)
            .entries
            .values()
            .map(|r| now.saturating_duration_since(r.created_at()))
            .max()
            .unwrap_or_default()
    }

    /// Close and drop every resource at least `max_age` old. Resources are
    /// dropped even if closing fails. Returns how many were dropped.
    pub fn close_expired_resources(&self, max_age: Duration, now: Instant) -> usize {
        if max_age.is_zero() {
            return 0;
        }

        let expired: Vec<(String, Arc<dyn SessionResource>)> = {
            let mut resources = lock(&self.resources);
            let ids: Vec<String> = resources
                .entries
                .iter()
                .filter(|(_, r)| now.saturating_duration_since(r.created_at()) >= max_age)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| resources.entries.remove(&id).map(|r| (id, r)))
                .collect()
        };

        for (id, resource) in &expired {
            match resource.close() {
                Ok(()) => debug!(resource = %id, "closed resource past its age limit"),
                Err(e) => debug!(resource = %id, error = %e, "unable to close expired resource"),
            }
        }
        expired.len()
    }

    /// Close every resource and mark the session invalid. Closing is
    /// best-effort: a failure is logged and the rest are still closed.
    /// Returns `false` if the session was already invalidated, in which case
    /// nothing happens.
    pub fn invalidate(&self) -> bool {
        let closing = {
            let mut resources = lock(&self.resources);
            if resources.state == SessionState::Invalidated {
                return false;
            }
            resources.state = SessionState::Invalidated;
            std::mem::take(&mut resources.entries)
        };

        for (id, resource) in closing {
            if let Err(e) = resource.close() {
                warn!(resource = %id, error = %e, "unable to close resource during invalidation");
            }
        }

        self.listeners.dispatch(&AuthEvent::SessionInvalidated {
            username: self.username(),
        });
        true
    }
}
