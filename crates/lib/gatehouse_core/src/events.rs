//! Authentication and session lifecycle events.
//!
//! Listeners observe; they cannot veto. A failing listener is logged and the
//! remaining listeners still run.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Something that happened to a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    AuthenticationSucceeded {
        username: String,
        provider: String,
        remote_addr: Option<String>,
    },
    AuthenticationFailed {
        username: Option<String>,
        remote_addr: Option<String>,
    },
    SessionInvalidated {
        username: String,
    },
}

/// Listener failure.
#[derive(Debug, Error)]
#[error("Listener error: {0}")]
pub struct ListenerError(pub String);

/// Receives [`AuthEvent`]s.
pub trait EventListener: Send + Sync {
    fn handle_event(&self, event: &AuthEvent) -> Result<(), ListenerError>;
}

/// Fans an event out to an ordered list of listeners.
#[derive(Clone, Default)]
pub struct Listeners {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl Listeners {
    pub fn new(listeners: Vec<Arc<dyn EventListener>>) -> Self {
        Self { listeners }
    }

    /// No listeners at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener, logging failures.
    pub fn dispatch(&self, event: &AuthEvent) {
        for listener in &self.listeners {
            if let Err(e) = listener.handle_event(event) {
                error!(error = %e, ?event, "an event listener failed");
            }
        }
    }
}

impl EventListener for Listeners {
    fn handle_event(&self, event: &AuthEvent) -> Result<(), ListenerError> {
        self.dispatch(event);
        Ok(())
    }
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl EventListener for LoggingListener {
    fn handle_event(&self, event: &AuthEvent) -> Result<(), ListenerError> {
        match event {
            AuthEvent::AuthenticationSucceeded {
                username,
                provider,
                remote_addr,
            } => info!(
                %username,
                %provider,
                remote_addr = remote_addr.as_deref().unwrap_or("unknown"),
                "user successfully authenticated"
            ),
            AuthEvent::AuthenticationFailed {
                username: Some(username),
                remote_addr,
            } => warn!(
                %username,
                remote_addr = remote_addr.as_deref().unwrap_or("unknown"),
                "authentication attempt failed"
            ),
            AuthEvent::AuthenticationFailed {
                username: None,
                remote_addr,
            } => debug!(
                remote_addr = remote_addr.as_deref().unwrap_or("unknown"),
                "anonymous authentication attempt failed"
            ),
            AuthEvent::SessionInvalidated { username } => {
                info!(%username, "session invalidated")
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<AuthEvent>>);

    impl EventListener for Recorder {
        fn handle_event(&self, event: &AuthEvent) -> Result<(), ListenerError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    impl EventListener for Failing {
        fn handle_event(&self, _event: &AuthEvent) -> Result<(), ListenerError> {
            Err(ListenerError("boom".into()))
        }
    }

    #[test]
    fn failing_listener_does_not_stop_the_rest() {
        let recorder = Arc::new(Recorder::default());
        let listeners = Listeners::new(vec![
            Arc::new(Failing),
            Arc::new(LoggingListener),
            recorder.clone(),
        ]);
        let event = AuthEvent::SessionInvalidated {
            username: "alice".into(),
        };
        listeners.dispatch(&event);
        assert_eq!(*recorder.0.lock().unwrap(), vec![event]);
    }

    #[test]
    fn empty_listener_set_is_a_no_op() {
        let listeners = Listeners::none();
        assert!(listeners.is_empty());
        listeners.dispatch(&AuthEvent::AuthenticationFailed {
            username: None,
            remote_addr: None,
        });
    }
}
