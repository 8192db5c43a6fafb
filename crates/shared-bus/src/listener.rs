//! # Listeners
//!
//! Subscription side of the dispatcher: handler type, options, and the handle
//! returned by `on` that removes the listener again.

use crate::dispatcher::DispatcherInner;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::debug;

/// Failure reported by an event handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Convert a caught panic payload into a handler error.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_string());
        Self::new(format!("panic: {message}"))
    }
}

impl From<&str> for HandlerError {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for HandlerError {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// Handler signature: `(data, event_name)`.
pub(crate) type Handler = Arc<dyn Fn(&Value, &str) -> HandlerResult + Send + Sync>;

/// Monotonic listener identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Subscription options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Higher runs first.
    pub priority: i32,
    /// Removed after its first invocation.
    pub once: bool,
}

impl ListenerOptions {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            once: false,
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// A registered listener.
#[derive(Clone)]
pub(crate) struct Listener {
    pub id: ListenerId,
    /// Key the listener is registered under (event name or wildcard pattern).
    pub key: String,
    pub priority: i32,
    pub once: bool,
    pub handler: Handler,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

/// Handle returned by `EventDispatcher::on`.
///
/// Dropping the handle keeps the listener registered; call
/// [`Unsubscribe::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Unsubscribe {
    inner: Weak<RwLock<DispatcherInner>>,
    event_name: String,
    id: ListenerId,
}

impl Unsubscribe {
    pub(crate) fn new(inner: &Arc<RwLock<DispatcherInner>>, event_name: &str, id: ListenerId) -> Self {
        Self {
            inner: Arc::downgrade(inner),
            event_name: event_name.to_string(),
            id,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Remove the listener. Returns false if it was already gone or the
    /// dispatcher has been dropped.
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            debug!(listener = %self.id, "Dispatcher dropped before unsubscribe");
            return false;
        };
        let removed = inner.write().remove_listeners(&self.event_name, Some(self.id));
        removed > 0
    }
}
