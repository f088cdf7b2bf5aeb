//! Transient user-facing notifications (toasts). The session core only pushes
//! the "Session expired" notice; the CLI drains and prints whatever is queued.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::{info, warn};
use ulid::Ulid;

/// Default display time for a notification.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Success,
    Error,
    Info,
    Warning,
}

impl Variant {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub variant: Variant,
    pub title: String,
    pub message: String,
    /// `None` keeps the notification until it is dismissed.
    pub timeout: Option<Duration>,
}

impl Notification {
    #[must_use]
    pub fn new(variant: Variant, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: format!("ntf_{}", Ulid::new()),
            variant,
            title: title.into(),
            message: message.into(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Variant::Info, title, message)
    }

    #[must_use]
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Variant::Success, title, message)
    }

    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Variant::Error, title, message)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Shared notification queue.
#[derive(Clone, Debug, Default)]
pub struct Notifications {
    queue: Arc<Mutex<Vec<Notification>>>,
}

impl Notifications {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `notification` and returns its id.
    pub fn push(&self, notification: Notification) -> String {
        match notification.variant {
            Variant::Error | Variant::Warning => warn!(
                variant = notification.variant.as_str(),
                title = %notification.title,
                "{}",
                notification.message
            ),
            Variant::Success | Variant::Info => info!(
                variant = notification.variant.as_str(),
                title = %notification.title,
                "{}",
                notification.message
            ),
        }
        let id = notification.id.clone();
        self.lock().push(notification);
        id
    }

    /// Dismisses a notification. Returns false if it was already gone.
    pub fn remove(&self, id: &str) -> bool {
        let mut queue = self.lock();
        let before = queue.len();
        queue.retain(|notification| notification.id != id);
        queue.len() != before
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Takes every queued notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_remove_and_drain() {
        let notifications = Notifications::new();
        let first = notifications.push(Notification::info("Session expired", "Sign in again."));
        let second = notifications.push(Notification::error("Login failed", "Invalid OTP"));
        assert_ne!(first, second);
        assert!(first.starts_with("ntf_"));

        assert!(notifications.remove(&first));
        assert!(!notifications.remove(&first));

        let drained = notifications.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].message, "Invalid OTP");
        assert!(notifications.snapshot().is_empty());
    }

    #[test]
    fn default_timeout_and_sticky() {
        let notification = Notification::success("Saved", "Done");
        assert_eq!(notification.timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(notification.with_timeout(None).timeout, None);
    }

    #[test]
    fn clones_share_the_queue() {
        let notifications = Notifications::new();
        let other = notifications.clone();
        other.push(Notification::info("a", "b"));
        assert_eq!(notifications.snapshot().len(), 1);
        notifications.clear();
        assert!(other.snapshot().is_empty());
    }
}
