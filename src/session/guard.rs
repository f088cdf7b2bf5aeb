//! Route protection. [`RouteGuard::check`] runs before a protected view renders;
//! [`RouteGuard::check_auth_page`] keeps signed-in users off the sign-in and
//! sign-up pages.

use super::{expiry, now_millis, SessionError, SessionStore};
use crate::routes;
use tracing::{debug, info};
use url::form_urlencoded;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect {
        to: String,
        /// Location the user asked for, kept for a post-login return.
        from: Option<String>,
    },
}

impl GuardDecision {
    /// Redirect target including the `from` query, or `None` when rendering.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Render => None,
            Self::Redirect { to, from: None } => Some(to.clone()),
            Self::Redirect { to, from: Some(from) } => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("from", from)
                    .finish();
                Some(format!("{to}?{query}"))
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct RouteGuard {
    store: SessionStore,
    enabled: bool,
}

impl RouteGuard {
    /// Uses the store's configured toggle.
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        let enabled = store.config().guard_enabled;
        Self { store, enabled }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Decides whether the protected view at `location` may render.
    ///
    /// # Errors
    /// Returns the storage error when a rejected session cannot be purged.
    pub fn check(&self, location: &str) -> Result<GuardDecision, SessionError> {
        self.check_at(location, now_millis())
    }

    /// [`RouteGuard::check`] with an explicit clock reading.
    ///
    /// # Errors
    /// Same as [`RouteGuard::check`].
    pub fn check_at(&self, location: &str, now_millis: i64) -> Result<GuardDecision, SessionError> {
        if !self.enabled {
            return Ok(GuardDecision::Render);
        }

        let session = self.store.get();
        if expiry::is_valid(session.as_ref(), self.store.config().ttl_seconds, now_millis) {
            return Ok(GuardDecision::Render);
        }

        if session.is_some() {
            info!(location, "session expired; redirecting to sign-in");
        } else {
            debug!(location, "no session; redirecting to sign-in");
        }
        // Also drops a persisted record the store never managed to read.
        self.store.clear()?;

        Ok(GuardDecision::Redirect {
            to: routes::SIGNIN.to_string(),
            from: Some(location.to_string()),
        })
    }

    /// Sign-in and sign-up pages send an already signed-in user to the dashboard.
    /// This applies whether or not protection is enabled.
    pub fn check_auth_page(&self) -> GuardDecision {
        self.check_auth_page_at(now_millis())
    }

    pub fn check_auth_page_at(&self, now_millis: i64) -> GuardDecision {
        let session = self.store.get();
        if expiry::is_valid(session.as_ref(), self.store.config().ttl_seconds, now_millis) {
            GuardDecision::Redirect {
                to: routes::DASHBOARD.to_string(),
                from: None,
            }
        } else {
            GuardDecision::Render
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        config::SessionConfig,
        session::{
            record,
            storage::{KeyValueStore, MemoryStore, StorageError},
        },
    };
    use std::sync::Arc;

    fn guard_with(raw: Option<&str>, guard_enabled: bool) -> (RouteGuard, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        if let Some(raw) = raw {
            storage.save(record::STORAGE_KEY, raw).unwrap();
        }
        let config = SessionConfig {
            guard_enabled,
            ..SessionConfig::default()
        };
        let store = SessionStore::init(storage.clone(), config);
        (RouteGuard::new(store), storage)
    }

    #[test]
    fn expired_session_redirects_and_purges() {
        let now = 1_700_000_000_000;
        let raw = format!(r#"{{"token":"t","user":{{}},"_expiresAt":{}}}"#, now - 1000);
        let (guard, storage) = guard_with(Some(&raw), true);

        let decision = guard.check_at("/vendors", now).unwrap();
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                to: "/signin".to_string(),
                from: Some("/vendors".to_string()),
            }
        );
        assert_eq!(
            decision.location(),
            Some("/signin?from=%2Fvendors".to_string())
        );
        assert_eq!(storage.load(record::STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn valid_session_renders() {
        let now = 1_700_000_000_000;
        let raw = format!(r#"{{"token":"t","_expiresAt":{}}}"#, now + 60_000);
        let (guard, storage) = guard_with(Some(&raw), true);

        assert_eq!(guard.check_at("/dashboard", now).unwrap(), GuardDecision::Render);
        assert!(storage.load(record::STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn missing_session_redirects() {
        let (guard, _) = guard_with(None, true);
        let decision = guard.check_at("/customers?page=2", 0).unwrap();
        assert_eq!(
            decision.location(),
            Some("/signin?from=%2Fcustomers%3Fpage%3D2".to_string())
        );
    }

    #[test]
    fn corrupt_record_is_purged_on_rejection() {
        let (guard, storage) = guard_with(Some("{broken"), true);
        assert!(matches!(guard.check_at("/dashboard", 0).unwrap(), GuardDecision::Redirect { .. }));
        assert_eq!(storage.load(record::STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn disabled_guard_is_pass_through() {
        let (guard, storage) = guard_with(Some(r#"{"token":"t","_expiresAt":1}"#), false);
        assert!(!guard.enabled());
        assert_eq!(guard.check_at("/vendors", 1_000_000).unwrap(), GuardDecision::Render);
        assert!(storage.load(record::STORAGE_KEY).unwrap().is_some());

        let (guard, _) = guard_with(None, false);
        assert_eq!(guard.check_at("/reports", 0).unwrap(), GuardDecision::Render);
    }

    #[test]
    fn auth_pages_redirect_signed_in_users() {
        let now = 1_700_000_000_000;
        let raw = format!(r#"{{"token":"t","_expiresAt":{}}}"#, now + 60_000);
        let (guard, _) = guard_with(Some(&raw), false);
        assert_eq!(
            guard.check_auth_page_at(now).location(),
            Some("/dashboard".to_string())
        );
        assert_eq!(guard.check_auth_page_at(now + 120_000), GuardDecision::Render);

        let (guard, _) = guard_with(None, true);
        assert_eq!(guard.check_auth_page_at(now), GuardDecision::Render);
    }

    struct UndeletableStore(MemoryStore);

    impl KeyValueStore for UndeletableStore {
        fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.load(key)
        }

        fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.save(key, value)
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("permission denied")))
        }
    }

    #[test]
    fn purge_failure_is_reported() {
        let now = 1_700_000_000_000;
        let storage = UndeletableStore(MemoryStore::new());
        storage
            .save(
                record::STORAGE_KEY,
                &format!(r#"{{"token":"t","_expiresAt":{}}}"#, now - 1000),
            )
            .unwrap();
        let store = SessionStore::init(Arc::new(storage), SessionConfig::default());
        let guard = RouteGuard::new(store.clone());

        assert!(matches!(
            guard.check_at("/vendors", now),
            Err(SessionError::Storage(_))
        ));
        assert_eq!(store.get().map(|s| s.token), Some("t".to_string()));
    }
}
