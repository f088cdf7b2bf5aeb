//! Session state for the console. The store hydrates once from its storage
//! scope, exposes the current session to the expiry scheduler, the route guard
//! and the API client, and is the only writer of the persisted record. Every
//! mutation persists before it becomes visible in memory, so the two never
//! disagree once a call returns.
//!
//! Flow Overview: the credential issuer calls [`SessionStore::set_session`] with
//! the login payload; views arm an [`expiry::ExpiryTimer`] and consult the
//! [`guard::RouteGuard`]; logout, expiry and guard rejections all end in
//! [`SessionStore::clear`].

pub mod expiry;
pub mod guard;
pub mod record;
pub mod storage;
pub mod token;

use crate::config::SessionConfig;
use serde_json::{Map, Value};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};
use storage::{KeyValueStore, StorageError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("login response did not include a token")]
    MissingToken,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Bearer token, user record and absolute expiry.
///
/// `user` is passed through untouched. `expires_at` mirrors the persisted
/// `_expiresAt` field and may be missing for records written by older builds.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: Value,
    pub expires_at: Option<i64>,
}

impl From<record::SessionRecord> for Session {
    fn from(record: record::SessionRecord) -> Self {
        Self {
            token: record.token,
            user: record.user,
            expires_at: record.expires_at,
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

struct Inner {
    storage: Arc<dyn KeyValueStore>,
    config: SessionConfig,
    current: Mutex<Option<Session>>,
    changes: watch::Sender<u64>,
}

/// Authoritative session state, shared by cloning.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.inner.config)
            .field("authenticated", &self.get().is_some())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates the store and hydrates it from `storage` exactly once. A missing,
    /// unreadable or corrupt record starts the store unauthenticated.
    pub fn init(storage: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
        let current = match storage.load(record::STORAGE_KEY) {
            Ok(Some(raw)) => {
                let parsed = record::parse(&raw).map(Session::from);
                if parsed.is_none() {
                    debug!("ignoring unreadable persisted session");
                }
                parsed
            }
            Ok(None) => None,
            Err(err) => {
                warn!("failed to read persisted session: {err}");
                None
            }
        };

        let (changes, _) = watch::channel(0);

        Self {
            inner: Arc::new(Inner {
                storage,
                config,
                current: Mutex::new(current),
                changes,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.inner.config
    }

    /// Current session, or `None` when logged out. Validity is not checked here;
    /// see [`expiry::is_valid`] and the route guard.
    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.lock().clone()
    }

    /// Replaces the session with the one carried by a login payload (`{token, user, ...}`).
    ///
    /// # Errors
    /// Returns `SessionError::MissingToken` when the payload has no usable token,
    /// or a storage/encoding error when persisting fails. The store is left
    /// unchanged on error.
    pub fn set_session(&self, payload: &Map<String, Value>) -> Result<Session, SessionError> {
        self.set_session_at(payload, now_millis())
    }

    /// [`SessionStore::set_session`] with an explicit clock reading.
    ///
    /// # Errors
    /// Same as [`SessionStore::set_session`].
    pub fn set_session_at(
        &self,
        payload: &Map<String, Value>,
        now_millis: i64,
    ) -> Result<Session, SessionError> {
        let parsed = record::from_value(&Value::Object(payload.clone()))
            .ok_or(SessionError::MissingToken)?;

        // A JWT `exp` claim wins over the configured lifetime.
        let expires_at = token::expiry_millis(&parsed.token)
            .unwrap_or_else(|| now_millis.saturating_add(self.inner.config.ttl_millis()));
        let raw = serde_json::to_string(&record::build(payload, expires_at))?;

        let mut current = self.lock();
        self.inner.storage.save(record::STORAGE_KEY, &raw)?;

        let session = Session {
            token: parsed.token,
            user: parsed.user,
            expires_at: Some(expires_at),
        };
        *current = Some(session.clone());
        self.inner.changes.send_modify(|generation| *generation += 1);
        drop(current);

        info!(expires_at, "session stored");
        Ok(session)
    }

    /// Wipes the persisted record and then the in-memory session. Idempotent.
    ///
    /// # Errors
    /// Returns the storage error when the record cannot be removed; the
    /// in-memory session is kept so it still matches what is on disk.
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut current = self.lock();
        self.clear_locked(&mut current)
    }

    /// Clears only if nothing replaced or cleared the session since `generation`.
    /// Returns whether a session was cleared.
    pub(crate) fn clear_if_generation(&self, generation: u64) -> Result<bool, SessionError> {
        let mut current = self.lock();
        if *self.inner.changes.borrow() != generation || current.is_none() {
            return Ok(false);
        }
        self.clear_locked(&mut current)?;
        Ok(true)
    }

    /// Monotonic counter bumped on every set and every effective clear.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.inner.changes.borrow()
    }

    /// Receiver notified whenever the session is replaced or cleared.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    fn clear_locked(&self, current: &mut Option<Session>) -> Result<(), SessionError> {
        // Persisted state may exist without an in-memory session (stale record);
        // remove it regardless.
        if let Err(err) = self.inner.storage.remove(record::STORAGE_KEY) {
            warn!("failed to remove persisted session: {err}");
            return Err(err.into());
        }
        if current.take().is_some() {
            self.inner.changes.send_modify(|generation| *generation += 1);
            info!("session cleared");
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
