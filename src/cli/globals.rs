use crate::{
    api::ApiClient,
    config::{ApiConfig, SessionConfig},
    session::{SessionStore, storage::FileStore},
};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc};

/// Options shared by every subcommand.
#[derive(Clone, Debug)]
pub struct GlobalArgs {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub session_dir: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api: ApiConfig, session: SessionConfig, session_dir: PathBuf) -> Self {
        Self {
            api,
            session,
            session_dir,
        }
    }

    /// Opens the session store backed by `session_dir`, hydrating it.
    #[must_use]
    pub fn session_store(&self) -> SessionStore {
        let storage = Arc::new(FileStore::new(self.session_dir.clone()));
        SessionStore::init(storage, self.session)
    }

    /// Builds an API client that reads bearer tokens from `store`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn api_client(&self, store: SessionStore) -> Result<ApiClient> {
        Ok(ApiClient::new(self.api.clone())?.with_session(store))
    }
}
