mod guard;

use std::{collections::HashMap, future::Future, sync::Arc};

use axum::{extract::FromRequestParts, http::request::Parts, response::{IntoResponse, Response}};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::AppError;

pub use guard::CurrentUser;
pub(crate) use guard::safe_return_url;

/// The one key the logged in user lives under.
pub const LOGGED_IN_USER: &str = "logged_in_user";

/// The part of a user that is safe to keep on the client: no password, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl SessionUser {
    pub fn is_valid(&self) -> bool {
        !self.id.is_nil() && !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }

    /// `None` for anything that is not a complete record; extra fields are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<Self>(raw)
            .ok()
            .filter(Self::is_valid)
    }
}

/// Durable key/value storage the session record is persisted to.
pub trait SessionStorage: Send + Sync {
    fn read(&self, key: &str) -> impl Future<Output = anyhow::Result<Option<String>>> + Send;
    fn write(&self, key: &str, value: String) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
    /// Issues a fresh storage identity, keeping the contents.
    fn rotate(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl SessionStorage for Session {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get::<Value>(key).await?.map(|value| match value {
            Value::String(raw) => raw,
            other => other.to_string(),
        }))
    }

    async fn write(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.insert(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.remove_value(key).await?;
        Ok(())
    }

    async fn rotate(&self) -> anyhow::Result<()> {
        self.cycle_id().await?;
        Ok(())
    }
}

/// Process-local storage; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage(Arc<Mutex<HashMap<String, String>>>);

impl SessionStorage for MemoryStorage {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.0.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.0.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.0.lock().await.remove(key);
        Ok(())
    }

    // nothing identifies a process-local map
    async fn rotate(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-memory session state kept in lockstep with its durable storage.
///
/// Every `set` writes storage first and then publishes the new value, so a
/// subscriber never sees a session the storage does not hold.
pub struct SessionStore<S> {
    storage: S,
    current: watch::Sender<Option<SessionUser>>,
}

impl<S: SessionStorage> SessionStore<S> {
    /// Restores the saved session. Corrupt or partial records are deleted and
    /// the store starts anonymous.
    pub async fn load(storage: S) -> anyhow::Result<Self> {
        let user = match storage.read(LOGGED_IN_USER).await? {
            None => None,
            Some(raw) => match SessionUser::parse(&raw) {
                Some(user) => {
                    debug!(user_id = %user.id, "restored session");
                    Some(user)
                }
                None => {
                    warn!("discarding malformed stored session");
                    storage.remove(LOGGED_IN_USER).await?;
                    None
                }
            },
        };

        Ok(Self {
            storage,
            current: watch::channel(user).0,
        })
    }

    pub fn current(&self) -> Option<SessionUser> {
        self.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// An invalid user is treated like `None`. Switching to a different user
    /// rotates the storage identity first, so an id handed out before login
    /// never carries an authenticated session.
    pub async fn set(&self, user: Option<SessionUser>) -> anyhow::Result<()> {
        let user = user.filter(SessionUser::is_valid);
        let current_id = self.current.borrow().as_ref().map(|current| current.id);
        match &user {
            Some(user) => {
                if current_id != Some(user.id) {
                    self.storage.rotate().await?;
                }
                self.storage
                    .write(LOGGED_IN_USER, serde_json::to_string(user)?)
                    .await?
            }
            None => self.storage.remove(LOGGED_IN_USER).await?,
        }
        self.current.send_replace(user);
        Ok(())
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.set(None).await
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.current.subscribe()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<St: Send + Sync> FromRequestParts<St> for SessionStore<Session> {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        SessionStore::load(session)
            .await
            .map_err(|e| AppError(e).into_response())
    }
}
