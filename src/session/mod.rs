//! Session management for authentication

mod storage;

use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::Result;

pub use storage::*;

/// Storage key holding the raw bearer token
pub const TOKEN_KEY: &str = "auth-token";

/// Storage key holding the serialized login/register response
pub const USER_INFO_KEY: &str = "userInfo";

const EVENT_CAPACITY: usize = 16;

/// Session data
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The bearer token
    pub token: String,

    /// The login/register response as returned by the backend
    pub user: Value,
}

impl Session {
    /// Create a new session
    pub fn new(token: impl Into<String>, user: Value) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Display name from the profile blob, if the backend sent one
    pub fn username(&self) -> Option<&str> {
        self.user
            .get("username")
            .or_else(|| self.user.get("name"))
            .and_then(Value::as_str)
    }

    /// Email from the profile blob, if the backend sent one
    pub fn email(&self) -> Option<&str> {
        self.user.get("email").and_then(Value::as_str)
    }
}

/// Changes to the stored session that views react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login or registration stored a new session
    Established,
    /// The backend rejected the stored token and the session was dropped
    Invalidated,
    /// The user logged out
    LoggedOut,
}

/// Session persistence on top of an injected [`Storage`].
///
/// Cloning is cheap and every clone shares the storage and the event channel.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create a store over the given storage
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { storage, events }
    }

    /// Store backed by [`MemoryStorage`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Persist both the token and the profile, overwriting prior values.
    ///
    /// If the profile cannot be written the previous token is put back, so the
    /// two keys never describe different sessions.
    pub fn save(&self, session: &Session) -> Result<()> {
        let user_info = serde_json::to_string(&session.user)?;
        let previous = self.storage.get_item(TOKEN_KEY)?;
        self.storage.set_item(TOKEN_KEY, &session.token)?;
        if let Err(e) = self.storage.set_item(USER_INFO_KEY, &user_info) {
            warn!("Failed to store {}, restoring previous token: {}", USER_INFO_KEY, e);
            let restored = match previous {
                Some(token) => self.storage.set_item(TOKEN_KEY, &token),
                None => self.storage.remove_item(TOKEN_KEY),
            };
            if let Err(restore) = restored {
                warn!("Failed to restore {}: {}", TOKEN_KEY, restore);
            }
            return Err(e);
        }
        debug!("Session saved");
        self.publish(SessionEvent::Established);
        Ok(())
    }

    /// Read the stored session.
    ///
    /// The token comes from `auth-token`, falling back to the `token` field of
    /// the `userInfo` blob. An empty token counts as no session.
    pub fn load(&self) -> Result<Option<Session>> {
        let user = match self.storage.get_item(USER_INFO_KEY)? {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Error parsing {}: {}", USER_INFO_KEY, e);
                    None
                }
            },
            None => None,
        };

        let token = match self.storage.get_item(TOKEN_KEY)? {
            Some(token) if !token.is_empty() => Some(token),
            _ => user
                .as_ref()
                .and_then(|u| u.get("token"))
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        };

        Ok(token.map(|token| Session::new(token, user.unwrap_or(Value::Null))))
    }

    /// The stored token alone
    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.load()?.map(|s| s.token))
    }

    /// Remove both entries
    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(TOKEN_KEY)?;
        self.storage.remove_item(USER_INFO_KEY)?;
        debug!("Session cleared");
        Ok(())
    }

    /// Drop the session after the backend rejected it and tell observers
    pub fn invalidate(&self) -> Result<()> {
        self.clear()?;
        self.publish(SessionEvent::Invalidated);
        Ok(())
    }

    /// Drop the session on user request and tell observers
    pub fn logout(&self) -> Result<()> {
        self.clear()?;
        self.publish(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine; nothing is mounted that cares.
        let _ = self.events.send(event);
    }
}
