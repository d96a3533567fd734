//! In-memory session state shared by the auth operations and the HTTP client.
//!
//! `SessionStore` is a cheap-clone handle over one shared state block: the
//! current user, both tokens, and the loading/error flags UI code binds to.
//! Locks are never held across an await point, so concurrent refreshes can
//! interleave but degrade to last-writer-wins on the token fields rather
//! than corrupting state. Tokens are wrapped in `SecretString` and redacted
//! from `Debug` output.

use secrecy::SecretString;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Authenticated user as returned by the profile endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: String,
}

#[derive(Default)]
struct SessionState {
    user: Option<UserProfile>,
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    loading: bool,
    last_error: Option<String>,
}

/// Shared handle to the session state. Clones observe the same session.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store both tokens in one write, as login does.
    pub fn set_tokens(&self, access: SecretString, refresh: SecretString) {
        let mut state = self.write();
        state.access_token = Some(access);
        state.refresh_token = Some(refresh);
    }

    /// Overwrite only the access token, as refresh does.
    pub fn set_access_token(&self, access: SecretString) {
        self.write().access_token = Some(access);
    }

    pub fn set_refresh_token(&self, refresh: SecretString) {
        self.write().refresh_token = Some(refresh);
    }

    pub fn set_user(&self, user: UserProfile) {
        self.write().user = Some(user);
    }

    pub fn set_loading(&self, loading: bool) {
        self.write().loading = loading;
    }

    pub fn set_error(&self, message: &str) {
        self.write().last_error = Some(message.to_string());
    }

    pub fn clear_error(&self) {
        self.write().last_error = None;
    }

    /// Drop the user, both tokens, and the last error. The loading flag is
    /// left alone; it tracks an in-flight call, not session validity.
    pub fn clear(&self) {
        let mut state = self.write();
        state.user = None;
        state.access_token = None;
        state.refresh_token = None;
        state.last_error = None;
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read().access_token.clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read().refresh_token.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    /// True iff both the user and the access token are present. A session
    /// where the post-login profile fetch failed has a token but no user and
    /// does not count as logged in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        let state = self.read();
        state.user.is_some() && state.access_token.is_some()
    }

    /// Point-in-time copy of the session fields.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        let state = self.read();
        Session {
            user: state.user.clone(),
            access_token: state.access_token.clone(),
            refresh_token: state.refresh_token.clone(),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionStore")
            .field("user", &state.user)
            .field("access_token", &state.access_token.as_ref().map(|_| "***"))
            .field(
                "refresh_token",
                &state.refresh_token.as_ref().map(|_| "***"),
            )
            .field("loading", &state.loading)
            .field("last_error", &state.last_error)
            .finish()
    }
}

/// Snapshot of the session, returned by login and `SessionStore::snapshot`.
#[derive(Clone)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}
