//! Auth operations against the remote API: login, token refresh, logout,
//! registration, and password management.
//!
//! Flow overview:
//! - `login` exchanges credentials for an access/refresh token pair, stores
//!   both in the session and in durable storage, and fills in the user
//!   profile (embedded in the response or fetched with the fresh token).
//! - `refresh_access_token` trades the stored refresh token for a new access
//!   token; any failure tears the session down via `logout`.
//! - `logout` is best-effort on the wire and unconditional locally: the
//!   session and stored tokens are always cleared, even when the revocation
//!   call fails.
//!
//! Failures of login, registration, and password change are translated into
//! `Error::Auth` with a message extracted from the response body so callers
//! can display them directly (typically through the toast queue).

use crate::config::ClientConfig;
use crate::error::{Error, friendly_message};
use crate::session::{Session, SessionStore, UserProfile};
use crate::storage::{
    ACCESS_TOKEN_KEY, ACCESS_TOKEN_TTL, REFRESH_TOKEN_KEY, REFRESH_TOKEN_TTL, TokenStore,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{Instrument, info_span, warn};

/// Login credentials. Used once per call and never stored.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Registration fields, serialized with the API's wire names.
#[derive(Clone, Serialize)]
pub struct RegistrationRequest {
    #[serde(rename = "user_email")]
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub user_phone: String,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("user_name", &self.user_name)
            .field("user_phone", &self.user_phone)
            .finish()
    }
}

/// Server message returned by the password reset endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ResetConfirmation {
    pub message: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

#[derive(Deserialize)]
struct ResetPasswordResponse {
    data: ResetConfirmation,
}

type LogoutHook = Arc<dyn Fn() + Send + Sync>;

/// Auth operations bound to a session store and a token store. Cheap to
/// clone; clones share the session, storage, and HTTP connection pool.
#[derive(Clone)]
pub struct AuthService {
    http: reqwest::Client,
    config: ClientConfig,
    session: SessionStore,
    storage: Arc<dyn TokenStore>,
    logout_hook: Option<LogoutHook>,
}

impl AuthService {
    /// Build the service around explicit session and storage instances so
    /// tests can substitute isolated ones.
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        config: ClientConfig,
        session: SessionStore,
        storage: Arc<dyn TokenStore>,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            http,
            config,
            session,
            storage,
            logout_hook: None,
        })
    }

    /// Register a callback invoked after every local session teardown,
    /// typically wired to navigation back to the login view.
    #[must_use]
    pub fn with_logout_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.logout_hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Hydrate the session token fields from durable storage, e.g. at
    /// process start. Expired or missing entries leave the session as is.
    pub fn restore_session(&self) {
        if let Some(access) = self.storage.get(ACCESS_TOKEN_KEY) {
            self.session.set_access_token(SecretString::from(access));
        }
        if let Some(refresh) = self.storage.get(REFRESH_TOKEN_KEY) {
            self.session.set_refresh_token(SecretString::from(refresh));
        }
    }

    /// Log in with email and password.
    ///
    /// On success both tokens are stored in the session and persisted. The
    /// user profile comes from the login response when embedded, otherwise
    /// from one authenticated follow-up fetch whose failure is logged and
    /// swallowed; login still succeeds with an empty user in that case.
    ///
    /// # Errors
    /// Returns `Error::Auth` with a message extracted from the response when
    /// the login call itself fails.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, Error> {
        self.session.set_loading(true);
        self.session.clear_error();
        let result = self.login_inner(credentials).await;
        self.session.set_loading(false);

        result.map_err(|err| self.auth_failure(err, "Login failed"))
    }

    async fn login_inner(&self, credentials: &Credentials) -> Result<Session, Error> {
        let url = self.config.endpoint_url("/api/auth/login/");
        let payload = json!({
            "user_email": credentials.email,
            "password": credentials.password,
        });

        let span = info_span!("auth.login", http.method = "POST", url = %url);
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .instrument(span)
            .await?;
        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }

        let login: LoginResponse = response.json().await?;
        let access = SecretString::from(login.access.clone());
        self.session
            .set_tokens(access.clone(), SecretString::from(login.refresh.clone()));
        self.persist_tokens(&login.access, Some(&login.refresh));

        if let Some(user) = login.user {
            self.session.set_user(user);
        } else {
            match self.fetch_profile(&access).await {
                Ok(user) => self.session.set_user(user),
                // login already succeeded; an empty user is acceptable
                Err(err) => warn!("failed to fetch user profile after login: {err}"),
            }
        }

        Ok(self.session.snapshot())
    }

    async fn fetch_profile(&self, access: &SecretString) -> Result<UserProfile, Error> {
        let url = self.config.endpoint_url("/api/users/");
        let span = info_span!("auth.profile", http.method = "GET", url = %url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access.expose_secret())
            .send()
            .instrument(span)
            .await?;
        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Exchange the stored refresh token for a new access token and return
    /// it. The refresh token itself is left unchanged.
    ///
    /// # Errors
    /// Fails with `Error::Auth` when no refresh token is stored (no network
    /// call is made) and with the underlying error when the call fails. Any
    /// failure tears the session down via `logout` before returning.
    pub async fn refresh_access_token(&self) -> Result<SecretString, Error> {
        match self.refresh_inner().await {
            Ok(access) => Ok(access),
            Err(err) => {
                warn!("token refresh failed, logging out: {err}");
                self.logout().await;
                Err(err)
            }
        }
    }

    async fn refresh_inner(&self) -> Result<SecretString, Error> {
        let refresh = self
            .session
            .refresh_token()
            .ok_or_else(|| Error::Auth("No refresh token available".to_string()))?;

        let url = self.config.endpoint_url("/api/auth/login/refresh/");
        let payload = json!({ "refresh": refresh.expose_secret() });

        let span = info_span!("auth.refresh", http.method = "POST", url = %url);
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .instrument(span)
            .await?;
        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }

        let refreshed: RefreshResponse = response.json().await?;
        let access = SecretString::from(refreshed.access.clone());
        self.session.set_access_token(access.clone());
        self.persist_tokens(&refreshed.access, None);

        Ok(access)
    }

    /// Log out: best-effort token revocation on the wire, unconditional
    /// cleanup locally. The session, both stored tokens, and the last error
    /// are cleared on every exit path; a failed revocation call is logged
    /// and swallowed. Never fails.
    pub async fn logout(&self) {
        if let Some(refresh) = self.session.refresh_token() {
            if let Err(err) = self.revoke(&refresh).await {
                warn!("logout request failed: {err}");
            }
        }

        self.session.clear();
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!("failed to clear stored token {key}: {err}");
            }
        }
        if let Some(hook) = &self.logout_hook {
            hook();
        }
    }

    async fn revoke(&self, refresh: &SecretString) -> Result<(), Error> {
        let url = self.config.endpoint_url("/api/auth/logout/");
        let payload = json!({ "refresh": refresh.expose_secret() });

        let mut request = self.http.post(&url).json(&payload);
        if let Some(access) = self.session.access_token() {
            request = request.bearer_auth(access.expose_secret());
        }

        let span = info_span!("auth.logout", http.method = "POST", url = %url);
        let response = request.send().instrument(span).await?;
        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }
        Ok(())
    }

    /// Request a password reset email. Failures propagate uninterpreted.
    /// # Errors
    /// Returns transport or HTTP errors as is.
    pub async fn reset_password(&self, email: &str) -> Result<ResetConfirmation, Error> {
        let url = self.config.endpoint_url("/api/auth/reset-password/");
        let payload = json!({ "user_email": email });

        let span = info_span!("auth.reset_password", http.method = "POST", url = %url);
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .instrument(span)
            .await?;
        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }

        let reset: ResetPasswordResponse = response.json().await?;
        Ok(reset.data)
    }

    /// Change the password of the logged-in user.
    /// # Errors
    /// Returns `Error::Auth` with an extracted message on failure.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), Error> {
        self.session.set_loading(true);
        self.session.clear_error();
        let result = self.change_password_inner(current_password, new_password).await;
        self.session.set_loading(false);

        result.map_err(|err| self.auth_failure(err, "Failed to change password"))
    }

    async fn change_password_inner(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), Error> {
        let url = self.config.endpoint_url("/api/auth/change-password/");
        let payload = json!({
            "current_password": current_password,
            "new_password": new_password,
        });

        let mut request = self.http.post(&url).json(&payload);
        if let Some(access) = self.session.access_token() {
            request = request.bearer_auth(access.expose_secret());
        }

        let span = info_span!("auth.change_password", http.method = "POST", url = %url);
        let response = request.send().instrument(span).await?;
        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }
        Ok(())
    }

    /// Register a new account.
    /// # Errors
    /// Returns `Error::Auth` with an extracted message on failure.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<(), Error> {
        self.session.set_loading(true);
        self.session.clear_error();
        let result = self.register_inner(request).await;
        self.session.set_loading(false);

        result.map_err(|err| self.auth_failure(err, "Registration failed"))
    }

    async fn register_inner(&self, request: &RegistrationRequest) -> Result<(), Error> {
        let url = self.config.endpoint_url("/api/auth/register/");

        let span = info_span!("auth.register", http.method = "POST", url = %url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .instrument(span)
            .await?;
        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }
        Ok(())
    }

    /// Persist tokens to durable storage. Storage is a best-effort cache of
    /// the session; a write failure is logged, not propagated.
    fn persist_tokens(&self, access: &str, refresh: Option<&str>) {
        if let Err(err) = self.storage.put(ACCESS_TOKEN_KEY, access, ACCESS_TOKEN_TTL) {
            warn!("failed to persist access token: {err}");
        }
        if let Some(refresh) = refresh {
            if let Err(err) = self
                .storage
                .put(REFRESH_TOKEN_KEY, refresh, REFRESH_TOKEN_TTL)
            {
                warn!("failed to persist refresh token: {err}");
            }
        }
    }

    /// Translate a failed call into `Error::Auth`, recording the message on
    /// the session error flag for UI binding.
    fn auth_failure(&self, err: Error, default: &str) -> Error {
        let message = friendly_message(&err, default);
        self.session.set_error(&message);
        Error::Auth(message)
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;

    fn service() -> AuthService {
        let config = ClientConfig::new("https://api.example.com").expect("valid config");
        AuthService::new(config, SessionStore::new(), Arc::new(MemoryTokenStore::new()))
            .expect("client should build")
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let credentials = Credentials {
            email: "amira@example.com".to_string(),
            password: "hunter2!".to_string(),
        };
        let printed = format!("{credentials:?}");
        assert!(printed.contains("amira@example.com"));
        assert!(!printed.contains("hunter2!"));

        let request = RegistrationRequest {
            email: "amira@example.com".to_string(),
            password: "hunter2!".to_string(),
            first_name: "Amira".to_string(),
            last_name: "Haddad".to_string(),
            user_name: "amira".to_string(),
            user_phone: "+213555".to_string(),
        };
        assert!(!format!("{request:?}").contains("hunter2!"));
    }

    #[test]
    fn registration_request_uses_wire_field_names() {
        let request = RegistrationRequest {
            email: "amira@example.com".to_string(),
            password: "pw".to_string(),
            first_name: "Amira".to_string(),
            last_name: "Haddad".to_string(),
            user_name: "amira".to_string(),
            user_phone: "+213555".to_string(),
        };
        let value = serde_json::to_value(&request).expect("serializable");
        assert_eq!(value["user_email"], "amira@example.com");
        assert!(value.get("email").is_none());
        assert_eq!(value["first_name"], "Amira");
    }

    #[test]
    fn restore_session_hydrates_from_storage() {
        let auth = service();
        auth.storage
            .put(ACCESS_TOKEN_KEY, "stored-access", ACCESS_TOKEN_TTL)
            .expect("put");
        auth.storage
            .put(REFRESH_TOKEN_KEY, "stored-refresh", REFRESH_TOKEN_TTL)
            .expect("put");

        auth.restore_session();

        assert!(auth.session().access_token().is_some());
        assert!(auth.session().refresh_token().is_some());
        // tokens alone do not make a login
        assert!(!auth.is_logged_in());
    }

    #[test]
    fn restore_session_ignores_missing_entries() {
        let auth = service();
        auth.restore_session();
        assert!(auth.session().access_token().is_none());
        assert!(auth.session().refresh_token().is_none());
    }
}
