//! Client-side authentication toolkit for a JSON REST auth API.
//!
//! Flow overview:
//! - [`ClientConfig`] names the API base URL and user agent.
//! - [`SessionStore`] holds the current user, both tokens, and the
//!   loading/error flags; it is a cheap-clone handle shared by everything.
//! - [`AuthService`] implements login, token refresh, logout, registration,
//!   and password management against the remote API, persisting tokens in a
//!   [`TokenStore`].
//! - [`ApiClient`] wraps arbitrary JSON calls with bearer auth and a single
//!   refresh-and-retry policy for 401 responses; [`global`] exposes an
//!   optional process-wide handle running the same policy.
//! - [`assess`](password::assess) scores password strength; [`ToastQueue`]
//!   queues transient notifications with timed expiry.
//!
//! Tokens are held as [`secrecy::SecretString`] and redacted from `Debug`
//! output; durable storage keeps them in the clear by design.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod global;
pub mod password;
pub mod session;
pub mod storage;
pub mod toast;

pub use auth::{AuthService, Credentials, RegistrationRequest, ResetConfirmation};
pub use client::{ApiClient, RequestOptions};
pub use config::ClientConfig;
pub use error::{Error, friendly_message};
pub use password::{PasswordAssessment, Strength, assess};
pub use session::{Session, SessionStore, UserProfile};
pub use storage::{
    ACCESS_TOKEN_KEY, ACCESS_TOKEN_TTL, FileTokenStore, MemoryTokenStore, REFRESH_TOKEN_KEY,
    REFRESH_TOKEN_TTL, TokenStore,
};
pub use toast::{DEFAULT_TOAST_DURATION, Toast, ToastKind, ToastQueue};
