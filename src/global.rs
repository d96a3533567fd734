//! Process-wide shared `ApiClient`. Feature code that has no way to thread a
//! client through (framework callbacks, detached tasks) can use the handle
//! installed at startup; it is the same `ApiClient` type, so it runs the
//! identical refresh-and-retry policy. Tests should construct their own
//! `ApiClient` with isolated session and storage instances instead of
//! installing one here.

use crate::client::ApiClient;
use crate::error::Error;
use std::sync::OnceLock;

static SHARED: OnceLock<ApiClient> = OnceLock::new();

/// Install the shared client. The first install wins for the lifetime of the
/// process.
/// # Errors
/// Returns an error if a client is already installed.
pub fn install(client: ApiClient) -> Result<(), Error> {
    SHARED
        .set(client)
        .map_err(|_| Error::Config("shared API client already installed".to_string()))
}

/// The installed client, or `None` before `install` has run.
#[must_use]
pub fn shared() -> Option<&'static ApiClient> {
    SHARED.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthService;
    use crate::config::ClientConfig;
    use crate::session::SessionStore;
    use crate::storage::MemoryTokenStore;
    use std::sync::Arc;

    fn client() -> ApiClient {
        let config = ClientConfig::new("https://api.example.com").expect("valid config");
        let auth = AuthService::new(config, SessionStore::new(), Arc::new(MemoryTokenStore::new()))
            .expect("client should build");
        ApiClient::new(auth)
    }

    // one test: the static is process-wide, so install-order assertions
    // cannot be split across test functions
    #[test]
    fn install_is_first_wins() {
        assert!(shared().is_none());
        install(client()).expect("first install succeeds");
        assert!(shared().is_some());
        assert!(matches!(install(client()), Err(Error::Config(_))));
    }
}
