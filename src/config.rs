//! Client configuration: the API base URL every request is issued against and
//! the user agent advertised on the wire. Values are public; do not store
//! secrets here.

use crate::error::Error;
use url::Url;

/// Default user agent: `vestibule/<crate version>`.
pub const DEFAULT_USER_AGENT: &str = concat!("vestibule/", env!("CARGO_PKG_VERSION"));

const API_BASE_URL_ENV: &str = "VESTIBULE_API_BASE_URL";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub user_agent: String,
}

impl ClientConfig {
    /// Build a config around the given API base URL.
    /// # Errors
    /// Returns an error if the URL is empty, unparseable, or not http(s).
    pub fn new(api_base_url: &str) -> Result<Self, Error> {
        let base = api_base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(Error::Config("API base URL is empty".to_string()));
        }

        let parsed = Url::parse(base)
            .map_err(|err| Error::Config(format!("invalid API base URL: {err}")))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(Error::Config(format!(
                    "invalid API base URL: unsupported scheme {scheme}"
                )));
            }
        }

        Ok(Self {
            api_base_url: base.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Read the config from `VESTIBULE_API_BASE_URL`.
    /// # Errors
    /// Returns an error if the variable is unset, empty, or not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        let base = std::env::var(API_BASE_URL_ENV)
            .map_err(|_| Error::Config(format!("{API_BASE_URL_ENV} is not set")))?;
        Self::new(&base)
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Join the base URL and an endpoint path, normalizing slashes.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
