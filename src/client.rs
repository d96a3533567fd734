//! Generic JSON client for authenticated API calls.
//!
//! Every request goes through one shared policy, `send_with_refresh`: attach
//! the bearer token when the call requires auth, and on a 401 response
//! refresh the access token once and re-issue the original request once with
//! the new token. The retried outcome is returned unmodified, so a second
//! 401 passes through rather than looping; a refresh failure (which already
//! tore the session down) is returned to the original caller in place of the
//! 401. Requests marked as not requiring auth never enter the policy.

use crate::auth::AuthService;
use crate::error::Error;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Instrument, debug, info_span};

/// Per-request options. Defaults to an authenticated request with no extra
/// headers.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub requires_auth: bool,
    pub headers: Option<HeaderMap>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            requires_auth: true,
            headers: None,
        }
    }
}

impl RequestOptions {
    /// Options for endpoints that take no bearer token, e.g. login.
    #[must_use]
    pub fn public() -> Self {
        Self {
            requires_auth: false,
            headers: None,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// JSON API client sharing the auth service's session, storage, and HTTP
/// connection pool. Cheap to clone; clones observe the same session.
#[derive(Clone, Debug)]
pub struct ApiClient {
    auth: AuthService,
}

impl ApiClient {
    #[must_use]
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Issue a JSON request and decode the response body. An empty 2xx body
    /// decodes as JSON `null`, so `T = ()` works for bodyless endpoints.
    /// # Errors
    /// Returns `Error::Http` for non-2xx responses (after the 401 policy has
    /// run), `Error::Transport` for network failures, and the refresh
    /// failure when a 401-triggered refresh fails.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<T, Error> {
        let url = self.auth.config().endpoint_url(endpoint);
        let response = self.send_with_refresh(&method, &url, body, options).await?;

        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            Ok(serde_json::from_value(Value::Null)?)
        } else {
            Ok(serde_json::from_slice(&bytes)?)
        }
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<T, Error> {
        self.request(Method::GET, endpoint, None, options).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<T, Error> {
        self.request(Method::POST, endpoint, body, options).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<T, Error> {
        self.request(Method::PUT, endpoint, body, options).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn patch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<T, Error> {
        self.request(Method::PATCH, endpoint, body, options).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<T, Error> {
        self.request(Method::DELETE, endpoint, None, options).await
    }

    /// The shared refresh-and-retry policy. One refresh attempt, one retry,
    /// no re-entry: a 401 on the retried call is returned as a plain
    /// response.
    async fn send_with_refresh(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<reqwest::Response, Error> {
        let token = if options.requires_auth {
            self.auth.session().access_token()
        } else {
            None
        };

        let response = self.send_once(method, url, body, options, token.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !options.requires_auth {
            return Ok(response);
        }

        debug!("401 from {url}, refreshing access token and retrying once");
        let fresh = self.auth.refresh_access_token().await?;
        self.send_once(method, url, body, options, Some(&fresh)).await
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        token: Option<&SecretString>,
    ) -> Result<reqwest::Response, Error> {
        let mut request = self
            .auth
            .http()
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(headers) = &options.headers {
            request = request.headers(headers.clone());
        }
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let span = info_span!("api.request", http.method = %method, url = %url);
        Ok(request.send().instrument(span).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_require_auth() {
        let options = RequestOptions::default();
        assert!(options.requires_auth);
        assert!(options.headers.is_none());
    }

    #[test]
    fn public_options_skip_auth() {
        assert!(!RequestOptions::public().requires_auth);
    }

    #[test]
    fn with_headers_attaches_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "abc123".parse().expect("valid header"));
        let options = RequestOptions::default().with_headers(headers);
        assert_eq!(
            options
                .headers
                .as_ref()
                .and_then(|h| h.get("x-request-id"))
                .and_then(|v| v.to_str().ok()),
            Some("abc123")
        );
    }
}
