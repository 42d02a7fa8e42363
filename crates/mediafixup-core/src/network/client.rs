//! HTTP client for the Plex endpoints.
//!
//! Provides a wrapper around reqwest with:
//! - Plex client identification headers on every request
//! - JSON accept header and typed response decoding
//! - Configurable timeouts
//! - Status checking that turns error responses into [`FixupError::Network`]

use crate::config::{AppConfig, PlexConfig};
use crate::{FixupError, Result};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// HTTP client carrying the Plex identification headers.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client with the default timeout.
    pub fn new(client_identifier: &str) -> Result<Self> {
        Self::with_timeout(client_identifier, PlexConfig::REQUEST_TIMEOUT)
    }

    /// Create a new HTTP client with a custom default timeout.
    pub fn with_timeout(client_identifier: &str, timeout: Duration) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            "X-Plex-Product",
            header::HeaderValue::from_static(PlexConfig::PRODUCT),
        );
        headers.insert(
            "X-Plex-Version",
            header::HeaderValue::from_static(AppConfig::VERSION),
        );
        headers.insert(
            "X-Plex-Client-Identifier",
            header::HeaderValue::from_str(client_identifier).map_err(|e| FixupError::Config {
                message: format!("Invalid client identifier {:?}: {}", client_identifier, e),
            })?,
        );

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", AppConfig::APP_NAME, AppConfig::VERSION))
            .default_headers(headers)
            .build()
            .map_err(|e| FixupError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self { client })
    }

    /// Make a GET request and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&str>,
        query: &[(String, String)],
    ) -> Result<T> {
        let request = with_token(self.client.get(url), token).query(query);
        let response = self.send("GET", url, request).await?;
        decode_json(response, url).await
    }

    /// Make a GET request with a custom timeout, only checking the status.
    pub async fn probe(&self, url: &str, token: Option<&str>, timeout: Duration) -> Result<()> {
        let request = with_token(self.client.get(url), token).timeout(timeout);
        self.send("GET", url, request).await.map(|_| ())
    }

    /// Make a PUT request with query parameters.
    pub async fn put(&self, url: &str, token: Option<&str>, query: &[(String, String)]) -> Result<()> {
        let request = with_token(self.client.put(url), token).query(query);
        self.send("PUT", url, request).await.map(|_| ())
    }

    /// Make a POST request authenticated with username and password.
    pub async fn post_basic_auth<T: DeserializeOwned>(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<T> {
        let request = self.client.post(url).basic_auth(username, Some(password));
        let response = self.send("POST", url, request).await?;
        decode_json(response, url).await
    }

    /// Check if an HTTP status code indicates rejected credentials.
    pub fn is_auth_failure(status: StatusCode) -> bool {
        matches!(status.as_u16(), 401 | 403)
    }

    async fn send(&self, method: &str, url: &str, request: RequestBuilder) -> Result<Response> {
        debug!("{} {}", method, url);

        let response = request.send().await.map_err(|e| FixupError::Network {
            message: format!("{} {} failed: {}", method, url, e),
            source: Some(e),
        })?;

        check_response_status(response, method, url)
    }
}

fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header("X-Plex-Token", token),
        None => request,
    }
}

fn check_response_status(response: Response, method: &str, url: &str) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let reason = if HttpClient::is_auth_failure(status) {
        "not authorized"
    } else {
        status.canonical_reason().unwrap_or("unexpected status")
    };
    Err(FixupError::Network {
        message: format!(
            "{} {} returned HTTP {} ({})",
            method,
            strip_query(url),
            status.as_u16(),
            reason
        ),
        source: None,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    let body = response.text().await.map_err(|e| FixupError::Network {
        message: format!("Failed to read response from {}: {}", strip_query(url), e),
        source: Some(e),
    })?;

    serde_json::from_str(&body).map_err(|e| FixupError::Json {
        message: format!("Invalid JSON response from {}: {}", strip_query(url), e),
        source: Some(e),
    })
}

/// URL without its query string, for messages that must not leak tokens.
pub fn strip_query(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.to_string()
        }
        Err(_) => url.split('?').next().unwrap_or(url).to_string(),
    }
}
