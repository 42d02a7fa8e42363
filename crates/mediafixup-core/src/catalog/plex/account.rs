//! Connection establishment, directly or through the Plex account.

use super::client::PlexClient;
use super::models::{Resource, SignInResponse};
use crate::catalog::{Catalog, Connector};
use crate::config::{ConnectionSettings, PlexConfig};
use crate::error::{FixupError, Result};
use crate::network::HttpClient;
use async_trait::async_trait;
use tracing::{debug, info};

/// Connects to the server described by [`ConnectionSettings`].
pub struct PlexConnector {
    settings: ConnectionSettings,
    client_identifier: String,
}

impl PlexConnector {
    /// Create a connector. Without a configured client identifier a random
    /// one is generated for this process.
    pub fn new(settings: ConnectionSettings, client_identifier: Option<String>) -> Self {
        let client_identifier = client_identifier
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("{}-{}", PlexConfig::PRODUCT, uuid::Uuid::new_v4()));
        Self {
            settings,
            client_identifier,
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    async fn connect_direct(&self, http: HttpClient, url: &str, token: &str) -> Result<PlexClient> {
        let identity = format!("{}{}", url, PlexConfig::IDENTITY_PATH);
        http.probe(&identity, Some(token), PlexConfig::REQUEST_TIMEOUT)
            .await
            .map_err(|e| FixupError::Connection {
                message: format!("Server at {} does not respond: {}", url, e),
            })?;
        Ok(PlexClient::new(http, url, token))
    }

    async fn connect_account(
        &self,
        http: HttpClient,
        servername: &str,
        username: &str,
        password: &str,
    ) -> Result<PlexClient> {
        let sign_in_url = format!("{}{}", PlexConfig::PLEX_TV_BASE, PlexConfig::SIGN_IN_PATH);
        let sign_in: SignInResponse = http
            .post_basic_auth(&sign_in_url, username, password)
            .await
            .map_err(|e| FixupError::Connection {
                message: format!("Cannot login to Plex account {}: {}", username, e),
            })?;
        let account_token = sign_in.user.auth_token;
        debug!("Signed in to Plex account {}", username);

        let resources_url = format!("{}{}", PlexConfig::PLEX_TV_BASE, PlexConfig::RESOURCES_PATH);
        let query = vec![
            ("includeHttps".to_string(), "1".to_string()),
            ("includeRelay".to_string(), "1".to_string()),
        ];
        let resources: Vec<Resource> = http
            .get_json(&resources_url, Some(&account_token), &query)
            .await
            .map_err(|e| FixupError::Connection {
                message: format!(
                    "Cannot list the resources of Plex account {}: {}",
                    username, e
                ),
            })?;

        let resource = select_server(resources, servername).ok_or_else(|| {
            FixupError::Connection {
                message: format!(
                    "Plex account {} has no server named {}",
                    username, servername
                ),
            }
        })?;
        let token = resource
            .access_token
            .clone()
            .unwrap_or_else(|| account_token.clone());

        let mut failures = Vec::new();
        for connection in ordered_connections(&resource) {
            let identity = format!("{}{}", connection, PlexConfig::IDENTITY_PATH);
            match http
                .probe(&identity, Some(&token), PlexConfig::CONNECT_PROBE_TIMEOUT)
                .await
            {
                Ok(()) => {
                    debug!("Using connection {} for server {}", connection, servername);
                    return Ok(PlexClient::new(http, connection, token));
                }
                Err(e) => {
                    debug!("Connection {} failed: {}", connection, e);
                    failures.push(format!("{}: {}", connection, e));
                }
            }
        }

        Err(FixupError::Connection {
            message: format!(
                "Cannot connect to server {} of Plex account {}: {}",
                servername,
                username,
                if failures.is_empty() {
                    "server has no connections".to_string()
                } else {
                    failures.join("; ")
                }
            ),
        })
    }
}

#[async_trait]
impl Connector for PlexConnector {
    async fn connect(&self) -> Result<Box<dyn Catalog>> {
        let http = HttpClient::new(&self.client_identifier)?;
        let client = match &self.settings {
            ConnectionSettings::Direct { url, token } => {
                self.connect_direct(http, url, token).await?
            }
            ConnectionSettings::Account {
                servername,
                username,
                password,
            } => {
                self.connect_account(http, servername, username, password)
                    .await?
            }
        };
        info!("Connected to {}", self.settings.describe());
        Ok(Box::new(client))
    }
}

/// The server resource with the given name, if any.
fn select_server(resources: Vec<Resource>, servername: &str) -> Option<Resource> {
    resources
        .into_iter()
        .find(|r| r.is_server() && r.name == servername)
}

/// Connection URIs of a resource, local ones first.
fn ordered_connections(resource: &Resource) -> Vec<String> {
    let mut connections: Vec<_> = resource.connections.iter().collect();
    connections.sort_by_key(|c| !c.local);
    connections
        .into_iter()
        .map(|c| c.uri.trim_end_matches('/').to_string())
        .collect()
}
