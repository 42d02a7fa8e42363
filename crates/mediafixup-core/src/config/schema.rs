//! Typed structure of the YAML config file.

use crate::error::{FixupError, Result};
use serde::{Deserialize, Serialize};

/// Root structure of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    /// Name of the Plex Media Server as shown in the Plex account.
    #[serde(default)]
    pub servername: Option<String>,
    /// Username (email) of the Plex account.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Base URL of the server, bypassing the account lookup.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Access token used together with `server_url`.
    #[serde(default)]
    pub token: Option<String>,
    /// Stable client identifier sent to Plex. Generated per run when absent.
    #[serde(default)]
    pub client_identifier: Option<String>,
    #[serde(default)]
    pub path_mappings: Vec<PathMapping>,
    #[serde(default)]
    pub video_genre_cleanup: Vec<GenreCleanupEntry>,
    /// Fixups, executed in list order.
    #[serde(default)]
    pub fixups: Vec<FixupSpec>,
}

/// Translation from a path prefix on the server to a locally reachable one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathMapping {
    pub server: String,
    pub local: String,
}

/// Genre cleanup rules for one language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenreCleanupEntry {
    /// ISO 639-1 language code selecting this entry.
    pub language: String,
    /// Desired genre -> list of original genres (or null).
    #[serde(default)]
    pub change: serde_yaml::Mapping,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub if_empty: Option<String>,
}

/// One entry of the `fixups` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixupSpec {
    /// Name of the fixup implementation.
    pub name: String,
    /// One-line description; informational only.
    #[serde(default)]
    pub title: Option<String>,
    pub enabled: bool,
    /// Fixup specific arguments.
    #[serde(default, alias = "arguments")]
    pub kwargs: serde_yaml::Mapping,
}

impl FixupSpec {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            title: None,
            enabled,
            kwargs: serde_yaml::Mapping::new(),
        }
    }

    /// Builder-style helper for setting one argument.
    pub fn with_arg(mut self, key: &str, value: impl Into<serde_yaml::Value>) -> Self {
        self.kwargs
            .insert(serde_yaml::Value::String(key.to_string()), value.into());
        self
    }
}

/// How to reach the media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSettings {
    /// Server URL and token given directly.
    Direct { url: String, token: String },
    /// Look the server up by name in the Plex account.
    Account {
        servername: String,
        username: String,
        password: String,
    },
}

impl ConnectionSettings {
    /// Short description for log messages; never includes secrets.
    pub fn describe(&self) -> String {
        match self {
            ConnectionSettings::Direct { url, .. } => format!("server at {}", url),
            ConnectionSettings::Account {
                servername,
                username,
                ..
            } => format!("server {} of Plex account {}", servername, username),
        }
    }
}

impl ConfigDocument {
    /// Derive the connection settings, failing when neither the direct nor
    /// the account parameters are complete.
    pub fn connection(&self) -> Result<ConnectionSettings> {
        if let Some(url) = non_empty(&self.server_url) {
            let token = non_empty(&self.token).ok_or_else(|| FixupError::Config {
                message: "'server_url' requires 'token' to be set".to_string(),
            })?;
            return Ok(ConnectionSettings::Direct {
                url: url.trim_end_matches('/').to_string(),
                token: token.to_string(),
            });
        }

        let mut missing = Vec::new();
        let servername = non_empty(&self.servername);
        let username = non_empty(&self.username);
        let password = non_empty(&self.password);
        if servername.is_none() {
            missing.push("servername");
        }
        if username.is_none() {
            missing.push("username");
        }
        if password.is_none() {
            missing.push("password");
        }
        match (servername, username, password) {
            (Some(servername), Some(username), Some(password)) => {
                Ok(ConnectionSettings::Account {
                    servername: servername.to_string(),
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => Err(FixupError::Config {
                message: format!(
                    "missing required item(s) {} (or 'server_url' and 'token')",
                    missing.join(", ")
                ),
            }),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
