//! Config file loader.
//!
//! Loads the YAML config file into a [`ConfigDocument`] and validates the
//! parts that serde alone cannot check.

use super::schema::ConfigDocument;
use crate::error::{FixupError, Result};
use crate::fixups::video_genre_cleanup::GenreRules;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A loaded and validated config file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    data: ConfigDocument,
}

impl ConfigFile {
    /// Load and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let content = std::fs::read_to_string(&path).map_err(|e| {
            let message = if e.kind() == std::io::ErrorKind::NotFound {
                format!("Config file not found: {}", path.display())
            } else {
                format!("Config file {} could not be opened: {}", path.display(), e)
            };
            FixupError::Config { message }
        })?;

        let config = Self::from_yaml(&path, &content)?;
        debug!("Loaded config file {}", path.display());
        Ok(config)
    }

    /// Build a config from YAML text, as if it had been read from `path`.
    pub fn from_yaml(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();

        // An empty document is a mapping without any items.
        let data: ConfigDocument = if content.trim().is_empty() {
            ConfigDocument::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| FixupError::Config {
                message: format!("Invalid config file {}: {}", path.display(), e),
            })?
        };

        let config = Self { path, data };
        config.validate()?;
        Ok(config)
    }

    /// Wrap an already built document. Validation still applies.
    pub fn from_document(path: impl Into<PathBuf>, data: ConfigDocument) -> Result<Self> {
        let config = Self {
            path: path.into(),
            data,
        };
        config.validate()?;
        Ok(config)
    }

    /// Path name of the config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The validated document.
    pub fn data(&self) -> &ConfigDocument {
        &self.data
    }

    /// Resolve a path named in the config file. Relative paths are
    /// interpreted relative to the directory of the config file.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.path.parent() {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    fn validate(&self) -> Result<()> {
        self.data
            .connection()
            .map_err(|e| self.invalid("", config_message(e)))?;

        for (i, mapping) in self.data.path_mappings.iter().enumerate() {
            if mapping.server.trim().is_empty() || mapping.local.trim().is_empty() {
                return Err(self.invalid(
                    &format!("path_mappings[{}]", i),
                    "'server' and 'local' must not be empty",
                ));
            }
        }

        for (i, entry) in self.data.video_genre_cleanup.iter().enumerate() {
            if entry.language.trim().is_empty() {
                return Err(self.invalid(
                    &format!("video_genre_cleanup[{}].language", i),
                    "must not be empty",
                ));
            }
            GenreRules::from_entry(entry).map_err(|e| {
                self.invalid(&format!("video_genre_cleanup[{}]", i), config_message(e))
            })?;
        }

        for (i, spec) in self.data.fixups.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(self.invalid(&format!("fixups[{}].name", i), "must not be empty"));
            }
        }

        Ok(())
    }

    fn invalid(&self, item: &str, message: impl std::fmt::Display) -> FixupError {
        let message = if item.is_empty() {
            format!("Config file {} is invalid: {}", self.path.display(), message)
        } else {
            format!(
                "Config file {} contains an invalid item {}: {}",
                self.path.display(),
                item,
                message
            )
        };
        FixupError::Config { message }
    }

    /// Help text describing the structure of the config file.
    pub fn help() -> &'static str {
        CONFIG_HELP
    }
}

fn config_message(err: FixupError) -> String {
    match err {
        FixupError::Config { message } => message,
        other => other.to_string(),
    }
}

const CONFIG_HELP: &str = "\
The config file is a YAML document with the following items:

  servername:   Name of the Plex Media Server, as shown in the Plex account.
  username:     Username (email) of the Plex account.
  password:     Password of the Plex account.
  server_url:   Base URL of the server (alternative to the three items above).
  token:        Plex access token, required with server_url.
  client_identifier:
                Stable identifier of this client towards Plex (optional).

  path_mappings:
    - server:   Path prefix of media files as reported by the server.
      local:    Corresponding locally reachable path prefix.

  video_genre_cleanup:
    - language: ISO 639-1 code selected by the video_genre_cleanup fixup.
      change:   Mapping of desired genre to a list of original genres.
      remove:   List of genres to be removed.
      if_empty: Genre to be set when no genre remains (optional).

  fixups:       Fixups, executed in list order.
    - name:     Name of the fixup (sync_sort_title, sync_title,
                video_genre_cleanup, preserve_collections).
      title:    One-line description (optional).
      enabled:  Whether the fixup runs.
      kwargs:   Fixup specific arguments:
                  section_types:      movie, show, or a list (default: both)
                  section_pattern:    regex on section titles (default: all)
                  transliterate:      sync_sort_title, fold to ASCII
                  remove_punctuation: sync_sort_title, strip punctuation
                  ffprobe:            sync_title, ffprobe executable
                  language:           video_genre_cleanup, required
                  collections_file:   preserve_collections, required
";
