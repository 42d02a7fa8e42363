//! Side file that remembers the collection tags of catalog items.
//!
//! The file is a YAML mapping keyed by item id:
//!
//! ```yaml
//! '1234':
//!   section: Movies
//!   title: Die Hard
//!   year: 1988
//!   collections:
//!   - Action Classics
//! ```
//!
//! Tags only ever get added to an entry. Keys are written in sorted order
//! and tags in the order they were first seen, so an unchanged cache is
//! rewritten byte for byte.

use crate::catalog::CatalogItem;
use crate::error::{FixupError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process;
use tracing::debug;

/// Cached state of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub collections: Vec<String>,
}

/// What [`CollectionsCache::sync_item`] did for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemSync {
    /// The item had no entry yet.
    pub created: bool,
    /// Section, title or year of the entry were refreshed.
    pub refreshed: bool,
    /// Server tags newly recorded in the cache.
    pub saved: Vec<String>,
    /// Cached tags missing on the server, in cache order.
    pub restore: Vec<String>,
}

/// Item id -> cached entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionsCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl CollectionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache at `path`. A missing file or an empty document is an
    /// empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Collections file {} does not exist yet", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(FixupError::Io {
                    message: format!("Cannot open collections file {} for reading", path.display()),
                    path: Some(path.to_path_buf()),
                    source: Some(e),
                })
            }
        };
        Self::from_yaml(&content).map_err(|e| FixupError::Yaml {
            message: format!(
                "Cannot parse collections file {} as YAML: {}",
                path.display(),
                e
            ),
            source: None,
        })
    }

    /// Parse cache content. Numeric keys are accepted as ids.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let blank = content.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            return Ok(Self::new());
        }

        let document: Value = serde_yaml::from_str(content)?;
        let mapping = match document {
            Value::Null => return Ok(Self::new()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(FixupError::Other(format!(
                    "expected a mapping of item ids, found {:?}",
                    other
                )))
            }
        };

        let mut entries = BTreeMap::new();
        for (key, value) in mapping {
            let id = match key {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(FixupError::Other(format!(
                        "item id {:?} is not a string",
                        other
                    )))
                }
            };
            let entry: CacheEntry = serde_yaml::from_value(value)?;
            entries.insert(id, entry);
        }
        Ok(Self { entries })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.entries)?)
    }

    /// Write the whole cache to `path` through a temp file and a rename, so
    /// readers never see a partial file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = self.to_yaml()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| FixupError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "collections".to_string());
        let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, process::id()));

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| FixupError::Io {
                    message: format!("Failed to create temp file {}", temp_path.display()),
                    path: Some(temp_path.clone()),
                    source: Some(e),
                })?;

            file.write_all(serialized.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| FixupError::Io {
                    message: format!("Failed to write temp file {}", temp_path.display()),
                    path: Some(temp_path.clone()),
                    source: Some(e),
                })?;
        }

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            FixupError::Io {
                message: format!(
                    "Failed to rename {} to {}",
                    temp_path.display(),
                    path.display()
                ),
                path: Some(path.to_path_buf()),
                source: Some(e),
            }
        })?;

        debug!("Wrote collections file {}", path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    /// Merge the live state of `item` into the cache and report which
    /// cached tags the server lacks.
    pub fn sync_item(&mut self, item: &CatalogItem) -> ItemSync {
        let mut sync = ItemSync::default();

        let entry = self.entries.entry(item.id.clone()).or_insert_with(|| {
            sync.created = true;
            CacheEntry {
                section: item.section_title.clone(),
                title: item.title.clone(),
                year: item.year,
                collections: Vec::new(),
            }
        });

        if !sync.created
            && (entry.section != item.section_title
                || entry.title != item.title
                || entry.year != item.year)
        {
            entry.section = item.section_title.clone();
            entry.title = item.title.clone();
            entry.year = item.year;
            sync.refreshed = true;
        }

        for tag in &item.collections {
            if !entry.collections.contains(tag) {
                entry.collections.push(tag.clone());
                sync.saved.push(tag.clone());
            }
        }

        sync.restore = entry
            .collections
            .iter()
            .filter(|tag| !item.collections.contains(tag))
            .cloned()
            .collect();

        sync
    }
}
