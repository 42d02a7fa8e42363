//! Remote media catalog.
//!
//! Fixups only talk to the server through the [`Catalog`] trait: list
//! sections, list items, list episodes, reload an item and submit a partial
//! edit. [`plex`] provides the implementation against a Plex Media Server.

pub mod plex;
mod watch;

pub use watch::{watch, WatchReport};

use crate::error::{FixupError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a library section that fixups can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Movie,
    Show,
}

impl SectionType {
    pub const ALL: [SectionType; 2] = [SectionType::Movie, SectionType::Show];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Movie => "movie",
            SectionType::Show => "show",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(SectionType::Movie),
            "show" => Some(SectionType::Show),
            _ => None,
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Movie,
    Show,
    Episode,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Movie => "movie",
            ItemType::Show => "show",
            ItemType::Episode => "episode",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A library section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSection {
    pub id: String,
    pub kind: SectionType,
    pub title: String,
}

/// A movie, show or episode item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    /// Rating key of the item.
    pub id: String,
    pub kind: ItemType,
    pub section_id: String,
    pub section_title: String,
    pub title: String,
    pub title_sort: String,
    pub year: Option<u32>,
    pub genres: Vec<String>,
    pub collections: Vec<String>,
    /// File paths of the media parts, as the server sees them.
    pub parts: Vec<String>,
    /// False when the item came from a listing and may under-report tags.
    pub full: bool,
}

impl CatalogItem {
    /// Short description used in log and error messages.
    pub fn describe(&self) -> String {
        format!("{} {:?}", self.kind, self.title)
    }
}

/// Scalar item fields that fixups set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Title,
    TitleSort,
}

impl ItemField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::Title => "title",
            ItemField::TitleSort => "titleSort",
        }
    }

    /// Current value of this field on `item`.
    pub fn value_of<'a>(&self, item: &'a CatalogItem) -> &'a str {
        match self {
            ItemField::Title => &item.title,
            ItemField::TitleSort => &item.title_sort,
        }
    }
}

/// Multi-value tag fields that fixups edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Genre,
    Collection,
}

impl TagField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagField::Genre => "genre",
            TagField::Collection => "collection",
        }
    }

    /// Current tags of this field on `item`.
    pub fn values_of<'a>(&self, item: &'a CatalogItem) -> &'a [String] {
        match self {
            TagField::Genre => &item.genres,
            TagField::Collection => &item.collections,
        }
    }
}

/// A partial edit of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEdit {
    /// Set a scalar field, optionally locking it against agent updates.
    SetField {
        field: ItemField,
        value: String,
        lock: bool,
    },
    /// Delete the listed tags, then add the new ones in order.
    ReplaceTags {
        field: TagField,
        remove: Vec<String>,
        add: Vec<String>,
    },
    /// Add tags, keeping the existing ones. `add` may repeat tags the item
    /// already has; the Plex edit endpoint expects the full list.
    AddTags {
        field: TagField,
        add: Vec<String>,
        lock: bool,
    },
}

/// Capability set consumed from the media server.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All movie and show sections.
    async fn sections(&self) -> Result<Vec<CatalogSection>>;

    /// All items of a section, in server order.
    async fn items(&self, section: &CatalogSection) -> Result<Vec<CatalogItem>>;

    /// All episodes of a show item.
    async fn episodes(&self, show: &CatalogItem) -> Result<Vec<CatalogItem>>;

    /// Fetch the complete current state of an item.
    async fn reload(&self, item: &CatalogItem) -> Result<CatalogItem>;

    /// Submit a partial edit of an item.
    async fn edit(&self, item: &CatalogItem, edit: &ItemEdit) -> Result<()>;
}

/// Establishes the connection to the catalog.
///
/// The orchestrator only calls [`Connector::connect`] after the pre-flight
/// pass succeeded.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Catalog>>;
}

/// Run a catalog call under a watch and wrap a failure into a
/// [`FixupError::CatalogOperation`] that names `action`.
pub async fn checked<T, F>(action: impl FnOnce() -> String, call: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    let (result, report) = watch(call).await;
    result.map_err(|e| match e {
        // Already carries its own context from a nested call.
        err @ FixupError::CatalogOperation { .. } => err,
        other => FixupError::CatalogOperation {
            action: action(),
            message: other.to_string(),
            report,
        },
    })
}
