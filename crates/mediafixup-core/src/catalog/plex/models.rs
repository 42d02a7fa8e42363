//! Wire format of the Plex JSON responses.
//!
//! Only the fields the fixups need are decoded; everything else the server
//! sends is ignored.

use crate::catalog::{CatalogItem, CatalogSection, ItemType, SectionType};
use crate::error::{FixupError, Result};
use serde::{Deserialize, Deserializer};

/// Envelope of every library response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct SectionsContainer {
    #[serde(rename = "Directory", default)]
    pub directories: Vec<Directory>,
}

#[derive(Debug, Deserialize)]
pub struct Directory {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataContainer {
    #[serde(default)]
    pub total_size: Option<usize>,
    #[serde(rename = "librarySectionID", default, deserialize_with = "opt_id")]
    pub library_section_id: Option<String>,
    #[serde(default)]
    pub library_section_title: Option<String>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(deserialize_with = "id")]
    pub rating_key: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_sort: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(rename = "librarySectionID", default, deserialize_with = "opt_id")]
    pub library_section_id: Option<String>,
    #[serde(default)]
    pub library_section_title: Option<String>,
    #[serde(rename = "Genre", default)]
    pub genres: Vec<Tag>,
    #[serde(rename = "Collection", default)]
    pub collections: Vec<Tag>,
    #[serde(rename = "Media", default)]
    pub media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct Media {
    #[serde(rename = "Part", default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub user: SignInUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInUser {
    pub auth_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    #[serde(default)]
    pub provides: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Resource {
    pub fn is_server(&self) -> bool {
        self.provides.split(',').any(|p| p.trim() == "server")
    }
}

#[derive(Debug, Deserialize)]
pub struct Connection {
    pub uri: String,
    #[serde(default)]
    pub local: bool,
}

impl Directory {
    /// Convert to a section, or `None` for section types fixups never visit.
    pub fn into_section(self) -> Option<CatalogSection> {
        let kind = SectionType::parse(&self.kind)?;
        Some(CatalogSection {
            id: self.key,
            kind,
            title: self.title,
        })
    }
}

impl Metadata {
    /// Convert to a catalog item. Section information missing on the item is
    /// taken from the container, then from `fallback`.
    pub fn into_item(
        self,
        container: &MetadataContainer,
        fallback: Option<(&str, &str)>,
        full: bool,
    ) -> Result<CatalogItem> {
        let kind = match self.kind.as_str() {
            "movie" => ItemType::Movie,
            "show" => ItemType::Show,
            "episode" => ItemType::Episode,
            other => {
                return Err(FixupError::Other(format!(
                    "Invalid item type {:?} encountered for item {:?}",
                    other, self.title
                )))
            }
        };

        let section_id = self
            .library_section_id
            .or_else(|| container.library_section_id.clone())
            .or_else(|| fallback.map(|(id, _)| id.to_string()))
            .unwrap_or_default();
        let section_title = self
            .library_section_title
            .or_else(|| container.library_section_title.clone())
            .or_else(|| fallback.map(|(_, title)| title.to_string()))
            .unwrap_or_default();

        // Plex omits titleSort when it equals the title.
        let title_sort = self.title_sort.unwrap_or_else(|| self.title.clone());

        Ok(CatalogItem {
            id: self.rating_key,
            kind,
            section_id,
            section_title,
            title: self.title,
            title_sort,
            year: self.year,
            genres: self.genres.into_iter().map(|t| t.tag).collect(),
            collections: self.collections.into_iter().map(|t| t.tag).collect(),
            parts: self
                .media
                .into_iter()
                .flat_map(|m| m.parts)
                .filter_map(|p| p.file)
                .collect(),
            full,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn opt_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}
