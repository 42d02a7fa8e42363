//! [`Catalog`] implementation over the Plex Media Server HTTP API.

use super::models::{Envelope, MetadataContainer, SectionsContainer};
use crate::catalog::{Catalog, CatalogItem, CatalogSection, ItemEdit, ItemType};
use crate::config::PlexConfig;
use crate::error::{FixupError, Result};
use crate::network::HttpClient;
use async_trait::async_trait;
use tracing::debug;

/// Client for one Plex Media Server.
pub struct PlexClient {
    http: HttpClient,
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_metadata(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<MetadataContainer> {
        let envelope: Envelope<MetadataContainer> = self
            .http
            .get_json(&self.url(path), Some(&self.token), query)
            .await?;
        Ok(envelope.media_container)
    }

    /// Fetch all metadata entries below `path`, one page at a time.
    async fn get_all_metadata(
        &self,
        path: &str,
        fallback: (&str, &str),
    ) -> Result<Vec<CatalogItem>> {
        let page_size = PlexConfig::CONTAINER_PAGE_SIZE;
        let mut items = Vec::new();
        let mut start = 0usize;

        loop {
            let query = vec![
                ("X-Plex-Container-Start".to_string(), start.to_string()),
                ("X-Plex-Container-Size".to_string(), page_size.to_string()),
            ];
            let mut container = self.get_metadata(path, &query).await?;
            let page = std::mem::take(&mut container.metadata);
            let received = page.len();
            for metadata in page {
                items.push(metadata.into_item(&container, Some(fallback), false)?);
            }

            start += received;
            let total = container.total_size.unwrap_or(start);
            debug!("Fetched {}/{} entries of {}", start, total, path);
            if received == 0 || start >= total {
                break;
            }
        }

        Ok(items)
    }
}

/// Plex search type number for an item type.
pub fn search_type(kind: ItemType) -> u8 {
    match kind {
        ItemType::Movie => 1,
        ItemType::Show => 2,
        ItemType::Episode => 4,
    }
}

/// Query parameters of the section edit endpoint for `edit` on `item`.
pub fn edit_params(item: &CatalogItem, edit: &ItemEdit) -> Vec<(String, String)> {
    let mut params = vec![
        ("type".to_string(), search_type(item.kind).to_string()),
        ("id".to_string(), item.id.clone()),
    ];

    match edit {
        ItemEdit::SetField { field, value, lock } => {
            params.push((format!("{}.value", field.as_str()), value.clone()));
            if *lock {
                params.push((format!("{}.locked", field.as_str()), "1".to_string()));
            }
        }
        ItemEdit::ReplaceTags { field, remove, add } => {
            let tag = field.as_str();
            if !remove.is_empty() {
                params.push((format!("{}[].tag.tag-", tag), remove.join(",")));
            }
            for (i, value) in add.iter().enumerate() {
                params.push((format!("{}[{}].tag.tag", tag, i), value.clone()));
            }
        }
        ItemEdit::AddTags { field, add, lock } => {
            let tag = field.as_str();
            for (i, value) in add.iter().enumerate() {
                params.push((format!("{}[{}].tag.tag", tag, i), value.clone()));
            }
            if *lock {
                params.push((format!("{}.locked", tag), "1".to_string()));
            }
        }
    }

    params
}

#[async_trait]
impl Catalog for PlexClient {
    async fn sections(&self) -> Result<Vec<CatalogSection>> {
        let envelope: Envelope<SectionsContainer> = self
            .http
            .get_json(&self.url("/library/sections"), Some(&self.token), &[])
            .await?;
        Ok(envelope
            .media_container
            .directories
            .into_iter()
            .filter_map(|d| d.into_section())
            .collect())
    }

    async fn items(&self, section: &CatalogSection) -> Result<Vec<CatalogItem>> {
        self.get_all_metadata(
            &format!("/library/sections/{}/all", section.id),
            (section.id.as_str(), section.title.as_str()),
        )
        .await
    }

    async fn episodes(&self, show: &CatalogItem) -> Result<Vec<CatalogItem>> {
        self.get_all_metadata(
            &format!("/library/metadata/{}/allLeaves", show.id),
            (show.section_id.as_str(), show.section_title.as_str()),
        )
        .await
    }

    async fn reload(&self, item: &CatalogItem) -> Result<CatalogItem> {
        let mut container = self
            .get_metadata(&format!("/library/metadata/{}", item.id), &[])
            .await?;
        let metadata = container.metadata.pop().ok_or_else(|| {
            FixupError::Other(format!(
                "Server returned no metadata for {} (id {})",
                item.describe(),
                item.id
            ))
        })?;
        metadata.into_item(
            &container,
            Some((item.section_id.as_str(), item.section_title.as_str())),
            true,
        )
    }

    async fn edit(&self, item: &CatalogItem, edit: &ItemEdit) -> Result<()> {
        let params = edit_params(item, edit);
        self.http
            .put(
                &self.url(&format!("/library/sections/{}/all", item.section_id)),
                Some(&self.token),
                &params,
            )
            .await
    }
}
