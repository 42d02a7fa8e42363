//! Shared test fixtures: an in-memory catalog that records every call, a
//! canned media probe and a counting connector.

#![allow(dead_code)]

use async_trait::async_trait;
use mediafixup_core::catalog::{
    Catalog, CatalogItem, CatalogSection, Connector, ItemEdit, ItemField, ItemType, SectionType,
};
use mediafixup_core::config::{ConfigDocument, ConfigFile, FixupSpec, PathMapping};
use mediafixup_core::probe::MediaProbe;
use mediafixup_core::{FixupError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One call made against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Sections,
    Items(String),
    Episodes(String),
    Reload(String),
    Edit(String, ItemEdit),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Edit(..))
    }
}

type CallFilter = Box<dyn Fn(&Call) -> bool + Send>;

#[derive(Default)]
struct State {
    sections: Vec<CatalogSection>,
    /// Top-level items per section id, in server order.
    items: HashMap<String, Vec<String>>,
    /// Episode ids per show id.
    episodes: HashMap<String, Vec<String>>,
    store: HashMap<String, CatalogItem>,
    calls: Vec<Call>,
    /// Accept edits without applying them.
    ignore_edits: bool,
    /// Reverse genre order when applying genre edits.
    reorder_genres: bool,
    /// Listings report at most this many tags per item.
    listing_tag_limit: Option<usize>,
    /// Calls matching this filter are recorded, then fail.
    failing: Option<CallFilter>,
}

impl State {
    fn record(&mut self, call: Call) -> Result<()> {
        let fail = self.failing.as_ref().is_some_and(|f| f(&call));
        self.calls.push(call);
        if fail {
            return Err(FixupError::Network {
                message: "HTTP 500 Internal Server Error".into(),
                source: None,
            });
        }
        Ok(())
    }
}

/// In-memory catalog. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<Mutex<State>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_section(&self, id: &str, kind: SectionType, title: &str) {
        let mut state = self.state.lock().unwrap();
        state.sections.push(CatalogSection {
            id: id.into(),
            kind,
            title: title.into(),
        });
        state.items.entry(id.into()).or_default();
    }

    /// Add a top-level item to the section it names.
    pub fn add_item(&self, mut item: CatalogItem) {
        item.full = true;
        let mut state = self.state.lock().unwrap();
        state
            .items
            .entry(item.section_id.clone())
            .or_default()
            .push(item.id.clone());
        state.store.insert(item.id.clone(), item);
    }

    pub fn add_episode(&self, show_id: &str, mut episode: CatalogItem) {
        episode.full = true;
        let mut state = self.state.lock().unwrap();
        state
            .episodes
            .entry(show_id.into())
            .or_default()
            .push(episode.id.clone());
        state.store.insert(episode.id.clone(), episode);
    }

    pub fn ignore_edits(&self) {
        self.state.lock().unwrap().ignore_edits = true;
    }

    pub fn reorder_genres(&self) {
        self.state.lock().unwrap().reorder_genres = true;
    }

    /// Make every call matching `filter` fail like a server error.
    pub fn fail_calls(&self, filter: impl Fn(&Call) -> bool + Send + 'static) {
        self.state.lock().unwrap().failing = Some(Box::new(filter));
    }

    pub fn limit_listing_tags(&self, limit: usize) {
        self.state.lock().unwrap().listing_tag_limit = Some(limit);
    }

    /// Change an item behind the fixups' back.
    pub fn update(&self, id: &str, change: impl FnOnce(&mut CatalogItem)) {
        let mut state = self.state.lock().unwrap();
        change(state.store.get_mut(id).unwrap());
    }

    pub fn item(&self, id: &str) -> CatalogItem {
        self.state.lock().unwrap().store[id].clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn reads(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| !c.is_write()).collect()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.is_write()).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn listed(state: &State, id: &str) -> CatalogItem {
        let mut item = state.store[id].clone();
        item.full = false;
        if let Some(limit) = state.listing_tag_limit {
            item.genres.truncate(limit);
            item.collections.truncate(limit);
        }
        item
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn sections(&self) -> Result<Vec<CatalogSection>> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::Sections)?;
        Ok(state.sections.clone())
    }

    async fn items(&self, section: &CatalogSection) -> Result<Vec<CatalogItem>> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::Items(section.id.clone()))?;
        let ids = state.items.get(&section.id).cloned().unwrap_or_default();
        Ok(ids.iter().map(|id| Self::listed(&state, id)).collect())
    }

    async fn episodes(&self, show: &CatalogItem) -> Result<Vec<CatalogItem>> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::Episodes(show.id.clone()))?;
        let ids = state.episodes.get(&show.id).cloned().unwrap_or_default();
        Ok(ids.iter().map(|id| Self::listed(&state, id)).collect())
    }

    async fn reload(&self, item: &CatalogItem) -> Result<CatalogItem> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::Reload(item.id.clone()))?;
        let mut stored = state
            .store
            .get(&item.id)
            .cloned()
            .ok_or_else(|| FixupError::Other(format!("no item {}", item.id)))?;
        stored.full = true;
        Ok(stored)
    }

    async fn edit(&self, item: &CatalogItem, edit: &ItemEdit) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::Edit(item.id.clone(), edit.clone()))?;
        if state.ignore_edits {
            return Ok(());
        }
        let reorder = state.reorder_genres;
        let stored = state
            .store
            .get_mut(&item.id)
            .ok_or_else(|| FixupError::Other(format!("no item {}", item.id)))?;
        match edit {
            ItemEdit::SetField { field, value, .. } => match field {
                ItemField::Title => stored.title = value.clone(),
                ItemField::TitleSort => stored.title_sort = value.clone(),
            },
            ItemEdit::ReplaceTags { field, remove, add } => {
                let tags = tags_mut(stored, *field);
                tags.retain(|t| !remove.contains(t));
                for tag in add {
                    if !tags.contains(tag) {
                        tags.push(tag.clone());
                    }
                }
                if reorder {
                    tags.reverse();
                }
            }
            ItemEdit::AddTags { field, add, .. } => {
                let tags = tags_mut(stored, *field);
                for tag in add {
                    if !tags.contains(tag) {
                        tags.push(tag.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

fn tags_mut(item: &mut CatalogItem, field: mediafixup_core::TagField) -> &mut Vec<String> {
    match field {
        mediafixup_core::TagField::Genre => &mut item.genres,
        mediafixup_core::TagField::Collection => &mut item.collections,
    }
}

/// Connector handing out a shared [`MemoryCatalog`].
pub struct MemoryConnector {
    catalog: MemoryCatalog,
    connects: AtomicUsize,
    fail: bool,
}

impl MemoryConnector {
    pub fn new(catalog: MemoryCatalog) -> Self {
        Self {
            catalog,
            connects: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(MemoryCatalog::new())
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn Catalog>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FixupError::Connection {
                message: "connection refused".into(),
            });
        }
        Ok(Box::new(self.catalog.clone()))
    }
}

/// Probe answering from a fixed table.
#[derive(Default)]
pub struct TableProbe {
    titles: HashMap<PathBuf, Option<String>>,
    probed: Mutex<Vec<PathBuf>>,
}

impl TableProbe {
    pub fn with(mut self, path: impl Into<PathBuf>, title: Option<&str>) -> Self {
        self.titles.insert(path.into(), title.map(str::to_string));
        self
    }

    pub fn probed(&self) -> Vec<PathBuf> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaProbe for TableProbe {
    async fn title(&self, path: &Path) -> Result<Option<String>> {
        self.probed.lock().unwrap().push(path.to_path_buf());
        self.titles
            .get(path)
            .cloned()
            .ok_or_else(|| FixupError::Probe {
                path: path.to_path_buf(),
                message: "not in table".into(),
            })
    }
}

pub fn movie(id: &str, section_id: &str, title: &str, title_sort: &str) -> CatalogItem {
    CatalogItem {
        id: id.into(),
        kind: ItemType::Movie,
        section_id: section_id.into(),
        section_title: "Movies".into(),
        title: title.into(),
        title_sort: title_sort.into(),
        year: Some(1988),
        genres: vec![],
        collections: vec![],
        parts: vec![],
        full: true,
    }
}

pub fn show(id: &str, section_id: &str, title: &str) -> CatalogItem {
    CatalogItem {
        kind: ItemType::Show,
        section_title: "TV Shows".into(),
        year: None,
        ..movie(id, section_id, title, title)
    }
}

pub fn episode(id: &str, section_id: &str, title: &str, title_sort: &str) -> CatalogItem {
    CatalogItem {
        kind: ItemType::Episode,
        section_title: "TV Shows".into(),
        year: None,
        ..movie(id, section_id, title, title_sort)
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// A config document that connects directly and has no fixups yet.
pub fn document() -> ConfigDocument {
    ConfigDocument {
        server_url: Some("http://plex.local:32400".into()),
        token: Some("token".into()),
        ..Default::default()
    }
}

pub fn config_at(path: impl Into<PathBuf>, document: ConfigDocument) -> ConfigFile {
    ConfigFile::from_document(path, document).unwrap()
}

pub fn config(document: ConfigDocument) -> ConfigFile {
    config_at("/tmp/mediafixup/config.yml", document)
}

pub fn mappings(server: &str, local: &Path) -> Vec<PathMapping> {
    vec![PathMapping {
        server: server.into(),
        local: local.to_string_lossy().into_owned(),
    }]
}

pub fn spec(name: &str, args: &str) -> FixupSpec {
    FixupSpec {
        kwargs: serde_yaml::from_str(if args.is_empty() { "{}" } else { args }).unwrap(),
        ..FixupSpec::new(name, true)
    }
}
