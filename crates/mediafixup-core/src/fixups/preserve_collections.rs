//! Preserves the collection tags of movie and show items.
//!
//! Tags are synced in both directions between the server and a collections
//! file: tags found on the server are recorded in the file, and tags in the
//! file that disappeared from the server (for example after the item was
//! re-matched) are added back.

use super::common::{
    edit, full_item, section_items, selected_sections, OneOrMany, SectionSelection,
};
use crate::catalog::{Catalog, CatalogItem, ItemEdit, ItemType, TagField};
use crate::collections_cache::CollectionsCache;
use crate::config::ConfigFile;
use crate::error::{FixupError, Result};
use crate::fixup::{parse_args, Fixup, RunContext};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

pub const NAME: &str = "preserve_collections";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    #[serde(default)]
    section_types: Option<OneOrMany>,
    #[serde(default)]
    section_pattern: Option<String>,
    #[serde(default)]
    collections_file: Option<PathBuf>,
}

struct Settings {
    selection: SectionSelection,
    collections_file: PathBuf,
}

impl Settings {
    fn parse(config: &ConfigFile, args: &serde_yaml::Mapping) -> Result<Self> {
        let args: Args = parse_args(NAME, args)?;
        let file = args
            .collections_file
            .filter(|f| !f.as_os_str().is_empty())
            .ok_or_else(|| {
                FixupError::invalid_argument(
                    NAME,
                    "No 'collections_file' config parameter specified",
                )
            })?;
        Ok(Self {
            selection: SectionSelection::new(
                NAME,
                args.section_types.as_ref(),
                args.section_pattern.as_deref(),
            )?,
            collections_file: config.resolve_path(file),
        })
    }
}

/// Syncs collection tags between the server and the collections file.
#[derive(Debug, Default)]
pub struct PreserveCollections;

#[async_trait]
impl Fixup for PreserveCollections {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, config: &ConfigFile, args: &serde_yaml::Mapping) -> Result<()> {
        Settings::parse(config, args).map(|_| ())
    }

    async fn run(
        &self,
        catalog: &dyn Catalog,
        ctx: RunContext,
        config: &ConfigFile,
        args: &serde_yaml::Mapping,
    ) -> Result<()> {
        let settings = Settings::parse(config, args)?;
        let path = &settings.collections_file;

        info!("Using collections file: {}", path.display());
        let mut cache = CollectionsCache::load(path)?;
        if ctx.verbose {
            info!("Read {} items from collections file", cache.len());
        }

        for section in selected_sections(catalog, &settings.selection, ctx).await? {
            for item in section_items(catalog, &section).await? {
                match item.kind {
                    ItemType::Movie | ItemType::Show => {
                        process_item(catalog, ctx, &mut cache, item).await?
                    }
                    ItemType::Episode => {
                        return Err(FixupError::Other(format!(
                            "Invalid item type {} encountered in library section {:?}",
                            item.kind, section.title
                        )))
                    }
                }
            }
        }

        if !ctx.dry_run {
            if ctx.verbose {
                info!("Writing collections file: {}", path.display());
            }
            cache.save(path)?;
        }
        Ok(())
    }
}

async fn process_item(
    catalog: &dyn Catalog,
    ctx: RunContext,
    cache: &mut CollectionsCache,
    item: CatalogItem,
) -> Result<()> {
    // Listings may only carry a subset of the collections.
    let item = full_item(catalog, item).await?;
    let label = format!(
        "{:?} item: {:?} ({})",
        item.section_title,
        item.title,
        item.year.map_or_else(|| "-".to_string(), |y| y.to_string())
    );

    let sync = cache.sync_item(&item);
    if ctx.verbose {
        if sync.created {
            info!("{}Creating {} in collections file", ctx.prefix(), label);
        } else if sync.refreshed {
            info!(
                "{}Updating section/title/year in collections file for {}",
                ctx.prefix(),
                label
            );
        }
        for tag in &sync.saved {
            info!(
                "{}Saving collection {:?} to collections file for {}",
                ctx.prefix(),
                tag,
                label
            );
        }
    }

    if sync.restore.is_empty() {
        return Ok(());
    }
    for tag in &sync.restore {
        info!(
            "{}Restoring collection {:?} from collections file for {}",
            ctx.prefix(),
            tag,
            label
        );
    }
    if ctx.dry_run {
        return Ok(());
    }

    // Indexed tag parameters describe the full tag list, so the request
    // carries the tags the item keeps plus the restored ones.
    let mut tags = TagField::Collection.values_of(&item).to_vec();
    tags.extend(sync.restore.iter().cloned());
    let request = ItemEdit::AddTags {
        field: TagField::Collection,
        add: tags,
        lock: true,
    };
    edit(catalog, &item, &request, || {
        format!(
            "Cannot restore collections {:?} of {}",
            sync.restore,
            item.describe()
        )
    })
    .await
}
