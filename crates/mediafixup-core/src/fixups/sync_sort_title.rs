//! Sets the sort title of movies, shows and episodes from their title.

use super::common::{
    section_items, selected_sections, set_field_verified, show_episodes, OneOrMany,
    SectionSelection,
};
use crate::catalog::{Catalog, CatalogItem, ItemField, ItemType};
use crate::config::ConfigFile;
use crate::error::Result;
use crate::fixup::{parse_args, Fixup, RunContext};
use crate::text::{sort_title, SortTitleOptions};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

pub const NAME: &str = "sync_sort_title";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    #[serde(default)]
    section_types: Option<OneOrMany>,
    #[serde(default)]
    section_pattern: Option<String>,
    /// Fold the title to ASCII.
    #[serde(default)]
    transliterate: bool,
    #[serde(default)]
    remove_punctuation: bool,
}

struct Settings {
    selection: SectionSelection,
    options: SortTitleOptions,
}

impl Settings {
    fn parse(args: &serde_yaml::Mapping) -> Result<Self> {
        let args: Args = parse_args(NAME, args)?;
        Ok(Self {
            selection: SectionSelection::new(
                NAME,
                args.section_types.as_ref(),
                args.section_pattern.as_deref(),
            )?,
            options: SortTitleOptions {
                transliterate: args.transliterate,
                remove_punctuation: args.remove_punctuation,
            },
        })
    }
}

/// Syncs the sort title field to the title field.
#[derive(Debug, Default)]
pub struct SyncSortTitle;

#[async_trait]
impl Fixup for SyncSortTitle {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, _config: &ConfigFile, args: &serde_yaml::Mapping) -> Result<()> {
        Settings::parse(args).map(|_| ())
    }

    async fn run(
        &self,
        catalog: &dyn Catalog,
        ctx: RunContext,
        _config: &ConfigFile,
        args: &serde_yaml::Mapping,
    ) -> Result<()> {
        let settings = Settings::parse(args)?;

        for section in selected_sections(catalog, &settings.selection, ctx).await? {
            for item in section_items(catalog, &section).await? {
                process_item(catalog, ctx, settings.options, &item).await?;
                if item.kind == ItemType::Show {
                    for episode in show_episodes(catalog, &item).await? {
                        process_item(catalog, ctx, settings.options, &episode).await?;
                    }
                }
            }
        }
        Ok(())
    }
}

async fn process_item(
    catalog: &dyn Catalog,
    ctx: RunContext,
    options: SortTitleOptions,
    item: &CatalogItem,
) -> Result<()> {
    let desired = sort_title(&item.title, options);
    if desired.is_empty() {
        if ctx.verbose {
            info!("Skipping {} with an empty sort title", item.describe());
        }
        return Ok(());
    }
    if item.title_sort == desired {
        return Ok(());
    }

    info!(
        "{}Changing sort title of {} from {:?} to {:?}",
        ctx.prefix(),
        item.describe(),
        item.title_sort,
        desired
    );
    if ctx.dry_run {
        return Ok(());
    }
    set_field_verified(catalog, item, ItemField::TitleSort, &desired).await
}
