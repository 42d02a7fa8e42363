//! Sets the title of movies and episodes from the title tag of their media
//! files.

use super::common::{
    section_items, selected_sections, set_field_verified, show_episodes, OneOrMany,
    SectionSelection,
};
use crate::catalog::{Catalog, CatalogItem, ItemField, ItemType};
use crate::config::{ConfigFile, PathMapping};
use crate::error::{FixupError, Result};
use crate::fixup::{parse_args, Fixup, RunContext};
use crate::paths::local_path;
use crate::probe::{FfprobeProbe, MediaProbe};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const NAME: &str = "sync_title";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    #[serde(default)]
    section_types: Option<OneOrMany>,
    #[serde(default)]
    section_pattern: Option<String>,
    /// ffprobe executable to run instead of the one on `PATH`.
    #[serde(default)]
    ffprobe: Option<PathBuf>,
}

struct Settings {
    selection: SectionSelection,
    ffprobe: Option<PathBuf>,
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
            ffprobe: args.ffprobe,
        })
    }
}

/// Syncs the title field to the title tag in the media files.
#[derive(Default)]
pub struct SyncTitle {
    probe: Option<Arc<dyn MediaProbe>>,
}

impl SyncTitle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `probe` instead of running ffprobe.
    pub fn with_probe(probe: Arc<dyn MediaProbe>) -> Self {
        Self { probe: Some(probe) }
    }

    fn probe_for(&self, settings: &Settings) -> Arc<dyn MediaProbe> {
        match (&self.probe, &settings.ffprobe) {
            (Some(probe), _) => probe.clone(),
            (None, Some(program)) => Arc::new(FfprobeProbe::new(program.clone())),
            (None, None) => Arc::new(FfprobeProbe::default()),
        }
    }
}

#[async_trait]
impl Fixup for SyncTitle {
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
        config: &ConfigFile,
        args: &serde_yaml::Mapping,
    ) -> Result<()> {
        let settings = Settings::parse(args)?;
        let probe = self.probe_for(&settings);
        let mappings = &config.data().path_mappings;

        for section in selected_sections(catalog, &settings.selection, ctx).await? {
            for item in section_items(catalog, &section).await? {
                match item.kind {
                    ItemType::Show => {
                        for episode in show_episodes(catalog, &item).await? {
                            process_item(catalog, ctx, probe.as_ref(), mappings, &episode)
                                .await?;
                        }
                    }
                    ItemType::Movie | ItemType::Episode => {
                        process_item(catalog, ctx, probe.as_ref(), mappings, &item).await?
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
    probe: &dyn MediaProbe,
    mappings: &[PathMapping],
    item: &CatalogItem,
) -> Result<()> {
    let mut tags: Vec<(PathBuf, Option<String>)> = Vec::with_capacity(item.parts.len());
    for server_path in &item.parts {
        let local = local_path(server_path, mappings).ok_or_else(|| FixupError::UnmappedPath {
            server_path: server_path.clone(),
            mappings: describe_mappings(mappings),
        })?;
        let exists = tokio::fs::try_exists(&local)
            .await
            .map_err(|e| FixupError::io_with_path(e, &local))?;
        if !exists {
            return Err(FixupError::MissingMediaFile {
                path: local,
                item: item.describe(),
            });
        }
        let tag = probe.title(&local).await?;
        tags.push((local, tag));
    }

    let mut distinct: Vec<&Option<String>> = Vec::new();
    for (_, tag) in &tags {
        if !distinct.contains(&tag) {
            distinct.push(tag);
        }
    }
    if distinct.len() > 1 {
        warn!(
            "Skipping {} with multiple media files that have different title tags set: {:?}",
            item.describe(),
            tags
        );
        return Ok(());
    }

    let title = match distinct.first() {
        Some(Some(title)) if !title.is_empty() => title.as_str(),
        _ => {
            if ctx.verbose {
                info!(
                    "Skipping {} that has no title tag set in its media files",
                    item.describe()
                );
            }
            return Ok(());
        }
    };

    if item.title == title {
        return Ok(());
    }

    info!(
        "{}Changing title field of {} to {:?}",
        ctx.prefix(),
        item.describe(),
        title
    );
    if ctx.dry_run {
        return Ok(());
    }
    set_field_verified(catalog, item, ItemField::Title, title).await
}

fn describe_mappings(mappings: &[PathMapping]) -> String {
    let pairs: Vec<String> = mappings
        .iter()
        .map(|m| format!("{} -> {}", m.server, m.local))
        .collect();
    format!("[{}]", pairs.join(", "))
}
