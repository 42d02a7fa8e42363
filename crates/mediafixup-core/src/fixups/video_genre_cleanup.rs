//! Consolidates the genres of movie and show items into a defined set.
//!
//! The rules come from the `video_genre_cleanup` entry of the config whose
//! language matches the `language` argument. Genres can be renamed (one
//! original may map to several desired genres), removed, or replaced by a
//! default when nothing is left.

use super::common::{
    edit, full_item, reload, section_items, selected_sections, OneOrMany, SectionSelection,
};
use crate::catalog::{Catalog, CatalogItem, ItemEdit, ItemType, TagField};
use crate::config::{ConfigFile, GenreCleanupEntry};
use crate::error::{FixupError, Result};
use crate::fixup::{parse_args, Fixup, RunContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;
use tracing::{info, warn};

pub const NAME: &str = "video_genre_cleanup";

/// Genre cleanup rules for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreRules {
    /// Desired genre -> original genres, in declaration order.
    change: Vec<(String, Vec<String>)>,
    /// Original genre -> desired genres, derived from `change`.
    inverse: HashMap<String, Vec<String>>,
    remove: Vec<String>,
    if_empty: Option<String>,
}

impl GenreRules {
    pub fn new(
        change: Vec<(String, Vec<String>)>,
        remove: Vec<String>,
        if_empty: Option<String>,
    ) -> Self {
        let inverse = invert(&change);
        Self {
            change,
            inverse,
            remove,
            if_empty,
        }
    }

    /// Build the rules of a config entry. The `change` mapping must map
    /// strings to a list of strings or null.
    pub fn from_entry(entry: &GenreCleanupEntry) -> Result<Self> {
        let mut change = Vec::with_capacity(entry.change.len());
        for (key, value) in &entry.change {
            let desired = match key {
                Value::String(s) => s.clone(),
                other => {
                    return Err(FixupError::Config {
                        message: format!("'change' key {:?} is not a string", other),
                    })
                }
            };
            let originals = match value {
                Value::Null => Vec::new(),
                Value::Sequence(seq) => seq
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => Ok(s.clone()),
                        other => Err(FixupError::Config {
                            message: format!(
                                "'change' item {:?} contains a genre that is not a string: {:?}",
                                desired, other
                            ),
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?,
                other => {
                    return Err(FixupError::Config {
                        message: format!(
                            "'change' item {:?} must be a list of genres or null, not {:?}",
                            desired, other
                        ),
                    })
                }
            };
            change.push((desired, originals));
        }

        Ok(Self::new(
            change,
            entry.remove.clone(),
            entry.if_empty.clone().filter(|g| !g.is_empty()),
        ))
    }

    /// Select the rules for `language`. When several entries match, the
    /// last one wins.
    pub fn for_language(config: &ConfigFile, language: &str) -> Result<Self> {
        let entry = config
            .data()
            .video_genre_cleanup
            .iter()
            .rev()
            .find(|e| e.language == language)
            .ok_or_else(|| {
                FixupError::invalid_argument(
                    NAME,
                    format!(
                        "'video_genre_cleanup' config parameter does not specify an item with language {}",
                        language
                    ),
                )
            })?;
        Self::from_entry(entry)
    }

    /// Original genre -> desired genres.
    pub fn inverse(&self) -> &HashMap<String, Vec<String>> {
        &self.inverse
    }

    fn is_desired(&self, genre: &str) -> bool {
        self.change.iter().any(|(desired, _)| desired == genre)
    }

    /// Compute the cleaned-up genre list for `genres`, and the genres that
    /// the rules do not know about.
    pub fn cleanup(&self, genres: &[String]) -> (Vec<String>, Vec<String>) {
        let mut cleaned: Vec<String> = Vec::new();
        let mut unknown = Vec::new();

        for genre in genres {
            if genre.is_empty() {
                continue;
            }
            // Re-added at the end if still needed.
            if self.if_empty.as_deref() == Some(genre.as_str()) {
                continue;
            }
            if self.remove.contains(genre) {
                continue;
            }
            if let Some(desired) = self.inverse.get(genre) {
                for d in desired {
                    if !cleaned.contains(d) {
                        cleaned.push(d.clone());
                    }
                }
                continue;
            }
            if !cleaned.contains(genre) {
                cleaned.push(genre.clone());
            }
            if !self.is_desired(genre) {
                unknown.push(genre.clone());
            }
        }

        if cleaned.is_empty() {
            if let Some(default) = &self.if_empty {
                cleaned.push(default.clone());
            }
        }

        (cleaned, unknown)
    }
}

fn invert(change: &[(String, Vec<String>)]) -> HashMap<String, Vec<String>> {
    let mut inverse: HashMap<String, Vec<String>> = HashMap::new();
    for (desired, originals) in change {
        for original in originals {
            inverse
                .entry(original.clone())
                .or_default()
                .push(desired.clone());
        }
    }
    inverse
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    #[serde(default)]
    section_types: Option<OneOrMany>,
    #[serde(default)]
    section_pattern: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

struct Settings {
    selection: SectionSelection,
    rules: GenreRules,
}

impl Settings {
    fn parse(config: &ConfigFile, args: &serde_yaml::Mapping) -> Result<Self> {
        let args: Args = parse_args(NAME, args)?;
        let language = args
            .language
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                FixupError::invalid_argument(NAME, "No 'language' config parameter specified")
            })?;
        let rules = GenreRules::for_language(config, &language)?;
        let selection = SectionSelection::new(
            NAME,
            args.section_types.as_ref(),
            args.section_pattern.as_deref(),
        )?;
        Ok(Self { selection, rules })
    }
}

/// Cleans up the genres of movie and show items.
#[derive(Debug, Default)]
pub struct VideoGenreCleanup;

#[async_trait]
impl Fixup for VideoGenreCleanup {
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

        for section in selected_sections(catalog, &settings.selection, ctx).await? {
            for item in section_items(catalog, &section).await? {
                match item.kind {
                    ItemType::Movie | ItemType::Show => {
                        process_item(catalog, ctx, &settings.rules, item).await?
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
        Ok(())
    }
}

async fn process_item(
    catalog: &dyn Catalog,
    ctx: RunContext,
    rules: &GenreRules,
    item: CatalogItem,
) -> Result<()> {
    // Listings may only carry a subset of the genres.
    let item = full_item(catalog, item).await?;

    let current = TagField::Genre.values_of(&item).to_vec();
    let (cleaned, unknown) = rules.cleanup(&current);

    if !unknown.is_empty() {
        warn!(
            "{}Unknown genres on {}: {:?}",
            ctx.prefix(),
            item.describe(),
            unknown
        );
    }

    if cleaned == current {
        return Ok(());
    }

    info!(
        "{}Changing genres of {} from {:?} to {:?}",
        ctx.prefix(),
        item.describe(),
        current,
        cleaned
    );
    if ctx.dry_run {
        return Ok(());
    }

    let request = ItemEdit::ReplaceTags {
        field: TagField::Genre,
        remove: current.clone(),
        add: cleaned.clone(),
    };
    edit(catalog, &item, &request, || {
        format!(
            "Cannot change the genres field of {} from {:?} to {:?}",
            item.describe(),
            current,
            cleaned
        )
    })
    .await?;

    let reloaded = reload(catalog, &item).await?;
    let actual = TagField::Genre.values_of(&reloaded);
    if actual != cleaned.as_slice() {
        return Err(FixupError::VerificationMismatch {
            item: item.describe(),
            field: TagField::Genre.as_str().to_string(),
            expected: format!("{:?}", cleaned),
            actual: format!("{:?}", actual),
        });
    }
    Ok(())
}
