//! Building blocks shared by the fixups: section selection, catalog walking
//! and verified writes.

use crate::catalog::{
    checked, Catalog, CatalogItem, CatalogSection, ItemEdit, ItemField, SectionType,
};
use crate::error::{FixupError, Result};
use crate::fixup::RunContext;
use regex::Regex;
use serde::Deserialize;
use tracing::info;

/// `section_types` argument: a single type or a list of types.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Which library sections a fixup processes.
#[derive(Debug, Clone)]
pub struct SectionSelection {
    types: Vec<SectionType>,
    pattern: Option<Regex>,
}

impl SectionSelection {
    /// Build the selection from the raw arguments of `fixup`. No types means
    /// all types; no pattern means all sections of those types.
    pub fn new(fixup: &str, types: Option<&OneOrMany>, pattern: Option<&str>) -> Result<Self> {
        let types = match types {
            None => SectionType::ALL.to_vec(),
            Some(OneOrMany::One(t)) => vec![parse_section_type(fixup, t)?],
            Some(OneOrMany::Many(list)) => list
                .iter()
                .map(|t| parse_section_type(fixup, t))
                .collect::<Result<Vec<_>>>()?,
        };

        let pattern = pattern
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    FixupError::invalid_argument(
                        fixup,
                        format!("Invalid section_pattern {:?}: {}", p, e),
                    )
                })
            })
            .transpose()?;

        Ok(Self { types, pattern })
    }

    pub fn types(&self) -> &[SectionType] {
        &self.types
    }

    pub fn includes_type(&self, kind: SectionType) -> bool {
        self.types.contains(&kind)
    }

    /// Whether the section title matches the pattern (searched, not anchored).
    pub fn matches_title(&self, title: &str) -> bool {
        self.pattern.as_ref().map_or(true, |p| p.is_match(title))
    }
}

fn parse_section_type(fixup: &str, value: &str) -> Result<SectionType> {
    SectionType::parse(value).ok_or_else(|| {
        FixupError::invalid_argument(fixup, format!("Invalid section type specified: {}", value))
    })
}

/// List the sections the selection includes, in server order.
pub async fn selected_sections(
    catalog: &dyn Catalog,
    selection: &SectionSelection,
    ctx: RunContext,
) -> Result<Vec<CatalogSection>> {
    let sections = checked(|| "Cannot list sections".to_string(), catalog.sections()).await?;

    let mut selected = Vec::new();
    for section in sections {
        if !selection.includes_type(section.kind) {
            continue;
        }
        if !selection.matches_title(&section.title) {
            if ctx.verbose {
                info!(
                    "Skipping {} library section {:?} that does not match the specified pattern",
                    section.kind, section.title
                );
            }
            continue;
        }
        selected.push(section);
    }
    Ok(selected)
}

/// List all items of a section.
pub async fn section_items(
    catalog: &dyn Catalog,
    section: &CatalogSection,
) -> Result<Vec<CatalogItem>> {
    info!(
        "Processing library section of type {}: {:?}",
        section.kind, section.title
    );
    checked(
        || {
            format!(
                "Cannot list all items in section of type {}: {:?}",
                section.kind, section.title
            )
        },
        catalog.items(section),
    )
    .await
}

/// List all episodes of a show item.
pub async fn show_episodes(catalog: &dyn Catalog, show: &CatalogItem) -> Result<Vec<CatalogItem>> {
    checked(
        || format!("Cannot list episodes of show {:?}", show.title),
        catalog.episodes(show),
    )
    .await
}

/// Reload the item from the server.
pub async fn reload(catalog: &dyn Catalog, item: &CatalogItem) -> Result<CatalogItem> {
    checked(
        || format!("Cannot reload {}", item.describe()),
        catalog.reload(item),
    )
    .await
}

/// Return the item with its complete tag set, reloading partial objects.
pub async fn full_item(catalog: &dyn Catalog, item: CatalogItem) -> Result<CatalogItem> {
    if item.full {
        Ok(item)
    } else {
        reload(catalog, &item).await
    }
}

/// Submit an edit of the item.
pub async fn edit(
    catalog: &dyn Catalog,
    item: &CatalogItem,
    edit: &ItemEdit,
    action: impl FnOnce() -> String,
) -> Result<()> {
    checked(action, catalog.edit(item, edit)).await
}

/// Set a scalar field locked to `value`, then reload the item and verify the
/// server now stores `value`.
pub async fn set_field_verified(
    catalog: &dyn Catalog,
    item: &CatalogItem,
    field: ItemField,
    value: &str,
) -> Result<()> {
    let request = ItemEdit::SetField {
        field,
        value: value.to_string(),
        lock: true,
    };
    edit(catalog, item, &request, || {
        format!(
            "Cannot set the {} field of {} to {:?}",
            field.as_str(),
            item.describe(),
            value
        )
    })
    .await?;

    let reloaded = reload(catalog, item).await?;
    let actual = field.value_of(&reloaded);
    if actual != value {
        return Err(FixupError::VerificationMismatch {
            item: item.describe(),
            field: field.as_str().to_string(),
            expected: value.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
