//! mediafixup core - engine that reconciles metadata in a Plex Media Server
//! catalog.
//!
//! A run executes an ordered list of named, idempotent fixups (sort titles,
//! titles from media files, genre cleanup, collection tag preservation)
//! against the catalog, with a dry-run mode that performs every read and
//! comparison but no write.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediafixup_core::{ConfigFile, FixupRegistry, Orchestrator, PlexConnector, RunContext};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> mediafixup_core::Result<()> {
//!     let config = ConfigFile::load("mediafixup.yml")?;
//!     let connector = PlexConnector::new(
//!         config.data().connection()?,
//!         config.data().client_identifier.clone(),
//!     );
//!
//!     let orchestrator =
//!         Orchestrator::new(FixupRegistry::with_builtin(), config, RunContext::new(true, false));
//!     let report = orchestrator.run(&connector).await?;
//!     println!("exit status {}", report.exit_status());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod collections_cache;
pub mod config;
pub mod error;
pub mod fixup;
pub mod fixups;
pub mod network;
pub mod orchestrator;
pub mod paths;
pub mod probe;
pub mod registry;
pub mod text;

// Re-export commonly used types
pub use catalog::plex::{PlexClient, PlexConnector};
pub use catalog::{
    Catalog, CatalogItem, CatalogSection, Connector, ItemEdit, ItemField, ItemType, SectionType,
    TagField, WatchReport,
};
pub use collections_cache::{CacheEntry, CollectionsCache};
pub use config::{AppConfig, ConfigDocument, ConfigFile, ConnectionSettings, FixupSpec};
pub use error::{FixupError, Result};
pub use fixup::{Fixup, RunContext};
pub use orchestrator::{FixupOutcome, Orchestrator, RunReport, SpecOutcome};
pub use probe::{FfprobeProbe, MediaProbe};
pub use registry::FixupRegistry;
