//! Configuration for mediafixup.
//!
//! Holds the compile-time constants used by the engine and the Plex client,
//! and the YAML config file loader with its typed document.

mod file;
mod schema;

pub use file::ConfigFile;
pub use schema::{
    ConfigDocument, ConnectionSettings, FixupSpec, GenreCleanupEntry, PathMapping,
};

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "mediafixup";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    /// Prefix for log messages describing a change that dry-run suppresses.
    pub const DRYRUN_PREFIX: &'static str = "Dryrun: ";
}

/// Plex-related configuration.
pub struct PlexConfig;

impl PlexConfig {
    pub const PLEX_TV_BASE: &'static str = "https://plex.tv";
    pub const SIGN_IN_PATH: &'static str = "/users/sign_in.json";
    pub const RESOURCES_PATH: &'static str = "/api/v2/resources";
    pub const IDENTITY_PATH: &'static str = "/identity";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const CONNECT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    /// Items requested per page when listing a library section.
    pub const CONTAINER_PAGE_SIZE: usize = 100;
    pub const PRODUCT: &'static str = "mediafixup";
}

/// Media probing configuration.
pub struct ProbeConfig;

impl ProbeConfig {
    pub const FFPROBE_PROGRAM: &'static str = "ffprobe";
}
