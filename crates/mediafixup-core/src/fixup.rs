//! The contract every fixup implements.
//!
//! A fixup walks the catalog, computes a desired value per item, compares it
//! with the stored value and writes it back when they differ. Running a
//! fixup twice in a row must not produce any write on the second run.

use crate::catalog::Catalog;
use crate::config::{AppConfig, ConfigFile};
use crate::error::{FixupError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Command level flags passed to every fixup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Compute and compare everything, but skip catalog and file writes.
    pub dry_run: bool,
    /// Emit additional diagnostics. Never changes behavior.
    pub verbose: bool,
}

impl RunContext {
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self { dry_run, verbose }
    }

    /// Prefix for messages about changes that dry-run suppresses.
    pub fn prefix(&self) -> &'static str {
        if self.dry_run {
            AppConfig::DRYRUN_PREFIX
        } else {
            ""
        }
    }
}

/// A named, idempotent corrective operation on the catalog.
#[async_trait]
pub trait Fixup: Send + Sync {
    /// Name under which the fixup is registered.
    fn name(&self) -> &'static str;

    /// Parse and check the fixup arguments against the config. Called by the
    /// pre-flight pass, before any connection is made.
    fn validate(&self, config: &ConfigFile, args: &serde_yaml::Mapping) -> Result<()>;

    /// Execute the fixup. `Ok` is success; an error aborts the whole run.
    async fn run(
        &self,
        catalog: &dyn Catalog,
        ctx: RunContext,
        config: &ConfigFile,
        args: &serde_yaml::Mapping,
    ) -> Result<()>;
}

/// Deserialize the argument mapping of `fixup` into its typed form.
pub fn parse_args<T: DeserializeOwned>(fixup: &str, args: &serde_yaml::Mapping) -> Result<T> {
    serde_yaml::from_value(serde_yaml::Value::Mapping(args.clone()))
        .map_err(|e| FixupError::invalid_argument(fixup, e.to_string()))
}
