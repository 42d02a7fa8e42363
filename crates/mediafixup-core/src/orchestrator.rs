//! Runs the configured fixups in order against one catalog connection.
//!
//! A run has three phases:
//! 1. Pre-flight: every enabled fixup is resolved in the registry and its
//!    arguments are validated. Nothing touches the network yet.
//! 2. Connect through the [`Connector`].
//! 3. Execute the fixups in list order. The first failure stops the run.

use crate::catalog::Connector;
use crate::config::{ConfigFile, FixupSpec};
use crate::error::Result;
use crate::fixup::{Fixup, RunContext};
use crate::registry::FixupRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of one entry of the fixup list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixupOutcome {
    Succeeded,
    /// The fixup returned an error; holds its message.
    Failed(String),
    /// The entry is disabled.
    Skipped,
    /// An earlier fixup failed.
    NotRun,
}

impl fmt::Display for FixupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixupOutcome::Succeeded => f.write_str("succeeded"),
            FixupOutcome::Failed(message) => write!(f, "failed: {}", message),
            FixupOutcome::Skipped => f.write_str("skipped"),
            FixupOutcome::NotRun => f.write_str("not run"),
        }
    }
}

/// Outcome of one fixup list entry, with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecOutcome {
    pub name: String,
    pub title: Option<String>,
    pub outcome: FixupOutcome,
}

/// Aggregated result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<SpecOutcome>,
}

impl RunReport {
    /// True when no fixup failed.
    pub fn succeeded(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|o| matches!(o.outcome, FixupOutcome::Failed(_)))
    }

    /// Process exit status for this report: 0 on success, 1 on failure.
    pub fn exit_status(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    /// The failed entry, if any.
    pub fn failure(&self) -> Option<&SpecOutcome> {
        self.outcomes
            .iter()
            .find(|o| matches!(o.outcome, FixupOutcome::Failed(_)))
    }

    pub fn count(&self, outcome: &FixupOutcome) -> usize {
        self.outcomes
            .iter()
            .filter(|o| std::mem::discriminant(&o.outcome) == std::mem::discriminant(outcome))
            .count()
    }
}

/// Drives a run of the configured fixup list.
pub struct Orchestrator {
    registry: FixupRegistry,
    config: ConfigFile,
    ctx: RunContext,
}

impl Orchestrator {
    pub fn new(registry: FixupRegistry, config: ConfigFile, ctx: RunContext) -> Self {
        Self {
            registry,
            config,
            ctx,
        }
    }

    pub fn registry(&self) -> &FixupRegistry {
        &self.registry
    }

    /// Resolve and validate every enabled fixup, in list order. Disabled
    /// entries yield `None`.
    pub fn preflight(&self) -> Result<Vec<Option<Arc<dyn Fixup>>>> {
        let mut resolved = Vec::with_capacity(self.config.data().fixups.len());
        for spec in &self.config.data().fixups {
            if !spec.enabled {
                resolved.push(None);
                continue;
            }
            let fixup = self.registry.resolve(&spec.name)?;
            fixup.validate(&self.config, &spec.kwargs)?;
            debug!("Pre-flight check of fixup {} passed", spec.name);
            resolved.push(Some(fixup));
        }
        Ok(resolved)
    }

    /// Run the fixup list. Pre-flight and connection failures are returned
    /// as errors; fixup failures are recorded in the report.
    pub async fn run(&self, connector: &dyn Connector) -> Result<RunReport> {
        let resolved = self.preflight()?;
        let catalog = connector.connect().await?;

        let mut report = RunReport::default();
        let mut failed = false;

        for (spec, fixup) in self.config.data().fixups.iter().zip(resolved) {
            let outcome = match fixup {
                None => {
                    info!("Skipping disabled fixup {}", label(spec));
                    FixupOutcome::Skipped
                }
                Some(_) if failed => FixupOutcome::NotRun,
                Some(fixup) => {
                    info!("{}Executing fixup {}", self.ctx.prefix(), label(spec));
                    match fixup
                        .run(catalog.as_ref(), self.ctx, &self.config, &spec.kwargs)
                        .await
                    {
                        Ok(()) => FixupOutcome::Succeeded,
                        Err(e) => {
                            debug!("Fixup {} failed: {}", spec.name, e);
                            failed = true;
                            FixupOutcome::Failed(e.to_string())
                        }
                    }
                }
            };
            report.outcomes.push(SpecOutcome {
                name: spec.name.clone(),
                title: spec.title.clone(),
                outcome,
            });
        }

        Ok(report)
    }
}

fn label(spec: &FixupSpec) -> String {
    match &spec.title {
        Some(title) => format!("{} ({})", spec.name, title),
        None => spec.name.clone(),
    }
}
