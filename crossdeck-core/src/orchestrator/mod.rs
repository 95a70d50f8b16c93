//! Reconciliation Orchestrator
//!
//! Drives one complete run over the registered sources:
//!
//! 1. **Load** - materialize every source's snapshot (a failing source is skipped)
//! 2. **Index** - build per-source lookup indices
//! 3. **Reconcile** - partition all records into unified records
//! 4. **Write-back** - optionally push canonical values to writable sources
//! 5. **Validate** - health report over the result
//!
//! Every run builds its own indices, claimed set and pipeline objects;
//! nothing carries over between runs.

pub mod reconcile;
pub mod statistics;
pub mod write_back;

pub use reconcile::{reconcile, reconcile_with, Reconciler};
pub use statistics::ReconcileStats;
pub use write_back::{
    execute_write_back, plan_updates, PlannedUpdate, SourceWriteStats, WriteBackPlan,
    WriteBackSummary,
};

use crate::index::{Indices, SourceIndex};
use crate::sources::{TrackSource, WriteBack};
use crate::types::UnifiedRecord;
use crate::validators::{HealthValidator, ValidationReport};
use chrono::Utc;
use crossdeck_common::{Error, Result, TomlConfig};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub unified: Vec<UnifiedRecord>,
    pub stats: ReconcileStats,
    /// Present when write-back is enabled
    pub write_back: Option<WriteBackSummary>,
    pub report: ValidationReport,
}

struct RegisteredSource {
    source: Box<dyn TrackSource>,
    /// Write capability, probed once at registration
    writable: bool,
}

/// Owns the registered sources and runs reconciliation over them
pub struct ReconciliationOrchestrator {
    config: TomlConfig,
    sources: Vec<RegisteredSource>,
}

impl ReconciliationOrchestrator {
    pub fn new(config: TomlConfig) -> Self {
        Self {
            config,
            sources: Vec::new(),
        }
    }

    pub fn config(&self) -> &TomlConfig {
        &self.config
    }

    /// Register a source
    ///
    /// # Errors
    /// `DuplicateSource` if a source with the same name is already registered
    pub fn register(&mut self, source: Box<dyn TrackSource>) -> Result<()> {
        let name = source.name().to_string();
        if self.sources.iter().any(|s| s.source.name() == name) {
            return Err(Error::DuplicateSource(name));
        }

        let writable = source.writer().is_some();
        info!(source = %name, writable, "Source registered");

        self.sources.push(RegisteredSource { source, writable });
        Ok(())
    }

    /// Registered source names in registration order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.source.name()).collect()
    }

    /// Whether a registered source can receive write-back
    pub fn is_writable(&self, name: &str) -> bool {
        self.sources
            .iter()
            .any(|s| s.writable && s.source.name() == name)
    }

    /// Run one complete reconciliation
    ///
    /// # Errors
    /// `NoSourcesLoaded` if no source is registered or every source failed.
    /// A source fails when its load errors or when its snapshot cannot be
    /// indexed (duplicate ids, records labelled with another source); it is
    /// logged and skipped, and the run continues with the rest.
    pub fn run(&self) -> Result<ReconcileOutcome> {
        let started_at = Utc::now();
        info!(
            sources = self.sources.len(),
            hub = self.config.hub().unwrap_or("<none>"),
            "Starting reconciliation run"
        );

        // Phase 1+2: load and index
        let mut indices = Indices::new();
        let mut raw_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut loaded = Vec::new();
        let mut failed = Vec::new();

        for registered in &self.sources {
            let name = registered.source.name();
            match registered.source.load() {
                Ok(records) => {
                    let count = records.len();
                    match SourceIndex::build(name, records) {
                        Ok(index) => {
                            info!(source = %name, records = count, "Source loaded");
                            raw_counts.insert(name.to_string(), count);
                            indices.insert(name.to_string(), index);
                            loaded.push(name.to_string());
                        }
                        Err(e) => {
                            // Duplicate ids or mislabelled records: drop the whole snapshot
                            warn!(source = %name, error = %e, "Source snapshot rejected, skipping");
                            failed.push(name.to_string());
                        }
                    }
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "Source failed to load, skipping");
                    failed.push(name.to_string());
                }
            }
        }

        if loaded.is_empty() {
            return Err(Error::NoSourcesLoaded(self.sources.len()));
        }

        let records_in: usize = raw_counts.values().sum();

        // Phase 3: reconcile
        let unified = reconcile_with(&indices, &self.config);

        // Phase 4: write-back
        let write_back = if self.config.write_back.enabled {
            Some(self.write_back(&unified))
        } else {
            None
        };

        // Phase 5: validate
        let report = HealthValidator::new(
            self.config.validation.clone(),
            self.config.hub().map(str::to_string),
        )
        .validate(&unified, &raw_counts);

        let stats = ReconcileStats::collect(&unified, loaded, failed, records_in, started_at);

        info!(
            records_in = stats.records_in,
            unified = stats.unified_out,
            multi_source = stats.multi_source,
            conflicts = stats.records_with_conflicts,
            health_score = report.health_score,
            elapsed_ms = stats.elapsed_ms(),
            "Reconciliation run complete"
        );

        Ok(ReconcileOutcome {
            unified,
            stats,
            write_back,
            report,
        })
    }

    fn write_back(&self, unified: &[UnifiedRecord]) -> WriteBackSummary {
        let writers: BTreeMap<String, &dyn WriteBack> = self
            .sources
            .iter()
            .filter(|s| s.writable)
            .filter_map(|s| s.source.writer().map(|w| (s.source.name().to_string(), w)))
            .collect();

        let plan = plan_updates(
            unified,
            &self.config.write_back,
            self.config.conflicts.tempo_tolerance,
        );
        let summary = execute_write_back(plan, &writers);

        info!(
            applied = summary.total_applied(),
            failed = summary.total_failed(),
            below_confidence = summary.below_confidence,
            "Write-back complete"
        );

        summary
    }
}
