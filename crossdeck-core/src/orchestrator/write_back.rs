//! Best-effort write-back of canonical values
//!
//! After a run, canonical values are pushed to participant records whose
//! stored value differs. Only unified records at or above the configured
//! confidence are considered, and only the configured fields. A failing
//! source is counted and logged; it never stops updates to other sources.

use crate::sources::{FieldUpdates, WriteBack};
use crate::types::{FieldValue, UnifiedRecord};
use crossdeck_common::config::WriteBackConfig;
use crossdeck_common::{PlatformRecord, TrackField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Updates for one source record
#[derive(Debug, Clone)]
pub struct PlannedUpdate {
    pub record: Arc<PlatformRecord>,
    pub updates: FieldUpdates,
}

/// Every update a run would push
#[derive(Debug, Clone, Default)]
pub struct WriteBackPlan {
    pub updates: Vec<PlannedUpdate>,
    /// Unified records skipped for low confidence
    pub below_confidence: usize,
}

/// Counters for one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWriteStats {
    /// Records handed to the source's writer
    pub attempted: usize,
    pub applied: usize,
    /// Writer answered `false`
    pub rejected: usize,
    /// Writer returned an error
    pub failed: usize,
    /// Updates not sent because the source has no write capability
    pub skipped: usize,
}

/// Outcome of write-back across all sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBackSummary {
    pub per_source: BTreeMap<String, SourceWriteStats>,
    pub below_confidence: usize,
}

impl WriteBackSummary {
    pub fn total_applied(&self) -> usize {
        self.per_source.values().map(|s| s.applied).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.per_source.values().map(|s| s.failed).sum()
    }

    pub fn source(&self, name: &str) -> Option<&SourceWriteStats> {
        self.per_source.get(name)
    }
}

/// Compute the updates each participant record needs
///
/// Tempo differences up to `tempo_tolerance` BPM are not worth a write.
pub fn plan_updates(
    unified: &[UnifiedRecord],
    config: &WriteBackConfig,
    tempo_tolerance: f64,
) -> WriteBackPlan {
    let mut plan = WriteBackPlan::default();

    for record in unified {
        if record.confidence < config.min_confidence {
            plan.below_confidence += 1;
            continue;
        }

        for (source, participant) in &record.records {
            if !config.allows_source(source) {
                continue;
            }

            let mut updates = FieldUpdates::default();
            for &field in &config.fields {
                if let Some(value) = canonical_update(record, participant, field, tempo_tolerance) {
                    updates.insert(field, value);
                }
            }

            if !updates.is_empty() {
                plan.updates.push(PlannedUpdate {
                    record: Arc::clone(participant),
                    updates,
                });
            }
        }
    }

    plan
}

/// Canonical value of `field` if it differs from what `stored` holds
fn canonical_update(
    unified: &UnifiedRecord,
    stored: &PlatformRecord,
    field: TrackField,
    tempo_tolerance: f64,
) -> Option<FieldValue> {
    match field {
        TrackField::Tempo => {
            let canonical = unified.tempo?;
            match stored.tempo_value() {
                Some(t) if (t - canonical).abs() <= tempo_tolerance => None,
                _ => Some(FieldValue::Number(canonical)),
            }
        }
        TrackField::Key => {
            let canonical = unified.key.as_deref()?;
            (stored.key_value() != Some(canonical)).then(|| FieldValue::Text(canonical.to_string()))
        }
        TrackField::Rating => {
            let canonical = unified.rating?;
            (stored.rating != Some(canonical)).then_some(FieldValue::Number(f64::from(canonical)))
        }
        TrackField::Title | TrackField::Artist | TrackField::Album => {
            let (canonical, current) = match field {
                TrackField::Title => (&unified.title, &stored.title),
                TrackField::Artist => (&unified.artist, &stored.artist),
                _ => (&unified.album, &stored.album),
            };
            (!canonical.is_empty() && current.trim() != canonical)
                .then(|| FieldValue::Text(canonical.clone()))
        }
    }
}

/// Send planned updates to each source's writer
///
/// Sources missing from `writers` have no write capability; their updates
/// are counted as skipped.
pub fn execute_write_back(
    plan: WriteBackPlan,
    writers: &BTreeMap<String, &dyn WriteBack>,
) -> WriteBackSummary {
    let mut summary = WriteBackSummary {
        below_confidence: plan.below_confidence,
        ..WriteBackSummary::default()
    };

    for PlannedUpdate { record, updates } in plan.updates {
        let stats = summary.per_source.entry(record.source.clone()).or_default();

        let Some(writer) = writers.get(&record.source) else {
            stats.skipped += 1;
            continue;
        };

        stats.attempted += 1;
        match writer.write_back(&record, &updates) {
            Ok(true) => {
                stats.applied += 1;
                debug!(
                    record = %record.record_ref(),
                    fields = updates.len(),
                    "Write-back applied"
                );
            }
            Ok(false) => {
                stats.rejected += 1;
                debug!(record = %record.record_ref(), "Write-back declined by source");
            }
            Err(e) => {
                stats.failed += 1;
                warn!(
                    record = %record.record_ref(),
                    error = %e,
                    "Write-back failed"
                );
            }
        }
    }

    summary
}
