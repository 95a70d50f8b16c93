//! Run statistics

use crate::types::{MatchMethod, UnifiedRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Sources whose snapshot loaded
    pub sources_loaded: Vec<String>,
    /// Sources whose load failed and were skipped
    pub sources_failed: Vec<String>,
    /// Records loaded across all sources
    pub records_in: usize,
    pub unified_out: usize,
    /// Unified records with two or more sources
    pub multi_source: usize,
    pub single_source: usize,
    /// How non-seed participants were linked
    pub links_by_method: BTreeMap<MatchMethod, usize>,
    /// Unified records carrying at least one conflict
    pub records_with_conflicts: usize,
}

impl ReconcileStats {
    /// Tally a finished run
    pub fn collect(
        unified: &[UnifiedRecord],
        sources_loaded: Vec<String>,
        sources_failed: Vec<String>,
        records_in: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut links_by_method: BTreeMap<MatchMethod, usize> = BTreeMap::new();
        for method in unified.iter().flat_map(|u| u.provenance.values()) {
            if *method != MatchMethod::Seed {
                *links_by_method.entry(*method).or_default() += 1;
            }
        }

        let multi_source = unified.iter().filter(|u| u.source_count() >= 2).count();

        Self {
            started_at,
            finished_at: Utc::now(),
            sources_loaded,
            sources_failed,
            records_in,
            unified_out: unified.len(),
            multi_source,
            single_source: unified.len() - multi_source,
            links_by_method,
            records_with_conflicts: unified.iter().filter(|u| !u.conflicts.is_empty()).count(),
        }
    }

    /// Wall-clock duration of the run in milliseconds
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
