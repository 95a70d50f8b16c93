//! Core Types for Cross-Source Reconciliation
//!
//! Defines the data contracts passed between the stages of a run:
//! - **Matcher** produces `MatchCandidate`s
//! - **Unifier** produces `UnifiedRecord`s carrying `FieldConflict`s
//! - **Orchestrator** iterates sources in `SourceOrder`

use crossdeck_common::{PlatformRecord, RecordRef, TrackField};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Matching
// ============================================================================

/// How a participant was linked to its unified record
///
/// Variants are ordered weakest to strongest, so `max()` picks the
/// strongest signal when several strategies find the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Fuzzy normalized title+artist similarity
    Fuzzy,
    /// Identical normalized title+artist key
    ExactTitleArtist,
    /// Same file name, different directory
    Filename,
    /// Same absolute path (case-insensitive)
    Path,
    /// Stored cross-platform id
    StoredId,
    /// The record the unified record was seeded from
    Seed,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::ExactTitleArtist => "exact_title_artist",
            MatchMethod::Filename => "filename",
            MatchMethod::Path => "path",
            MatchMethod::StoredId => "stored_id",
            MatchMethod::Seed => "seed",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cross-source record the matcher considers identical to a seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub record: RecordRef,
    /// Strongest strategy that found this record
    pub method: MatchMethod,
    /// 1.0 for exact strategies, similarity ratio for fuzzy
    pub score: f64,
}

impl MatchCandidate {
    pub fn new(record: RecordRef, method: MatchMethod, score: f64) -> Self {
        Self {
            record,
            method,
            score,
        }
    }

    /// Keep whichever of the two findings is stronger
    pub(crate) fn absorb(&mut self, method: MatchMethod, score: f64) {
        if (method, score).partial_cmp(&(self.method, self.score)) == Some(std::cmp::Ordering::Greater) {
            self.method = method;
            self.score = score;
        }
    }
}

// ============================================================================
// Source ordering
// ============================================================================

/// Fixed processing order of sources for one run
///
/// Hub first (when present), then the configured order, then any remaining
/// sources alphabetically. Never depends on hash iteration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOrder {
    order: Vec<String>,
}

impl SourceOrder {
    pub fn new<'a, I>(hub: Option<&str>, configured: &[String], available: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let available: BTreeSet<&str> = available.into_iter().map(String::as_str).collect();
        let mut order: Vec<String> = Vec::with_capacity(available.len());

        let push = |name: &str, order: &mut Vec<String>| {
            if available.contains(name) && !order.iter().any(|s| s == name) {
                order.push(name.to_string());
            }
        };

        if let Some(hub) = hub {
            push(hub, &mut order);
        }
        for name in configured {
            push(name.as_str(), &mut order);
        }
        for name in &available {
            push(*name, &mut order);
        }

        Self { order }
    }

    /// Position of a source; unknown sources sort after every known one
    pub fn rank(&self, source: &str) -> usize {
        self.order
            .iter()
            .position(|s| s == source)
            .unwrap_or(self.order.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ============================================================================
// Unification
// ============================================================================

/// Severity of a field disagreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

/// A field value as reported by one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Disagreement between two or more sources on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub field: TrackField,
    /// Value reported by each disagreeing source
    pub values: BTreeMap<String, FieldValue>,
    pub severity: ConflictSeverity,
    /// Canonical value chosen by authority ranking
    pub resolved: Option<FieldValue>,
}

/// The reconciled entity for one track across all sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRecord {
    /// Deterministic id derived from the seed record
    pub match_id: Uuid,
    /// At most one record per source
    pub records: BTreeMap<String, Arc<PlatformRecord>>,
    /// Strategy that linked each source's record
    pub provenance: BTreeMap<String, MatchMethod>,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub tempo: Option<f64>,
    pub key: Option<String>,
    pub rating: Option<u8>,
    pub path: Option<String>,
    /// Heuristic match reliability (0.0-1.0)
    pub confidence: f64,
    pub conflicts: Vec<FieldConflict>,
    pub sources: BTreeSet<String>,
}

impl UnifiedRecord {
    pub fn source_count(&self) -> usize {
        self.records.len()
    }

    /// Exactly one participating source
    pub fn is_orphan(&self) -> bool {
        self.records.len() == 1
    }

    /// Refs of every participant, in source-name order
    pub fn refs(&self) -> impl Iterator<Item = RecordRef> + '_ {
        self.records.values().map(|r| r.record_ref())
    }

    pub fn record(&self, source: &str) -> Option<&PlatformRecord> {
        self.records.get(source).map(Arc::as_ref)
    }

    pub fn has_conflict(&self, field: TrackField) -> bool {
        self.conflicts.iter().any(|c| c.field == field)
    }

    pub fn conflict(&self, field: TrackField) -> Option<&FieldConflict> {
        self.conflicts.iter().find(|c| c.field == field)
    }
}
