//! Health report over a reconciliation result
//!
//! # Scoring
//! - Start at 100
//! - Deduct a flat weight per issue: Critical 25, Error 10, Warning 3, Info 0.5
//! - Clamp to 0-100
//!
//! # Status
//! - Healthy: score >= 90
//! - Degraded: score >= 70
//! - Unhealthy: below 70

use super::checks;
use crate::types::UnifiedRecord;
use chrono::{DateTime, Utc};
use crossdeck_common::config::ValidationConfig;
use crossdeck_common::{TomlConfig, TrackField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// Issue severity, ordered least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Points deducted from the health score per issue
    pub fn weight(self) -> f64 {
        match self {
            Severity::Info => 0.5,
            Severity::Warning => 3.0,
            Severity::Error => 10.0,
            Severity::Critical => 25.0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    SourceCountMismatch,
    MissingFiles,
    MetadataCompleteness,
    TempoCoverage,
    KeyCoverage,
    LinkRate,
    Orphans,
    TempoConflicts,
    KeyConflicts,
}

/// One finding of the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub category: IssueCategory,
    pub severity: Severity,
    pub message: String,
    /// Number of affected records (or sources)
    pub affected: usize,
    /// Capped list of examples (paths, match ids, source names)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl Issue {
    pub fn new(category: IssueCategory, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            affected: 0,
            details: Vec::new(),
        }
    }

    pub fn with_affected(mut self, affected: usize) -> Self {
        self.affected = affected;
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            HealthStatus::Healthy
        } else if score >= 70.0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// Aggregate figures over the unified records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatistics {
    pub total_unified: usize,
    /// Participant records across all unified records
    pub total_records: usize,
    /// Raw loaded count per source, as reported by the caller
    pub raw_counts: BTreeMap<String, usize>,
    /// Participants per source
    pub records_per_source: BTreeMap<String, usize>,
    pub multi_source: usize,
    pub single_source: usize,
    /// Share of unified records with two or more sources
    pub link_rate: f64,
    pub orphan_rate: f64,
    pub tempo_coverage: f64,
    pub key_coverage: f64,
    pub missing_title: usize,
    pub missing_artist: usize,
    pub missing_album: usize,
    pub tempo_conflicts: usize,
    pub key_conflicts: usize,
    pub mean_confidence: f64,
    pub missing_files: usize,
}

impl ValidationStatistics {
    pub fn collect(unified: &[UnifiedRecord], raw_counts: &BTreeMap<String, usize>) -> Self {
        let total = unified.len();
        let ratio = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 };

        let mut records_per_source: BTreeMap<String, usize> = BTreeMap::new();
        for source in unified.iter().flat_map(|u| u.records.keys()) {
            *records_per_source.entry(source.clone()).or_default() += 1;
        }

        let multi_source = unified.iter().filter(|u| u.source_count() >= 2).count();
        let single_source = unified.iter().filter(|u| u.is_orphan()).count();
        let with_tempo = unified.iter().filter(|u| u.tempo.is_some()).count();
        let with_key = unified.iter().filter(|u| u.key.is_some()).count();
        let confidence_sum: f64 = unified.iter().map(|u| u.confidence).sum();

        Self {
            total_unified: total,
            total_records: records_per_source.values().sum(),
            raw_counts: raw_counts.clone(),
            records_per_source,
            multi_source,
            single_source,
            link_rate: ratio(multi_source),
            orphan_rate: ratio(single_source),
            tempo_coverage: ratio(with_tempo),
            key_coverage: ratio(with_key),
            missing_title: unified.iter().filter(|u| u.title.trim().is_empty()).count(),
            missing_artist: unified.iter().filter(|u| u.artist.trim().is_empty()).count(),
            missing_album: unified.iter().filter(|u| u.album.trim().is_empty()).count(),
            tempo_conflicts: unified
                .iter()
                .filter(|u| u.has_conflict(TrackField::Tempo))
                .count(),
            key_conflicts: unified
                .iter()
                .filter(|u| u.has_conflict(TrackField::Key))
                .count(),
            mean_confidence: if total == 0 {
                0.0
            } else {
                confidence_sum / total as f64
            },
            missing_files: 0,
        }
    }
}

/// Result of validating one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// 0-100
    pub health_score: f64,
    pub status: HealthStatus,
    pub issues: Vec<Issue>,
    pub statistics: ValidationStatistics,
    pub generated_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn issues_in(&self, category: IssueCategory) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One-line human summary
    pub fn summary_message(&self) -> String {
        if self.issues.is_empty() {
            return format!("Library healthy: score {:.1}, no issues", self.health_score);
        }

        let worst = self
            .issues
            .iter()
            .map(|i| i.severity)
            .max()
            .unwrap_or(Severity::Info);

        format!(
            "Library {}: score {:.1}, {} issue(s), worst {}",
            match self.status {
                HealthStatus::Healthy => "healthy",
                HealthStatus::Degraded => "degraded",
                HealthStatus::Unhealthy => "unhealthy",
            },
            self.health_score,
            self.issues.len(),
            worst
        )
    }
}

/// Health score for a set of issues, always within 0-100
pub fn health_score(issues: &[Issue]) -> f64 {
    let penalty: f64 = issues.iter().map(|i| i.severity.weight()).sum();
    (100.0 - penalty).clamp(0.0, 100.0)
}

/// Runs every check over one reconciliation result
#[derive(Debug, Clone)]
pub struct HealthValidator {
    config: ValidationConfig,
    hub: Option<String>,
}

impl HealthValidator {
    pub fn new(config: ValidationConfig, hub: Option<String>) -> Self {
        Self { config, hub }
    }

    /// Validate unified records against the raw per-source counts
    ///
    /// No check can fail; problems surface as issues.
    pub fn validate(
        &self,
        unified: &[UnifiedRecord],
        raw_counts: &BTreeMap<String, usize>,
    ) -> ValidationReport {
        let mut statistics = ValidationStatistics::collect(unified, raw_counts);
        let mut issues = Vec::new();

        issues.extend(checks::source_counts(raw_counts, self.hub.as_deref(), &self.config));

        if self.config.check_missing_files {
            let (missing, issue) = checks::missing_files(unified, &self.config);
            statistics.missing_files = missing;
            issues.extend(issue);
        }

        if statistics.total_unified > 0 {
            issues.extend(checks::completeness(&statistics, &self.config));
            issues.extend(checks::coverage(&statistics, &self.config));
            issues.extend(checks::link_rate(unified, &statistics, &self.config));
        }
        issues.extend(checks::conflicts(&statistics));

        let health_score = health_score(&issues);
        let report = ValidationReport {
            health_score,
            status: HealthStatus::from_score(health_score),
            issues,
            statistics,
            generated_at: Utc::now(),
        };

        info!(
            health_score = report.health_score,
            status = ?report.status,
            issues = report.issues.len(),
            "Validation complete"
        );

        report
    }
}

/// Validate with default thresholds and the default hub name (`hub`)
///
/// Source counts are compared against the source named `hub`, or against
/// the largest source when no such source was loaded. Callers whose hub
/// goes by another name should use `HealthValidator::new` with that name.
pub fn validate(unified: &[UnifiedRecord], raw_counts: &BTreeMap<String, usize>) -> ValidationReport {
    let hub = TomlConfig::default().hub().map(str::to_string);
    HealthValidator::new(ValidationConfig::default(), hub).validate(unified, raw_counts)
}
