//! Individual validation checks
//!
//! Each check is independent and returns zero or more issues.

use super::health::{Issue, IssueCategory, Severity, ValidationStatistics};
use crate::types::UnifiedRecord;
use crossdeck_common::config::ValidationConfig;
use std::collections::BTreeMap;
use std::path::Path;

/// Compare each source's raw count against the hub (or the largest source)
pub fn source_counts(
    raw_counts: &BTreeMap<String, usize>,
    hub: Option<&str>,
    config: &ValidationConfig,
) -> Vec<Issue> {
    let reference = hub
        .and_then(|h| raw_counts.get_key_value(h))
        .or_else(|| {
            // Largest source, first by name on ties
            raw_counts
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        });

    let Some((reference_name, &reference_count)) = reference else {
        return Vec::new();
    };
    if reference_count == 0 {
        return Vec::new();
    }

    let mut issues = Vec::new();
    for (source, &count) in raw_counts {
        if source == reference_name {
            continue;
        }

        let diff = count.abs_diff(reference_count);
        let ratio = diff as f64 / reference_count as f64;
        let severity = if ratio > config.count_error_ratio {
            Severity::Error
        } else if ratio > config.count_warning_ratio {
            Severity::Warning
        } else {
            continue;
        };

        issues.push(
            Issue::new(
                IssueCategory::SourceCountMismatch,
                severity,
                format!(
                    "Source '{}' has {} tracks vs {} in '{}' ({:.1}% difference)",
                    source,
                    count,
                    reference_count,
                    reference_name,
                    ratio * 100.0
                ),
            )
            .with_affected(diff)
            .with_details(vec![source.clone()]),
        );
    }

    issues
}

/// Canonical paths that do not exist on disk
///
/// Returns the missing count together with the issue, if any.
pub fn missing_files(unified: &[UnifiedRecord], config: &ValidationConfig) -> (usize, Option<Issue>) {
    let with_path: Vec<&str> = unified.iter().filter_map(|u| u.path.as_deref()).collect();
    let missing: Vec<&str> = with_path
        .iter()
        .copied()
        .filter(|p| !Path::new(p).exists())
        .collect();

    if missing.is_empty() {
        return (0, None);
    }

    let ratio = missing.len() as f64 / with_path.len() as f64;
    let severity = if ratio > config.missing_files_error_ratio {
        Severity::Error
    } else {
        Severity::Warning
    };

    let issue = Issue::new(
        IssueCategory::MissingFiles,
        severity,
        format!(
            "{} of {} track file(s) not found on disk ({:.1}%)",
            missing.len(),
            with_path.len(),
            ratio * 100.0
        ),
    )
    .with_affected(missing.len())
    .with_details(
        missing
            .iter()
            .take(config.detail_cap)
            .map(|p| p.to_string())
            .collect(),
    );

    (missing.len(), Some(issue))
}

/// Share of unified records missing title, artist or album
pub fn completeness(stats: &ValidationStatistics, config: &ValidationConfig) -> Vec<Issue> {
    let fields = [
        ("title", stats.missing_title, config.title_missing_max, Severity::Error),
        ("artist", stats.missing_artist, config.artist_missing_max, Severity::Warning),
        ("album", stats.missing_album, config.album_missing_max, Severity::Info),
    ];

    fields
        .into_iter()
        .filter_map(|(name, missing, max, severity)| {
            let ratio = missing as f64 / stats.total_unified as f64;
            (ratio > max).then(|| {
                Issue::new(
                    IssueCategory::MetadataCompleteness,
                    severity,
                    format!(
                        "{:.1}% of tracks have no {} (threshold {:.0}%)",
                        ratio * 100.0,
                        name,
                        max * 100.0
                    ),
                )
                .with_affected(missing)
            })
        })
        .collect()
}

/// Tempo and key coverage below target
pub fn coverage(stats: &ValidationStatistics, config: &ValidationConfig) -> Vec<Issue> {
    let mut issues = Vec::new();

    let checks = [
        (
            IssueCategory::TempoCoverage,
            "tempo",
            stats.tempo_coverage,
            config.tempo_coverage_target,
        ),
        (
            IssueCategory::KeyCoverage,
            "key",
            stats.key_coverage,
            config.key_coverage_target,
        ),
    ];

    for (category, name, coverage, target) in checks {
        if coverage < target {
            let uncovered = stats.total_unified - (coverage * stats.total_unified as f64).round() as usize;
            issues.push(
                Issue::new(
                    category,
                    Severity::Warning,
                    format!(
                        "{} coverage {:.1}% below target {:.0}%",
                        name,
                        coverage * 100.0,
                        target * 100.0
                    ),
                )
                .with_affected(uncovered),
            );
        }
    }

    issues
}

/// Cross-platform link rate and orphan share
pub fn link_rate(
    unified: &[UnifiedRecord],
    stats: &ValidationStatistics,
    config: &ValidationConfig,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    if stats.link_rate < config.link_rate_target {
        issues.push(
            Issue::new(
                IssueCategory::LinkRate,
                Severity::Warning,
                format!(
                    "Only {:.1}% of tracks are linked across sources (target {:.0}%)",
                    stats.link_rate * 100.0,
                    config.link_rate_target * 100.0
                ),
            )
            .with_affected(stats.single_source),
        );
    }

    if stats.orphan_rate > config.orphan_rate_max {
        let examples: Vec<String> = unified
            .iter()
            .filter(|u| u.is_orphan())
            .take(config.detail_cap)
            .map(|u| u.match_id.to_string())
            .collect();

        issues.push(
            Issue::new(
                IssueCategory::Orphans,
                Severity::Info,
                format!(
                    "{} track(s) ({:.1}%) exist in a single source only",
                    stats.single_source,
                    stats.orphan_rate * 100.0
                ),
            )
            .with_affected(stats.single_source)
            .with_details(examples),
        );
    }

    issues
}

/// One warning per conflicting field category
pub fn conflicts(stats: &ValidationStatistics) -> Vec<Issue> {
    let mut issues = Vec::new();

    if stats.tempo_conflicts > 0 {
        issues.push(
            Issue::new(
                IssueCategory::TempoConflicts,
                Severity::Warning,
                format!("{} track(s) with conflicting tempo", stats.tempo_conflicts),
            )
            .with_affected(stats.tempo_conflicts),
        );
    }
    if stats.key_conflicts > 0 {
        issues.push(
            Issue::new(
                IssueCategory::KeyConflicts,
                Severity::Warning,
                format!("{} track(s) with conflicting key", stats.key_conflicts),
            )
            .with_affected(stats.key_conflicts),
        );
    }

    issues
}
