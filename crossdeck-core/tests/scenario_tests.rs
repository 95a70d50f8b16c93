//! End-to-end reconciliation scenarios
//!
//! Each test feeds a small hand-built library through indexing,
//! reconciliation and validation and checks the unified result.

mod helpers;

use crossdeck_common::config::MatchingConfig;
use crossdeck_common::{PlatformRecord, RecordRef, TrackField};
use crossdeck_core::orchestrator::reconcile_with;
use crossdeck_core::validators::{IssueCategory, Severity};
use crossdeck_core::{
    build_indices, reconcile, validate, ConflictSeverity, CrossMatcher, MatchMethod,
};
use helpers::scenario_config;
use std::collections::{BTreeMap, BTreeSet};

fn raw_counts(records: &[PlatformRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry(r.source.clone()).or_default() += 1;
    }
    counts
}

/// Hub lacks tempo, the other source fills it in
#[test]
fn test_scenario_a_gap_filled_from_other_source() {
    let records = vec![
        PlatformRecord::new("hub", "h1", "Sunrise", "Nova"),
        PlatformRecord::new("b", "b1", "Sunrise", "Nova")
            .with_tempo(128.0)
            .with_path("/m/sunrise.wav"),
    ];
    let indices = build_indices(records).unwrap();

    let unified = reconcile(&indices, Some("hub"));

    assert_eq!(unified.len(), 1);
    let u = &unified[0];
    assert_eq!(u.tempo, Some(128.0));
    assert_eq!(u.source_count(), 2);
    assert_eq!(u.provenance["b"], MatchMethod::ExactTitleArtist);
    assert_eq!(u.path.as_deref(), Some("/m/sunrise.wav"));
    assert!(u.confidence >= 0.5, "confidence {}", u.confidence);
    assert!(u.conflicts.is_empty());
}

/// Both report tempo, ranking prefers b, spread exceeds tolerance
#[test]
fn test_scenario_b_ranked_tempo_with_conflict() {
    let records = vec![
        PlatformRecord::new("hub", "h1", "Sunrise", "Nova").with_tempo(126.0),
        PlatformRecord::new("b", "b1", "Sunrise", "Nova")
            .with_tempo(128.0)
            .with_path("/m/sunrise.wav"),
    ];
    let indices = build_indices(records).unwrap();

    let unified = reconcile_with(&indices, &scenario_config());

    assert_eq!(unified.len(), 1);
    let u = &unified[0];
    assert_eq!(u.tempo, Some(128.0));
    assert_eq!(u.conflicts.len(), 1);

    let conflict = u.conflict(TrackField::Tempo).unwrap();
    assert_eq!(conflict.severity, ConflictSeverity::Medium);
    assert_eq!(conflict.values.len(), 2);
}

/// A lone untitled mix becomes a low-confidence orphan
#[test]
fn test_scenario_c_single_source_orphan() {
    let records = vec![PlatformRecord::new("serato", "s1", "Untitled Mix 3", "")];
    let counts = raw_counts(&records);
    let indices = build_indices(records).unwrap();

    let unified = reconcile(&indices, Some("hub"));

    assert_eq!(unified.len(), 1);
    assert!(unified[0].is_orphan());
    assert!(unified[0].confidence <= 0.2);

    let report = validate(&unified, &counts);
    let orphans: Vec<_> = report.issues_in(IssueCategory::Orphans).collect();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].severity, Severity::Info);
    assert_eq!(orphans[0].details, vec![unified[0].match_id.to_string()]);
}

/// Fuzzy boundary: a spelling variant matches, an unrelated title does not
#[test]
fn test_scenario_d_fuzzy_boundary() {
    let indices = build_indices(vec![
        PlatformRecord::new("hub", "h1", "Midnight City", "Nova"),
        PlatformRecord::new("b", "b1", "Midnite City", "Nova"),
        PlatformRecord::new("c", "c1", "Completely Different Song", "Nova"),
    ])
    .unwrap();
    let seed = indices["hub"].get("h1").unwrap();

    let matches = CrossMatcher::new(MatchingConfig::default()).find_matches(
        seed,
        &indices,
        &BTreeSet::new(),
    );

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].record, RecordRef::new("b", "b1"));
    assert_eq!(matches[0].method, MatchMethod::Fuzzy);
    assert!(matches[0].score >= 0.85);

    let unified = reconcile(&indices, Some("hub"));
    assert_eq!(unified.len(), 2);
    assert_eq!(unified[0].source_count(), 2);
    assert!(unified[1].is_orphan());
}

/// 90 of 100 tracks have tempo, 60 have a key
#[test]
fn test_scenario_e_coverage() {
    let records: Vec<PlatformRecord> = (0..100)
        .map(|i| {
            let mut r = PlatformRecord::new("hub", format!("h{}", i), format!("Track {}", i), "Nova");
            if i < 90 {
                r = r.with_tempo(120.0 + i as f64 / 10.0);
            }
            if i < 60 {
                r = r.with_key("8A");
            }
            r
        })
        .collect();
    let counts = raw_counts(&records);
    let indices = build_indices(records).unwrap();

    let unified = reconcile(&indices, Some("hub"));
    assert_eq!(unified.len(), 100);

    let report = validate(&unified, &counts);
    assert!((report.statistics.tempo_coverage - 0.90).abs() < 1e-9);
    assert!((report.statistics.key_coverage - 0.60).abs() < 1e-9);

    assert_eq!(report.issues_in(IssueCategory::TempoCoverage).count(), 0);
    let key: Vec<_> = report.issues_in(IssueCategory::KeyCoverage).collect();
    assert_eq!(key.len(), 1);
    assert_eq!(key[0].severity, Severity::Warning);
}
