//! Unifier
//!
//! Turns a seed record and its matched set into one `UnifiedRecord`:
//! canonical values per field via authority ranking, field conflicts,
//! canonical path and a heuristic confidence score. Never fails.
//!
//! # Confidence
//! - +0.2 per participating source, capped at 0.6
//! - +0.3 when at least two sources store exactly the same file path
//! - +0.1 when no conflicts were found and at least two sources participate
//! - clamped to 0.0-1.0

use super::authority::AuthorityRanking;
use crate::types::{
    ConflictSeverity, FieldConflict, FieldValue, MatchMethod, SourceOrder, UnifiedRecord,
};
use crossdeck_common::config::{AuthorityConfig, ConflictConfig};
use crossdeck_common::{PlatformRecord, RecordRef, TrackField};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Namespace for deterministic match ids
const MATCH_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_0e2a_93b4_4d7e_a5c8_21f0_7d3e_9b41);

const PER_SOURCE_CONFIDENCE: f64 = 0.2;
const SOURCE_CONFIDENCE_CAP: f64 = 0.6;
const PATH_AGREEMENT_BONUS: f64 = 0.3;
const NO_CONFLICT_BONUS: f64 = 0.1;

/// Deterministic match id for the unified record seeded by `seed`
pub fn match_id_for(seed: &RecordRef) -> Uuid {
    let name = format!("{}\u{1f}{}", seed.source, seed.id);
    Uuid::new_v5(&MATCH_NAMESPACE, name.as_bytes())
}

/// Builds unified records for one run
#[derive(Debug, Clone)]
pub struct Unifier {
    authority: AuthorityRanking,
    conflicts: ConflictConfig,
    order: SourceOrder,
}

impl Unifier {
    pub fn new(authority: AuthorityConfig, conflicts: ConflictConfig, order: SourceOrder) -> Self {
        Self {
            authority: AuthorityRanking::new(authority),
            conflicts,
            order,
        }
    }

    pub fn authority(&self) -> &AuthorityRanking {
        &self.authority
    }

    /// Build the unified record for `seed` and its matched records
    ///
    /// At most one record per source participates; the seed always wins its
    /// own source, and among matched records the first one given wins.
    pub fn unify(
        &self,
        seed: Arc<PlatformRecord>,
        matched: Vec<(Arc<PlatformRecord>, MatchMethod)>,
    ) -> UnifiedRecord {
        let seed_ref = seed.record_ref();
        let mut records: BTreeMap<String, Arc<PlatformRecord>> = BTreeMap::new();
        let mut provenance: BTreeMap<String, MatchMethod> = BTreeMap::new();

        records.insert(seed.source.clone(), seed);
        provenance.insert(seed_ref.source.clone(), MatchMethod::Seed);

        for (record, method) in matched {
            if records.contains_key(&record.source) {
                debug!(
                    seed = %seed_ref,
                    dropped = %record.record_ref(),
                    "Second record from the same source ignored"
                );
                continue;
            }
            provenance.insert(record.source.clone(), method);
            records.insert(record.source.clone(), record);
        }

        let participants = self.participant_order(&records);

        let title = self.authority.resolve_text(TrackField::Title, &participants);
        let artist = self.authority.resolve_text(TrackField::Artist, &participants);
        let album = self.authority.resolve_text(TrackField::Album, &participants);
        let tempo = self.authority.resolve_tempo(&participants);
        let key = self.authority.resolve_key(&participants);
        let rating = self.authority.resolve_rating(&participants);
        let path = participants
            .iter()
            .find_map(|r| r.path_str())
            .map(str::to_string);

        let mut conflicts = detect_conflicts(&participants, &self.conflicts);
        for conflict in &mut conflicts {
            conflict.resolved = match conflict.field {
                TrackField::Tempo => tempo.map(FieldValue::Number),
                TrackField::Key => key.clone().map(FieldValue::Text),
                _ => None,
            };
        }

        let confidence = compute_confidence(
            participants.len(),
            paths_agree(&participants),
            conflicts.len(),
        );

        let sources: BTreeSet<String> = records.keys().cloned().collect();

        debug!(
            seed = %seed_ref,
            sources = sources.len(),
            conflicts = conflicts.len(),
            confidence,
            "Unified record built"
        );

        UnifiedRecord {
            match_id: match_id_for(&seed_ref),
            records,
            provenance,
            title: title.unwrap_or_default(),
            artist: artist.unwrap_or_default(),
            album: album.unwrap_or_default(),
            tempo,
            key,
            rating,
            path,
            confidence,
            conflicts,
            sources,
        }
    }

    /// Participants ordered hub first, then source order
    fn participant_order<'a>(
        &self,
        records: &'a BTreeMap<String, Arc<PlatformRecord>>,
    ) -> Vec<&'a PlatformRecord> {
        let mut participants: Vec<&PlatformRecord> = records.values().map(Arc::as_ref).collect();
        participants.sort_by(|a, b| {
            self.order
                .rank(&a.source)
                .cmp(&self.order.rank(&b.source))
                .then_with(|| a.source.cmp(&b.source))
        });
        participants
    }
}

/// Tempo and key disagreements among participants
///
/// The result depends only on the set of reported values, never on the
/// order participants are given in. `resolved` is left empty.
pub fn detect_conflicts(participants: &[&PlatformRecord], config: &ConflictConfig) -> Vec<FieldConflict> {
    let mut conflicts = Vec::new();

    let tempos: BTreeMap<String, f64> = participants
        .iter()
        .filter_map(|r| r.tempo_value().map(|t| (r.source.clone(), t)))
        .collect();

    if tempos.len() >= 2 {
        let max = tempos.values().copied().fold(f64::MIN, f64::max);
        let min = tempos.values().copied().fold(f64::MAX, f64::min);
        let spread = max - min;

        if spread > config.tempo_tolerance {
            let severity = if spread > config.tempo_tolerance * config.high_severity_factor {
                ConflictSeverity::High
            } else {
                ConflictSeverity::Medium
            };
            conflicts.push(FieldConflict {
                field: TrackField::Tempo,
                values: tempos
                    .into_iter()
                    .map(|(s, t)| (s, FieldValue::Number(t)))
                    .collect(),
                severity,
                resolved: None,
            });
        }
    }

    let keys: BTreeMap<String, &str> = participants
        .iter()
        .filter_map(|r| r.key_value().map(|k| (r.source.clone(), k)))
        .collect();
    let distinct: HashSet<&str> = keys.values().copied().collect();

    if keys.len() >= 2 && distinct.len() > 1 {
        conflicts.push(FieldConflict {
            field: TrackField::Key,
            values: keys
                .into_iter()
                .map(|(s, k)| (s, FieldValue::Text(k.to_string())))
                .collect(),
            severity: ConflictSeverity::Medium,
            resolved: None,
        });
    }

    conflicts
}

/// Heuristic match reliability in 0.0-1.0
pub fn compute_confidence(source_count: usize, path_agreement: bool, conflict_count: usize) -> f64 {
    let mut confidence = (PER_SOURCE_CONFIDENCE * source_count as f64).min(SOURCE_CONFIDENCE_CAP);

    if path_agreement {
        confidence += PATH_AGREEMENT_BONUS;
    }
    if conflict_count == 0 && source_count >= 2 {
        confidence += NO_CONFLICT_BONUS;
    }

    confidence.clamp(0.0, 1.0)
}

/// At least two participants store exactly the same path (after trimming)
///
/// Stricter than the matcher's path lookup: a case or separator variant
/// still links the records but earns no agreement bonus.
fn paths_agree(participants: &[&PlatformRecord]) -> bool {
    let mut seen = HashSet::new();
    participants
        .iter()
        .filter_map(|r| r.path_str())
        .any(|p| !seen.insert(p.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unifier(tempo_ranking: &[&str]) -> Unifier {
        let authority = AuthorityConfig {
            tempo: tempo_ranking.iter().map(|s| s.to_string()).collect(),
            ..AuthorityConfig::default()
        };
        let sources: Vec<String> = ["hub", "b", "c"].iter().map(|s| s.to_string()).collect();
        let order = SourceOrder::new(Some("hub"), &[], &sources);
        Unifier::new(authority, ConflictConfig::default(), order)
    }

    #[test]
    fn test_confidence_formula() {
        assert!((compute_confidence(1, false, 0) - 0.2).abs() < 1e-9);
        assert!((compute_confidence(2, false, 0) - 0.5).abs() < 1e-9);
        assert!((compute_confidence(2, false, 1) - 0.4).abs() < 1e-9);
        assert!((compute_confidence(2, true, 0) - 0.8).abs() < 1e-9);
        assert!((compute_confidence(5, true, 0) - 1.0).abs() < 1e-9);
        assert!((compute_confidence(0, false, 0)).abs() < 1e-9);
    }

    #[test]
    fn test_tempo_conflict_within_tolerance_is_not_flagged() {
        let a = PlatformRecord::new("hub", "1", "", "").with_tempo(128.0);
        let b = PlatformRecord::new("b", "2", "", "").with_tempo(128.9);
        assert!(detect_conflicts(&[&a, &b], &ConflictConfig::default()).is_empty());
    }

    #[test]
    fn test_tempo_conflict_severity() {
        let a = PlatformRecord::new("hub", "1", "", "").with_tempo(126.0);
        let b = PlatformRecord::new("b", "2", "", "").with_tempo(128.0);
        let c = PlatformRecord::new("c", "3", "", "").with_tempo(64.0);

        let medium = detect_conflicts(&[&a, &b], &ConflictConfig::default());
        assert_eq!(medium.len(), 1);
        assert_eq!(medium[0].severity, ConflictSeverity::Medium);

        let high = detect_conflicts(&[&a, &b, &c], &ConflictConfig::default());
        assert_eq!(high[0].severity, ConflictSeverity::High);
        assert_eq!(high[0].values.len(), 3);
    }

    #[test]
    fn test_key_conflict_exact_compare() {
        let a = PlatformRecord::new("hub", "1", "", "").with_key("C#");
        let b = PlatformRecord::new("b", "2", "", "").with_key("Db");
        let c = PlatformRecord::new("c", "3", "", "").with_key("C#");

        let conflicts = detect_conflicts(&[&a, &b], &ConflictConfig::default());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].field, TrackField::Key);

        assert!(detect_conflicts(&[&a, &c], &ConflictConfig::default()).is_empty());
    }

    #[test]
    fn test_conflicts_independent_of_order() {
        let a = PlatformRecord::new("hub", "1", "", "").with_tempo(120.0).with_key("8A");
        let b = PlatformRecord::new("b", "2", "", "").with_tempo(125.0).with_key("9A");
        let c = PlatformRecord::new("c", "3", "", "").with_tempo(121.0).with_key("8A");
        let config = ConflictConfig::default();

        let forward = detect_conflicts(&[&a, &b, &c], &config);
        let backward = detect_conflicts(&[&c, &b, &a], &config);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_unify_fills_gaps_from_other_sources() {
        let hub = Arc::new(PlatformRecord::new("hub", "h1", "Sunrise", "Nova"));
        let b = Arc::new(
            PlatformRecord::new("b", "b1", "Sunrise", "Nova")
                .with_tempo(128.0)
                .with_path("/m/sunrise.wav"),
        );

        let unified = unifier(&["b", "hub"]).unify(hub, vec![(b, MatchMethod::ExactTitleArtist)]);

        assert_eq!(unified.title, "Sunrise");
        assert_eq!(unified.tempo, Some(128.0));
        assert_eq!(unified.path.as_deref(), Some("/m/sunrise.wav"));
        assert_eq!(unified.source_count(), 2);
        assert!(unified.conflicts.is_empty());
        assert!(unified.confidence >= 0.5);
        assert_eq!(unified.provenance["hub"], MatchMethod::Seed);
        assert_eq!(unified.provenance["b"], MatchMethod::ExactTitleArtist);
    }

    #[test]
    fn test_unify_records_resolved_conflict_value() {
        let hub = Arc::new(PlatformRecord::new("hub", "h1", "Sunrise", "Nova").with_tempo(126.0));
        let b = Arc::new(PlatformRecord::new("b", "b1", "Sunrise", "Nova").with_tempo(128.0));

        let unified = unifier(&["b", "hub"]).unify(hub, vec![(b, MatchMethod::ExactTitleArtist)]);

        assert_eq!(unified.tempo, Some(128.0));
        let conflict = unified.conflict(TrackField::Tempo).unwrap();
        assert_eq!(conflict.resolved, Some(FieldValue::Number(128.0)));
    }

    #[test]
    fn test_unify_keeps_one_record_per_source() {
        let hub = Arc::new(PlatformRecord::new("hub", "h1", "Sunrise", "Nova"));
        let b1 = Arc::new(PlatformRecord::new("b", "b1", "Sunrise", "Nova"));
        let b2 = Arc::new(PlatformRecord::new("b", "b2", "Sunrise", "Nova"));
        let own = Arc::new(PlatformRecord::new("hub", "h2", "Sunrise", "Nova"));

        let unified = unifier(&[]).unify(
            hub,
            vec![
                (b1, MatchMethod::Path),
                (b2, MatchMethod::Path),
                (own, MatchMethod::Path),
            ],
        );

        assert_eq!(unified.source_count(), 2);
        assert_eq!(unified.record("b").map(|r| r.id.as_str()), Some("b1"));
        assert_eq!(unified.record("hub").map(|r| r.id.as_str()), Some("h1"));
    }

    #[test]
    fn test_path_agreement_bonus() {
        let hub = Arc::new(PlatformRecord::new("hub", "h1", "A", "X").with_path("/m/a.wav"));
        let b = Arc::new(PlatformRecord::new("b", "b1", "A", "X").with_path(" /m/a.wav"));

        let unified = unifier(&[]).unify(hub, vec![(b, MatchMethod::Path)]);
        assert!((unified.confidence - 0.8).abs() < 1e-9);
        assert_eq!(unified.path.as_deref(), Some("/m/a.wav"));
    }

    #[test]
    fn test_path_case_variant_earns_no_bonus() {
        let hub = Arc::new(PlatformRecord::new("hub", "h1", "A", "X").with_path("/M/a.wav"));
        let b = Arc::new(PlatformRecord::new("b", "b1", "A", "X").with_path("/m/A.wav"));

        let unified = unifier(&[]).unify(hub, vec![(b, MatchMethod::Path)]);
        assert!((unified.confidence - 0.5).abs() < 1e-9);
        assert_eq!(unified.path.as_deref(), Some("/M/a.wav"));
    }

    #[test]
    fn test_match_id_deterministic() {
        let a = match_id_for(&RecordRef::new("hub", "1"));
        let b = match_id_for(&RecordRef::new("hub", "1"));
        let c = match_id_for(&RecordRef::new("hub1", ""));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.get_version_num(), 5);
    }
}
