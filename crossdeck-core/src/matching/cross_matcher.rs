//! Cross-Source Matcher
//!
//! Given a seed record, finds every record in the *other* sources that
//! plausibly denotes the same track. Strategies run as a cascade but their
//! results are unioned rather than short-circuited:
//!
//! 1. Exact file path (case-insensitive)
//! 2. Exact file name (relocated files)
//! 3. Exact normalized title+artist key
//! 4. Fuzzy title+artist key (similarity ≥ threshold, length pre-filtered)
//! 5. Stored cross-platform id (either direction)
//!
//! When several strategies find the same record, the strongest one is kept
//! as its `MatchMethod`. An empty result is the normal "no match" outcome.

use super::similarity::{lengths_too_different, similarity};
use crate::index::{title_artist_key, Indices, SourceIndex};
use crate::types::{MatchCandidate, MatchMethod, SourceOrder};
use crossdeck_common::config::MatchingConfig;
use crossdeck_common::{PlatformRecord, RecordRef};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Multi-strategy cross-source matcher
#[derive(Debug, Clone)]
pub struct CrossMatcher {
    config: MatchingConfig,
}

impl CrossMatcher {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Matcher with the fuzzy threshold overridden (clamped to 0.0-1.0)
    pub fn with_threshold(mut config: MatchingConfig, threshold: f64) -> Self {
        config.fuzzy_threshold = threshold.clamp(0.0, 1.0);
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Union of all plausible matches for `seed` across other sources
    ///
    /// Records of the seed's own source and refs in `claimed` are never
    /// returned. Output is sorted strongest first, then by source name and
    /// record id.
    pub fn find_matches(
        &self,
        seed: &PlatformRecord,
        indices: &Indices,
        claimed: &BTreeSet<RecordRef>,
    ) -> Vec<MatchCandidate> {
        let mut found: BTreeMap<RecordRef, MatchCandidate> = BTreeMap::new();
        let seed_key = title_artist_key(&seed.title, &seed.artist);

        for (source, index) in indices {
            if *source == seed.source {
                continue;
            }

            let mut add = |record: &Arc<PlatformRecord>, method: MatchMethod, score: f64| {
                let r = record.record_ref();
                if claimed.contains(&r) {
                    return;
                }
                found
                    .entry(r.clone())
                    .and_modify(|c| c.absorb(method, score))
                    .or_insert_with(|| MatchCandidate::new(r, method, score));
            };

            // Strategy 1: exact path
            if let Some(path) = seed.path_str() {
                for record in index.by_path(path) {
                    add(record, MatchMethod::Path, 1.0);
                }
            }

            // Strategy 2: file name only
            if let Some(name) = seed.file_name() {
                for record in index.by_filename(name) {
                    add(record, MatchMethod::Filename, 1.0);
                }
            }

            // Strategy 3: exact normalized title+artist
            if let Some(key) = seed_key.as_deref() {
                for record in index.by_title_artist(key) {
                    add(record, MatchMethod::ExactTitleArtist, 1.0);
                }

                // Strategy 4: fuzzy title+artist
                if self.config.fuzzy_enabled {
                    for (record, score) in self.fuzzy_scan(key, index) {
                        add(record, MatchMethod::Fuzzy, score);
                    }
                }
            }

            // Strategy 5: stored cross-platform ids, seed → other
            if let Some(linked_id) = seed.linked_ids.get(source) {
                if let Some(record) = index.get(linked_id) {
                    add(record, MatchMethod::StoredId, 1.0);
                }
            }
            // ... and other → seed
            for record in index.linked_to(&seed.source, &seed.id) {
                add(record, MatchMethod::StoredId, 1.0);
            }
        }

        let mut candidates: Vec<MatchCandidate> = found.into_values().collect();
        candidates.sort_by(compare_strength);

        debug!(
            seed = %seed.record_ref(),
            candidates = candidates.len(),
            "Cross-source matching complete"
        );

        candidates
    }

    /// Fuzzy scan of every indexed key of one source
    fn fuzzy_scan<'a>(&self, key: &str, index: &'a SourceIndex) -> Vec<(&'a Arc<PlatformRecord>, f64)> {
        let key_len = key.chars().count();
        let mut hits = Vec::new();

        for (other_key, entry, records) in index.title_artist_entries() {
            if other_key == key {
                continue; // covered by the exact strategy
            }
            if lengths_too_different(key_len, entry.char_len, self.config.length_prefilter) {
                continue;
            }

            let score = similarity(self.config.similarity_metric, key, other_key);
            if score >= self.config.fuzzy_threshold {
                hits.extend(records.into_iter().map(|r| (r, score)));
            }
        }

        hits
    }
}

impl Default for CrossMatcher {
    fn default() -> Self {
        Self::new(MatchingConfig::default())
    }
}

/// Strongest first: method, then score, then source name, then record id
fn compare_strength(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.method
        .cmp(&a.method)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.record.cmp(&b.record))
}

/// Reduce a candidate set to at most one record per source
///
/// The strongest candidate of each source wins; equal strength is broken by
/// record id so the choice never depends on iteration order. Output follows
/// `order`. Losing candidates stay unclaimed and seed their own unified
/// record later in the run.
pub fn select_per_source(candidates: Vec<MatchCandidate>, order: &SourceOrder) -> Vec<MatchCandidate> {
    let mut best: BTreeMap<String, MatchCandidate> = BTreeMap::new();

    for candidate in candidates {
        match best.get(&candidate.record.source) {
            Some(current) if compare_strength(current, &candidate) != Ordering::Greater => {}
            _ => {
                best.insert(candidate.record.source.clone(), candidate);
            }
        }
    }

    let mut selected: Vec<MatchCandidate> = best.into_values().collect();
    selected.sort_by(|a, b| {
        order
            .rank(&a.record.source)
            .cmp(&order.rank(&b.record.source))
            .then_with(|| a.record.source.cmp(&b.record.source))
    });
    selected
}
