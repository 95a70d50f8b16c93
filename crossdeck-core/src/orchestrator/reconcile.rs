//! Reconciliation pass
//!
//! Sources are visited hub first, then in configured order, then
//! alphabetically. Within a source, records are visited in load order. Each
//! unclaimed record seeds one unified record together with the records the
//! matcher links to it; every participant is then claimed. The claimed set
//! only grows, so the pass terminates, and every input record ends up in
//! exactly one unified record.

use crate::fusion::Unifier;
use crate::index::Indices;
use crate::matching::{select_per_source, CrossMatcher};
use crate::types::{MatchMethod, SourceOrder, UnifiedRecord};
use crossdeck_common::{PlatformRecord, RecordRef, TomlConfig};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Matcher, unifier and source order for one run
#[derive(Debug, Clone)]
pub struct Reconciler {
    matcher: CrossMatcher,
    unifier: Unifier,
    order: SourceOrder,
}

impl Reconciler {
    /// Build the per-run pipeline for the sources present in `indices`
    pub fn new(config: &TomlConfig, indices: &Indices) -> Self {
        let order = SourceOrder::new(config.hub(), &config.source_order, indices.keys());
        Self {
            matcher: CrossMatcher::new(config.matching.clone()),
            unifier: Unifier::new(
                config.authority.clone(),
                config.conflicts.clone(),
                order.clone(),
            ),
            order,
        }
    }

    pub fn order(&self) -> &SourceOrder {
        &self.order
    }

    /// Partition every indexed record into unified records
    pub fn run(&self, indices: &Indices) -> Vec<UnifiedRecord> {
        let mut claimed: BTreeSet<RecordRef> = BTreeSet::new();
        let mut unified = Vec::new();

        for source in self.order.iter() {
            let Some(index) = indices.get(source) else {
                continue;
            };

            for seed in index.records() {
                let seed_ref = seed.record_ref();
                if claimed.contains(&seed_ref) {
                    continue;
                }

                let candidates = self.matcher.find_matches(seed, indices, &claimed);
                let matched: Vec<(Arc<PlatformRecord>, MatchMethod)> =
                    select_per_source(candidates, &self.order)
                        .into_iter()
                        .filter_map(|c| {
                            indices
                                .get(&c.record.source)
                                .and_then(|i| i.get(&c.record.id))
                                .map(|r| (Arc::clone(r), c.method))
                        })
                        .collect();

                claimed.insert(seed_ref);
                claimed.extend(matched.iter().map(|(r, _)| r.record_ref()));

                unified.push(self.unifier.unify(Arc::clone(seed), matched));
            }

            debug!(source, claimed = claimed.len(), "Source pass complete");
        }

        unified
    }
}

/// Reconcile with default settings and the given hub source
pub fn reconcile(indices: &Indices, hub: Option<&str>) -> Vec<UnifiedRecord> {
    let config = TomlConfig {
        hub_source: hub.map(str::to_string),
        ..TomlConfig::default()
    };
    reconcile_with(indices, &config)
}

/// Reconcile with explicit configuration
pub fn reconcile_with(indices: &Indices, config: &TomlConfig) -> Vec<UnifiedRecord> {
    Reconciler::new(config, indices).run(indices)
}
