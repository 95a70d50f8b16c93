//! # crossdeck core
//!
//! Reconciles one music library as seen by several sources (a curated hub
//! database and DJ applications) into unified records.
//!
//! Pipeline for one run:
//! - **index** - per-source lookup indices
//! - **matching** - multi-strategy cross-source matcher
//! - **fusion** - canonical values, conflicts, confidence
//! - **orchestrator** - source loading, reconciliation pass, write-back
//! - **validators** - health report over the result
//!
//! The core is synchronous and works on fully loaded in-memory snapshots.
//! Sources plug in through the `TrackSource` trait.

pub mod fusion;
pub mod index;
pub mod matching;
pub mod orchestrator;
pub mod sources;
pub mod types;
pub mod validators;

pub use fusion::Unifier;
pub use index::{build_indices, normalize, Indices, SourceIndex};
pub use matching::CrossMatcher;
pub use orchestrator::{reconcile, ReconcileOutcome, ReconciliationOrchestrator};
pub use sources::{FieldUpdates, InMemorySource, TrackSource, WriteBack};
pub use types::{
    ConflictSeverity, FieldConflict, FieldValue, MatchCandidate, MatchMethod, SourceOrder,
    UnifiedRecord,
};
pub use validators::{validate, HealthStatus, ValidationReport};
