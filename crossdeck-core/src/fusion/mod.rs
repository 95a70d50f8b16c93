//! Fusion of matched records into unified records
//!
//! - `authority`: per-field authority ranking with participant-order fallback
//! - `unifier`: canonical values, conflicts, confidence

pub mod authority;
pub mod unifier;

pub use authority::AuthorityRanking;
pub use unifier::{compute_confidence, detect_conflicts, match_id_for, Unifier};
