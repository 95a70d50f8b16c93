//! Library health validation
//!
//! Runs independent checks over a reconciliation result and folds them into
//! a 0-100 health score. No check can fail the run.
//!
//! # Checks
//! 1. **Source counts** - raw per-source counts vs the hub (or largest source)
//! 2. **Missing files** - canonical paths absent on disk
//! 3. **Completeness** - missing title/artist/album over thresholds
//! 4. **Coverage** - tempo and key coverage below target
//! 5. **Link rate** - share of multi-source tracks, orphan flag
//! 6. **Conflicts** - tempo and key conflict summary

pub mod checks;
pub mod health;

pub use health::{
    health_score, validate, HealthStatus, HealthValidator, Issue, IssueCategory, Severity,
    ValidationReport, ValidationStatistics,
};
