//! Cross-source matching
//!
//! Similarity metrics and the multi-strategy matcher cascade.

pub mod cross_matcher;
pub mod similarity;

pub use cross_matcher::{select_per_source, CrossMatcher};
pub use similarity::{indel_ratio, similarity};
