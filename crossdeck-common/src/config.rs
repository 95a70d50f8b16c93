//! Configuration loading
//!
//! Bootstrap configuration is a single TOML file. Every field carries a
//! built-in default, so a missing file (or a file with only a few keys) is
//! valid and yields a working configuration.
//!
//! # Config File Resolution
//!
//! 1. Explicit path from the caller (highest priority)
//! 2. `CROSSDECK_CONFIG` environment variable
//! 3. `<user config dir>/crossdeck/config.toml`
//! 4. Built-in defaults (no file)

use crate::models::TrackField;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CROSSDECK_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Name of the curated hub source, processed first and used as the
    /// reference for source-count comparisons
    #[serde(default = "default_hub_source")]
    pub hub_source: Option<String>,

    /// Processing order for non-hub sources; unlisted sources follow alphabetically
    #[serde(default)]
    pub source_order: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub authority: AuthorityConfig,

    #[serde(default)]
    pub conflicts: ConflictConfig,

    #[serde(default)]
    pub write_back: WriteBackConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            hub_source: default_hub_source(),
            source_order: Vec::new(),
            logging: LoggingConfig::default(),
            matching: MatchingConfig::default(),
            authority: AuthorityConfig::default(),
            conflicts: ConflictConfig::default(),
            write_back: WriteBackConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// String similarity used by the fuzzy title+artist strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// `2 * LCS / (len_a + len_b)`: edit ratio with insertions and deletions only
    #[default]
    Indel,
    /// `1 - levenshtein / max_len`
    Levenshtein,
    JaroWinkler,
}

/// Matcher cascade settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Run the fuzzy title+artist strategy at all
    #[serde(default = "default_true")]
    pub fuzzy_enabled: bool,

    /// Minimum similarity ratio accepted by the fuzzy strategy
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Skip fuzzy pairs whose key lengths differ by more than this share of the longer key
    #[serde(default = "default_length_prefilter")]
    pub length_prefilter: f64,

    #[serde(default)]
    pub similarity_metric: SimilarityMetric,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_enabled: true,
            fuzzy_threshold: default_fuzzy_threshold(),
            length_prefilter: default_length_prefilter(),
            similarity_metric: SimilarityMetric::default(),
        }
    }
}

/// Per-field authority rankings (ordered source names, most authoritative first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfig {
    #[serde(default = "default_descriptive_ranking")]
    pub title: Vec<String>,
    #[serde(default = "default_descriptive_ranking")]
    pub artist: Vec<String>,
    #[serde(default = "default_descriptive_ranking")]
    pub album: Vec<String>,
    #[serde(default = "default_analysis_ranking")]
    pub tempo: Vec<String>,
    #[serde(default = "default_analysis_ranking")]
    pub key: Vec<String>,
    #[serde(default = "default_rating_ranking")]
    pub rating: Vec<String>,
}

impl AuthorityConfig {
    /// Ranking for one field
    pub fn ranking(&self, field: TrackField) -> &[String] {
        match field {
            TrackField::Title => &self.title,
            TrackField::Artist => &self.artist,
            TrackField::Album => &self.album,
            TrackField::Tempo => &self.tempo,
            TrackField::Key => &self.key,
            TrackField::Rating => &self.rating,
        }
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            title: default_descriptive_ranking(),
            artist: default_descriptive_ranking(),
            album: default_descriptive_ranking(),
            tempo: default_analysis_ranking(),
            key: default_analysis_ranking(),
            rating: default_rating_ranking(),
        }
    }
}

/// Conflict detection tolerances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// Tempo spread (max - min, BPM) tolerated before a conflict is flagged
    #[serde(default = "default_tempo_tolerance")]
    pub tempo_tolerance: f64,

    /// Tempo spread above `tempo_tolerance * high_severity_factor` is High severity
    #[serde(default = "default_high_severity_factor")]
    pub high_severity_factor: f64,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            tempo_tolerance: default_tempo_tolerance(),
            high_severity_factor: default_high_severity_factor(),
        }
    }
}

/// Best-effort write-back of canonical values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteBackConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Sources allowed to receive updates (empty = every writable source)
    #[serde(default)]
    pub sources: Vec<String>,

    /// Fields pushed back to sources
    #[serde(default = "default_write_fields")]
    pub fields: Vec<TrackField>,

    /// Unified records below this confidence are never written back
    #[serde(default = "default_write_min_confidence")]
    pub min_confidence: f64,
}

impl WriteBackConfig {
    /// Whether updates may be sent to `source`
    pub fn allows_source(&self, source: &str) -> bool {
        self.sources.is_empty() || self.sources.iter().any(|s| s == source)
    }
}

impl Default for WriteBackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sources: Vec::new(),
            fields: default_write_fields(),
            min_confidence: default_write_min_confidence(),
        }
    }
}

/// Validator thresholds (ratios in 0.0-1.0)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_count_warning_ratio")]
    pub count_warning_ratio: f64,
    #[serde(default = "default_count_error_ratio")]
    pub count_error_ratio: f64,

    #[serde(default = "default_true")]
    pub check_missing_files: bool,
    /// Missing share of path-bearing records above which missing files is an ERROR
    #[serde(default = "default_missing_files_error_ratio")]
    pub missing_files_error_ratio: f64,

    #[serde(default = "default_title_missing_max")]
    pub title_missing_max: f64,
    #[serde(default = "default_artist_missing_max")]
    pub artist_missing_max: f64,
    #[serde(default = "default_album_missing_max")]
    pub album_missing_max: f64,

    #[serde(default = "default_tempo_coverage_target")]
    pub tempo_coverage_target: f64,
    #[serde(default = "default_key_coverage_target")]
    pub key_coverage_target: f64,

    #[serde(default = "default_link_rate_target")]
    pub link_rate_target: f64,
    #[serde(default = "default_orphan_rate_max")]
    pub orphan_rate_max: f64,

    /// Maximum number of example entries listed in one issue
    #[serde(default = "default_detail_cap")]
    pub detail_cap: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            count_warning_ratio: default_count_warning_ratio(),
            count_error_ratio: default_count_error_ratio(),
            check_missing_files: true,
            missing_files_error_ratio: default_missing_files_error_ratio(),
            title_missing_max: default_title_missing_max(),
            artist_missing_max: default_artist_missing_max(),
            album_missing_max: default_album_missing_max(),
            tempo_coverage_target: default_tempo_coverage_target(),
            key_coverage_target: default_key_coverage_target(),
            link_rate_target: default_link_rate_target(),
            orphan_rate_max: default_orphan_rate_max(),
            detail_cap: default_detail_cap(),
        }
    }
}

fn default_hub_source() -> Option<String> {
    Some("hub".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fuzzy_threshold() -> f64 {
    0.85
}

fn default_length_prefilter() -> f64 {
    0.5
}

fn ranking(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// Hub is authoritative for descriptive metadata
fn default_descriptive_ranking() -> Vec<String> {
    ranking(&["hub", "rekordbox", "serato", "traktor", "mixed_in_key"])
}

// Dedicated analysis tools first for tempo/key
fn default_analysis_ranking() -> Vec<String> {
    ranking(&["mixed_in_key", "rekordbox", "traktor", "serato", "hub"])
}

fn default_rating_ranking() -> Vec<String> {
    ranking(&["rekordbox", "serato", "traktor", "hub"])
}

fn default_tempo_tolerance() -> f64 {
    1.0
}

fn default_high_severity_factor() -> f64 {
    5.0
}

fn default_write_fields() -> Vec<TrackField> {
    vec![TrackField::Tempo, TrackField::Key]
}

fn default_write_min_confidence() -> f64 {
    0.5
}

fn default_count_warning_ratio() -> f64 {
    0.05
}

fn default_count_error_ratio() -> f64 {
    0.15
}

fn default_missing_files_error_ratio() -> f64 {
    0.05
}

fn default_title_missing_max() -> f64 {
    0.01
}

fn default_artist_missing_max() -> f64 {
    0.05
}

fn default_album_missing_max() -> f64 {
    0.25
}

fn default_tempo_coverage_target() -> f64 {
    0.80
}

fn default_key_coverage_target() -> f64 {
    0.70
}

fn default_link_rate_target() -> f64 {
    0.90
}

fn default_orphan_rate_max() -> f64 {
    0.10
}

fn default_detail_cap() -> usize {
    20
}

impl TomlConfig {
    /// Hub source name; an empty `hub_source` means no hub
    pub fn hub(&self) -> Option<&str> {
        self.hub_source.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    /// Parse configuration from TOML text and check value ranges
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// A missing file is not an error: a warning is logged and defaults are
    /// returned. An unreadable or malformed file is.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                path = %path.display(),
                "Config file not found, using built-in defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Resolve the config file location and load it
    pub fn resolve_and_load(explicit: Option<&Path>) -> Result<Self> {
        match resolve_config_path(explicit) {
            Some(path) => Self::load(&path),
            None => {
                info!("No config file located, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Serialize back to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))
    }

    /// Reject thresholds outside their meaningful ranges
    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("matching.fuzzy_threshold", self.matching.fuzzy_threshold),
            ("matching.length_prefilter", self.matching.length_prefilter),
            ("write_back.min_confidence", self.write_back.min_confidence),
            ("validation.count_warning_ratio", self.validation.count_warning_ratio),
            ("validation.count_error_ratio", self.validation.count_error_ratio),
            (
                "validation.missing_files_error_ratio",
                self.validation.missing_files_error_ratio,
            ),
            ("validation.title_missing_max", self.validation.title_missing_max),
            ("validation.artist_missing_max", self.validation.artist_missing_max),
            ("validation.album_missing_max", self.validation.album_missing_max),
            ("validation.tempo_coverage_target", self.validation.tempo_coverage_target),
            ("validation.key_coverage_target", self.validation.key_coverage_target),
            ("validation.link_rate_target", self.validation.link_rate_target),
            ("validation.orphan_rate_max", self.validation.orphan_rate_max),
        ];

        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
        }

        let tolerance = self.conflicts.tempo_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(Error::Config(format!(
                "conflicts.tempo_tolerance must be non-negative, got {}",
                self.conflicts.tempo_tolerance
            )));
        }

        if self.validation.count_error_ratio < self.validation.count_warning_ratio {
            return Err(Error::Config(
                "validation.count_error_ratio must not be below count_warning_ratio".to_string(),
            ));
        }

        Ok(())
    }
}

/// Locate the config file following the documented priority order
///
/// Returns `None` when no candidate exists; callers fall back to defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: explicit path, returned even if missing so `load` can warn about it
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: user config directory
    dirs::config_dir()
        .map(|d| d.join("crossdeck").join("config.toml"))
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.hub_source.as_deref(), Some("hub"));
        assert_eq!(config.matching.fuzzy_threshold, 0.85);
        assert_eq!(config.matching.similarity_metric, SimilarityMetric::Indel);
        assert_eq!(config.conflicts.tempo_tolerance, 1.0);
        assert!(!config.write_back.enabled);
        assert_eq!(config.validation.tempo_coverage_target, 0.80);
        assert_eq!(config.validation.key_coverage_target, 0.70);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_equals_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.hub_source.as_deref(), Some("hub"));
        assert_eq!(config.authority.tempo, default_analysis_ranking());
        assert_eq!(
            config.write_back.fields,
            vec![TrackField::Tempo, TrackField::Key]
        );
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
            hub_source = "library"
            source_order = ["traktor", "serato"]

            [matching]
            fuzzy_threshold = 0.9
            similarity_metric = "jaro_winkler"

            [authority]
            tempo = ["traktor", "library"]

            [write_back]
            enabled = true
            fields = ["tempo"]
        "#;

        let config = TomlConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.hub(), Some("library"));
        assert_eq!(config.source_order, vec!["traktor", "serato"]);
        assert_eq!(config.matching.fuzzy_threshold, 0.9);
        assert_eq!(config.matching.similarity_metric, SimilarityMetric::JaroWinkler);
        assert!(config.matching.fuzzy_enabled);
        assert_eq!(config.authority.ranking(TrackField::Tempo), ["traktor", "library"]);
        assert_eq!(config.authority.title, default_descriptive_ranking());
        assert!(config.write_back.enabled);
        assert_eq!(config.write_back.fields, vec![TrackField::Tempo]);
    }

    #[test]
    fn test_empty_hub_means_no_hub() {
        let config = TomlConfig::from_toml_str("hub_source = \"\"\n").unwrap();
        assert_eq!(config.hub(), None);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let err = TomlConfig::from_toml_str("[matching]\nfuzzy_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("fuzzy_threshold")));
    }

    #[test]
    fn test_inverted_count_ratios_rejected() {
        let toml = "[validation]\ncount_warning_ratio = 0.3\ncount_error_ratio = 0.1\n";
        assert!(TomlConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = TomlConfig::from_toml_str("hub_source = [").unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }

    #[test]
    fn test_write_back_source_filter() {
        let mut config = WriteBackConfig::default();
        assert!(config.allows_source("serato"));
        config.sources = vec!["rekordbox".to_string()];
        assert!(config.allows_source("rekordbox"));
        assert!(!config.allows_source("serato"));
    }

    #[test]
    fn test_round_trip_through_toml_text() {
        let config = TomlConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = TomlConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.authority.key, config.authority.key);
        assert_eq!(parsed.validation.detail_cap, config.validation.detail_cap);
    }
}
