//! Common error types for crossdeck

use thiserror::Error;

/// Common result type for crossdeck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across crossdeck crates
///
/// Only setup-time contract violations and configuration problems live here.
/// "No match" and "conflicting values" are ordinary results, never errors.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration file could not be parsed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Two sources registered under the same name
    #[error("Source already registered: {0}")]
    DuplicateSource(String),

    /// Two records in one source share the same native id
    #[error("Duplicate record id '{id}' in source '{source_name}'")]
    DuplicateRecordId { source_name: String, id: String },

    /// A record was handed to the index of a different source
    #[error("Record '{id}' belongs to source '{actual}', not '{expected}'")]
    SourceMismatch {
        expected: String,
        actual: String,
        id: String,
    },

    /// Every registered source failed to load
    #[error("No source could be loaded ({0} attempted)")]
    NoSourcesLoaded(usize),
}
