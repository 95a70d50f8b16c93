//! # crossdeck common library
//!
//! Shared code for the crossdeck crates:
//! - Source record model handed over by adapters
//! - Configuration loading (TOML)
//! - Tracing initialization
//! - Error types

pub mod config;
pub mod error;
pub mod logging;
pub mod models;

pub use config::TomlConfig;
pub use error::{Error, Result};
pub use models::{PlatformRecord, RecordRef, TrackField};
