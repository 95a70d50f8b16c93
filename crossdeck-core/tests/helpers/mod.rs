//! Test Helper Utilities
//!
//! Shared fixtures and log capture for crossdeck-core integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod log_capture;

pub use fixtures::{hub_and_dj_library, scenario_config, FailingSource};
pub use log_capture::{capture_logs, LogCapture};
