//! Record fixtures shared by the integration tests

use crossdeck_common::{PlatformRecord, TomlConfig};
use crossdeck_core::TrackSource;

/// Source whose load always fails
pub struct FailingSource {
    pub name: String,
}

impl FailingSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TrackSource for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> anyhow::Result<Vec<PlatformRecord>> {
        anyhow::bail!("database file is locked")
    }
}

/// Config with a hub named `hub` and tempo ranked `[b, hub]`
pub fn scenario_config() -> TomlConfig {
    let mut config = TomlConfig::default();
    config.authority.tempo = vec!["b".to_string(), "hub".to_string()];
    config
}

/// A small library spread over a hub and three DJ applications
///
/// - "Sunrise" is in every source (path match, stored id, exact title)
/// - "Midnight City" differs by spelling in serato (fuzzy)
/// - "Deep Cut" exists only in traktor
/// - rekordbox carries a different tempo for "Sunrise"
pub fn hub_and_dj_library() -> Vec<PlatformRecord> {
    vec![
        PlatformRecord::new("hub", "h1", "Sunrise", "Nova")
            .with_album("Dawn")
            .with_path("/music/nova/sunrise.wav")
            .with_linked_id("rekordbox", "r-100"),
        PlatformRecord::new("hub", "h2", "Midnight City", "M83").with_album("Hurry Up"),
        PlatformRecord::new("hub", "h3", "Intro", "The xx"),
        PlatformRecord::new("rekordbox", "r-100", "Sunrise (Original Mix)", "Nova")
            .with_tempo(124.0)
            .with_key("8A")
            .with_rating(4),
        PlatformRecord::new("rekordbox", "r-200", "Midnight City", "M83")
            .with_tempo(105.0)
            .with_key("11B"),
        PlatformRecord::new("serato", "s-1", "sunrise", "NOVA")
            .with_path("/music/nova/sunrise.wav")
            .with_tempo(128.0),
        PlatformRecord::new("serato", "s-2", "Midnite City", "M83").with_tempo(105.0),
        PlatformRecord::new("traktor", "t-1", "Sunrise", "Nova")
            .with_path("/backup/sunrise.wav")
            .with_tempo(128.0)
            .with_key("8A"),
        PlatformRecord::new("traktor", "t-2", "Deep Cut", "Unknown Artist").with_tempo(122.0),
    ]
}
