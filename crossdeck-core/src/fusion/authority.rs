//! Authority ranking
//!
//! Each field has a fixed, ordered list of sources trusted to provide it.
//! The canonical value is the first ranked participant's non-empty value;
//! when no ranked source has one, the first non-empty value in participant
//! order (hub first, then source order) is used.

use crossdeck_common::config::AuthorityConfig;
use crossdeck_common::{PlatformRecord, TrackField};

/// Per-field authority rankings for one run
#[derive(Debug, Clone, Default)]
pub struct AuthorityRanking {
    config: AuthorityConfig,
}

impl AuthorityRanking {
    pub fn new(config: AuthorityConfig) -> Self {
        Self { config }
    }

    pub fn ranking(&self, field: TrackField) -> &[String] {
        self.config.ranking(field)
    }

    /// Resolve one field over participants given in participant order
    ///
    /// Returns the winning source name with its value.
    pub fn resolve<'a, T, F>(
        &self,
        field: TrackField,
        participants: &[&'a PlatformRecord],
        extract: F,
    ) -> Option<(&'a str, T)>
    where
        F: Fn(&'a PlatformRecord) -> Option<T>,
    {
        for source in self.ranking(field) {
            if let Some(&record) = participants.iter().find(|r| r.source == *source) {
                if let Some(value) = extract(record) {
                    return Some((record.source.as_str(), value));
                }
            }
        }

        participants
            .iter()
            .find_map(|&r| extract(r).map(|v| (r.source.as_str(), v)))
    }

    /// Canonical title, artist or album
    pub fn resolve_text(&self, field: TrackField, participants: &[&PlatformRecord]) -> Option<String> {
        self.resolve(field, participants, |r| {
            let value = match field {
                TrackField::Title => &r.title,
                TrackField::Artist => &r.artist,
                TrackField::Album => &r.album,
                _ => return None,
            };
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .map(|(_, v)| v)
    }

    pub fn resolve_tempo(&self, participants: &[&PlatformRecord]) -> Option<f64> {
        self.resolve(TrackField::Tempo, participants, PlatformRecord::tempo_value)
            .map(|(_, v)| v)
    }

    pub fn resolve_key(&self, participants: &[&PlatformRecord]) -> Option<String> {
        self.resolve(TrackField::Key, participants, |r| {
            r.key_value().map(str::to_string)
        })
        .map(|(_, v)| v)
    }

    /// Canonical rating; zero counts as unrated
    pub fn resolve_rating(&self, participants: &[&PlatformRecord]) -> Option<u8> {
        self.resolve(TrackField::Rating, participants, |r| {
            r.rating.filter(|v| *v > 0)
        })
        .map(|(_, v)| v)
    }
}
