//! Source record models
//!
//! Shape of a track as handed to the core by a source adapter. Adapters own
//! the loading; once a `PlatformRecord` exists it is never mutated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of one record within one reconciliation run: `(source, id)`
///
/// Ordered by source name, then id, so sets of refs iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub source: String,
    pub id: String,
}

impl RecordRef {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

/// Reconciled track fields subject to authority ranking and write-back
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackField {
    Title,
    Artist,
    Album,
    Tempo,
    Key,
    Rating,
}

impl TrackField {
    pub const ALL: [TrackField; 6] = [
        TrackField::Title,
        TrackField::Artist,
        TrackField::Album,
        TrackField::Tempo,
        TrackField::Key,
        TrackField::Rating,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackField::Title => "title",
            TrackField::Artist => "artist",
            TrackField::Album => "album",
            TrackField::Tempo => "tempo",
            TrackField::Key => "key",
            TrackField::Rating => "rating",
        }
    }
}

impl fmt::Display for TrackField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One track's view from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformRecord {
    /// Source identifier (e.g. "hub", "rekordbox")
    pub source: String,
    /// Opaque source-local id
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Absolute file path as the source stores it
    #[serde(default)]
    pub path: Option<String>,
    /// Tempo in BPM
    #[serde(default)]
    pub tempo: Option<f64>,
    /// Musical key, compared verbatim
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub play_count: u32,
    /// Native ids of this track in other sources (source → id)
    #[serde(default)]
    pub linked_ids: BTreeMap<String, String>,
    /// Adapter-private payload, only ever read back by the same adapter
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl PlatformRecord {
    /// Create a record with only source, id, title and artist set
    pub fn new(
        source: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: String::new(),
            path: None,
            tempo: None,
            key: None,
            rating: None,
            play_count: 0,
            linked_ids: BTreeMap::new(),
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = Some(tempo);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_linked_id(mut self, source: impl Into<String>, id: impl Into<String>) -> Self {
        self.linked_ids.insert(source.into(), id.into());
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn record_ref(&self) -> RecordRef {
        RecordRef::new(self.source.clone(), self.id.clone())
    }

    /// Path, if present and not blank
    pub fn path_str(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Final path component (handles both `/` and `\` separators)
    pub fn file_name(&self) -> Option<&str> {
        let name = self.path_str()?.rsplit(['/', '\\']).next()?;
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// Tempo, if present and positive
    pub fn tempo_value(&self) -> Option<f64> {
        self.tempo.filter(|t| t.is_finite() && *t > 0.0)
    }

    /// Key, if present and not blank
    pub fn key_value(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}
