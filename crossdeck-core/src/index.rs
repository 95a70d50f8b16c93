//! Per-source lookup indices
//!
//! Each source's snapshot is indexed by native id, file path, file name and
//! normalized `title|artist` key. Indices are rebuilt wholesale on every
//! load; there is no incremental update path.
//!
//! Records without a path are absent from the path and filename indices,
//! records without a title are absent from the title-artist index. A record
//! missing both is still reachable by id (stored cross-platform links).

use crossdeck_common::{Error, PlatformRecord, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Indices for every loaded source, keyed by source name
pub type Indices = BTreeMap<String, SourceIndex>;

/// Lowercase, drop punctuation, collapse whitespace
///
/// `"Don't Stop  (Remix)"` and `"dont stop remix"` normalize identically.
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(s: &str) -> String {
    let cleaned: String = s
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-artist lookup key, `None` when the title normalizes to nothing
pub fn title_artist_key(title: &str, artist: &str) -> Option<String> {
    let title = normalize(title);
    if title.is_empty() {
        return None;
    }
    Some(format!("{}|{}", title, normalize(artist)))
}

/// Path lookup key: trimmed, forward slashes, lowercased
pub fn path_key(path: &str) -> String {
    path.trim().replace('\\', "/").to_lowercase()
}

/// One title-artist index slot
#[derive(Debug, Clone)]
pub struct KeyEntry {
    /// Key length in chars, for the fuzzy length pre-filter
    pub char_len: usize,
    positions: Vec<usize>,
}

/// Lookup structures over one source's records
#[derive(Debug, Clone)]
pub struct SourceIndex {
    source: String,
    records: Vec<Arc<PlatformRecord>>,
    by_id: HashMap<String, usize>,
    by_path: HashMap<String, Vec<usize>>,
    by_filename: HashMap<String, Vec<usize>>,
    /// Sorted so fuzzy scans visit keys in a stable order
    by_title_artist: BTreeMap<String, KeyEntry>,
    /// `(other source, other id)` → records carrying that stored link
    by_linked: HashMap<(String, String), Vec<usize>>,
}

impl SourceIndex {
    /// Index with no records (a source that loaded zero tracks)
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            records: Vec::new(),
            by_id: HashMap::new(),
            by_path: HashMap::new(),
            by_filename: HashMap::new(),
            by_title_artist: BTreeMap::new(),
            by_linked: HashMap::new(),
        }
    }

    /// Build the index for one source
    ///
    /// # Errors
    /// - `SourceMismatch` if a record names a different source
    /// - `DuplicateRecordId` if two records share an id
    pub fn build(source: impl Into<String>, records: Vec<PlatformRecord>) -> Result<Self> {
        let mut index = Self::empty(source);
        index.records.reserve(records.len());

        for record in records {
            if record.source != index.source {
                return Err(Error::SourceMismatch {
                    expected: index.source.clone(),
                    actual: record.source.clone(),
                    id: record.id.clone(),
                });
            }
            if index.by_id.contains_key(&record.id) {
                return Err(Error::DuplicateRecordId {
                    source_name: index.source.clone(),
                    id: record.id.clone(),
                });
            }

            let pos = index.records.len();
            index.by_id.insert(record.id.clone(), pos);

            if let Some(path) = record.path_str() {
                index.by_path.entry(path_key(path)).or_default().push(pos);
            }
            if let Some(name) = record.file_name() {
                index
                    .by_filename
                    .entry(name.to_lowercase())
                    .or_default()
                    .push(pos);
            }
            if let Some(key) = title_artist_key(&record.title, &record.artist) {
                let char_len = key.chars().count();
                index
                    .by_title_artist
                    .entry(key)
                    .or_insert_with(|| KeyEntry {
                        char_len,
                        positions: Vec::new(),
                    })
                    .positions
                    .push(pos);
            }
            for (other_source, other_id) in &record.linked_ids {
                index
                    .by_linked
                    .entry((other_source.clone(), other_id.clone()))
                    .or_default()
                    .push(pos);
            }

            index.records.push(Arc::new(record));
        }

        debug!(
            source = %index.source,
            records = index.records.len(),
            paths = index.by_path.len(),
            filenames = index.by_filename.len(),
            title_artist_keys = index.by_title_artist.len(),
            "Source index built"
        );

        Ok(index)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Records in load order
    pub fn records(&self) -> &[Arc<PlatformRecord>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<PlatformRecord>> {
        self.by_id.get(id).map(|&pos| &self.records[pos])
    }

    /// Records stored under an exact path (case-insensitive)
    pub fn by_path(&self, path: &str) -> impl Iterator<Item = &Arc<PlatformRecord>> {
        self.resolve(self.by_path.get(&path_key(path)))
    }

    /// Records whose file name matches (case-insensitive)
    pub fn by_filename(&self, file_name: &str) -> impl Iterator<Item = &Arc<PlatformRecord>> {
        self.resolve(self.by_filename.get(&file_name.to_lowercase()))
    }

    /// Records under an already-built title-artist key
    pub fn by_title_artist(&self, key: &str) -> impl Iterator<Item = &Arc<PlatformRecord>> {
        self.resolve(self.by_title_artist.get(key).map(|e| &e.positions))
    }

    /// Records that carry a stored link to `(source, id)`
    pub fn linked_to(&self, source: &str, id: &str) -> impl Iterator<Item = &Arc<PlatformRecord>> {
        self.resolve(self.by_linked.get(&(source.to_string(), id.to_string())))
    }

    /// Every title-artist key in sorted order with its records
    pub fn title_artist_entries(
        &self,
    ) -> impl Iterator<Item = (&str, &KeyEntry, Vec<&Arc<PlatformRecord>>)> {
        self.by_title_artist.iter().map(move |(key, entry)| {
            let records = entry.positions.iter().map(|&p| &self.records[p]).collect();
            (key.as_str(), entry, records)
        })
    }

    fn resolve<'a>(
        &'a self,
        positions: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = &'a Arc<PlatformRecord>> + 'a {
        positions
            .into_iter()
            .flatten()
            .map(move |&pos| &self.records[pos])
    }
}

/// Group records by source and index each group
///
/// Within a source, records keep the order they were given in.
pub fn build_indices<I>(records: I) -> Result<Indices>
where
    I: IntoIterator<Item = PlatformRecord>,
{
    let mut grouped: BTreeMap<String, Vec<PlatformRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.source.clone()).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|(source, records)| {
            let index = SourceIndex::build(source.clone(), records)?;
            Ok((source, index))
        })
        .collect()
}
