//! Source adapter contract
//!
//! A source hands the core a fully materialized snapshot of its tracks.
//! Writing back is an optional capability: a source exposes it through
//! `writer()`, probed once when the source is registered.

use crate::types::FieldValue;
use crossdeck_common::{PlatformRecord, TrackField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Canonical values to push into one source record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdates {
    pub fields: BTreeMap<TrackField, FieldValue>,
}

impl FieldUpdates {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: TrackField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn insert(&mut self, field: TrackField, value: FieldValue) {
        self.fields.insert(field, value);
    }
}

/// Write capability of a source
pub trait WriteBack {
    /// Apply updates to one record
    ///
    /// `Ok(false)` means the source declined the update; `Err` is a failure.
    /// The record passed in is the snapshot originally loaded, including its
    /// adapter-private `raw` payload.
    fn write_back(&self, record: &PlatformRecord, updates: &FieldUpdates) -> anyhow::Result<bool>;
}

/// A music library the core can reconcile
pub trait TrackSource {
    /// Unique source name, also the `source` field of every record it loads
    fn name(&self) -> &str;

    /// Load every track; an empty list is a valid, empty library
    fn load(&self) -> anyhow::Result<Vec<PlatformRecord>>;

    /// Write capability, if the source supports it
    fn writer(&self) -> Option<&dyn WriteBack> {
        None
    }
}

/// Source over a fixed list of records
///
/// Optionally writable: received updates are recorded and can be inspected
/// afterwards. Can also be told to fail every write.
#[derive(Debug)]
pub struct InMemorySource {
    name: String,
    records: Vec<PlatformRecord>,
    writable: bool,
    failing_writes: bool,
    received: Mutex<Vec<(String, FieldUpdates)>>,
}

impl InMemorySource {
    /// Read-only source
    pub fn new(name: impl Into<String>, records: Vec<PlatformRecord>) -> Self {
        Self {
            name: name.into(),
            records,
            writable: false,
            failing_writes: false,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Writable source that accepts every update
    pub fn writable(name: impl Into<String>, records: Vec<PlatformRecord>) -> Self {
        Self {
            writable: true,
            ..Self::new(name, records)
        }
    }

    /// Make every write fail with an error
    pub fn with_failing_writes(mut self) -> Self {
        self.failing_writes = true;
        self
    }

    /// Updates received so far as `(record id, updates)`
    pub fn received_updates(&self) -> Vec<(String, FieldUpdates)> {
        match self.received.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TrackSource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> anyhow::Result<Vec<PlatformRecord>> {
        Ok(self.records.clone())
    }

    fn writer(&self) -> Option<&dyn WriteBack> {
        if self.writable {
            Some(self)
        } else {
            None
        }
    }
}

impl WriteBack for InMemorySource {
    fn write_back(&self, record: &PlatformRecord, updates: &FieldUpdates) -> anyhow::Result<bool> {
        if self.failing_writes {
            anyhow::bail!("write to {} rejected by backend", record.record_ref());
        }
        if !self.records.iter().any(|r| r.id == record.id) {
            return Ok(false);
        }

        let mut received = self
            .received
            .lock()
            .map_err(|_| anyhow::anyhow!("update log lock poisoned"))?;
        received.push((record.id.clone(), updates.clone()));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updates() -> FieldUpdates {
        let mut u = FieldUpdates::default();
        u.insert(TrackField::Tempo, FieldValue::Number(128.0));
        u
    }

    #[test]
    fn test_read_only_source_has_no_writer() {
        let source = InMemorySource::new("serato", vec![]);
        assert!(source.writer().is_none());
        assert!(source.load().unwrap().is_empty());
    }

    #[test]
    fn test_writable_source_records_updates() {
        let rec = PlatformRecord::new("serato", "1", "A", "X");
        let source = InMemorySource::writable("serato", vec![rec.clone()]);

        let writer = source.writer().unwrap();
        assert!(writer.write_back(&rec, &updates()).unwrap());

        let received = source.received_updates();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "1");
        assert_eq!(
            received[0].1.get(TrackField::Tempo),
            Some(&FieldValue::Number(128.0))
        );
    }

    #[test]
    fn test_unknown_record_is_declined() {
        let source = InMemorySource::writable("serato", vec![]);
        let rec = PlatformRecord::new("serato", "404", "A", "X");
        assert!(!source.write_back(&rec, &updates()).unwrap());
    }

    #[test]
    fn test_failing_writes() {
        let rec = PlatformRecord::new("serato", "1", "A", "X");
        let source = InMemorySource::writable("serato", vec![rec.clone()]).with_failing_writes();
        assert!(source.write_back(&rec, &updates()).is_err());
        assert!(source.received_updates().is_empty());
    }
}
