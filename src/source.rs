//! Record sources: the engine's view of the backing store.
//!
//! The harvesting engine never queries a store directly. It asks a
//! [`RecordSource`] for bounded batches of one record type, ordered by
//! [`CursorKey`], starting strictly after the last key it has seen. Batches
//! keep per-request memory bounded no matter how many candidates the
//! visibility and set filters end up rejecting.
//!
//! [`MemoryRecordSource`] is an in-process implementation suitable for
//! tests, benchmarks and small embedded deployments.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::error::{OaiError, Result};
use crate::record::{CursorKey, OaiRecord, RecordType, RepositoryId};

/// One bounded request for records of a single type.
#[derive(Debug, Clone)]
pub struct ScanQuery<'a> {
    /// Record type to scan.
    pub record_type: RecordType,
    /// Return only records strictly after this key.
    pub after: Option<CursorKey>,
    /// Inclusive lower bound on modification time.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on modification time.
    pub until: Option<DateTime<Utc>>,
    /// Repositories whose records must not be returned.
    pub excluded_repositories: &'a [RepositoryId],
    /// Maximum number of records to return.
    pub limit: usize,
}

impl ScanQuery<'_> {
    /// Whether `record` satisfies every bound of the query except `limit`.
    #[must_use]
    pub fn admits(&self, record: &OaiRecord) -> bool {
        record.record_type == self.record_type
            && self.after.map_or(true, |after| record.cursor_key() > after)
            && self.from.map_or(true, |from| record.mtime >= from)
            && self.until.map_or(true, |until| record.mtime <= until)
            && !self.excluded_repositories.contains(&record.repository_id)
    }
}

/// Ordered, boundable access to harvestable records.
///
/// Implementations must return deletion markers alongside live records and
/// must report each record's current publish state and ancestor chain.
pub trait RecordSource: std::fmt::Debug {
    /// Fetch the next batch for `query`, ascending by cursor key.
    ///
    /// Returning fewer than `query.limit` records signals that the type is
    /// exhausted for these bounds.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store cannot be read.
    fn scan(&self, query: &ScanQuery<'_>) -> Result<Vec<OaiRecord>>;

    /// Look up a single record (or its deletion marker) by URI.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store cannot be read.
    fn get(&self, uri: &str) -> Result<Option<OaiRecord>>;

    /// Oldest modification time of any record, for Identify.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store cannot be read.
    fn earliest_datestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }
}

impl<T: RecordSource + ?Sized> RecordSource for &T {
    fn scan(&self, query: &ScanQuery<'_>) -> Result<Vec<OaiRecord>> {
        (**self).scan(query)
    }

    fn get(&self, uri: &str) -> Result<Option<OaiRecord>> {
        (**self).get(uri)
    }

    fn earliest_datestamp(&self) -> Result<Option<DateTime<Utc>>> {
        (**self).earliest_datestamp()
    }
}

impl<T: RecordSource + ?Sized> RecordSource for Arc<T> {
    fn scan(&self, query: &ScanQuery<'_>) -> Result<Vec<OaiRecord>> {
        (**self).scan(query)
    }

    fn get(&self, uri: &str) -> Result<Option<OaiRecord>> {
        (**self).get(uri)
    }

    fn earliest_datestamp(&self) -> Result<Option<DateTime<Utc>>> {
        (**self).earliest_datestamp()
    }
}

type Key = (RecordType, CursorKey);

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<Key, OaiRecord>,
    by_uri: HashMap<String, Key>,
}

impl Inner {
    fn put(&mut self, record: OaiRecord) -> Result<()> {
        let key = (record.record_type, record.cursor_key());
        if let Some(existing) = self.records.get(&key) {
            if existing.uri != record.uri {
                return Err(OaiError::Store(format!(
                    "{} has the same harvest position as {}",
                    record.uri, existing.uri
                )));
            }
        }
        if let Some(old) = self.by_uri.remove(&record.uri) {
            self.records.remove(&old);
        }
        self.by_uri.insert(record.uri.clone(), key);
        self.records.insert(key, record);
        Ok(())
    }

    fn lookup(&self, uri: &str) -> Option<&OaiRecord> {
        self.by_uri.get(uri).and_then(|key| self.records.get(key))
    }

    /// Copy of `record` with its ancestors' publish flags read from current state.
    fn with_current_ancestors(&self, record: &OaiRecord) -> OaiRecord {
        let mut record = record.clone();
        for ancestor in &mut record.ancestors {
            if let Some(current) = self.lookup(&ancestor.uri) {
                ancestor.publish = current.publish && !current.deleted;
            }
        }
        record
    }
}

/// Thread-safe in-memory record store.
///
/// Records are keyed by URI; writing a record with an existing URI replaces
/// it and moves it to its new position in harvest order. Two URIs may not
/// share a type, id and modification time. Ancestor publish
/// flags are resolved against the stored ancestors at read time, so
/// unpublishing a resource hides its components on the next scan.
#[derive(Debug, Default)]
pub struct MemoryRecordSource {
    inner: RwLock<Inner>,
}

impl MemoryRecordSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        MemoryRecordSource::default()
    }

    /// Create a source holding `records`.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store lock is poisoned.
    pub fn with_records(records: impl IntoIterator<Item = OaiRecord>) -> Result<Self> {
        let source = MemoryRecordSource::new();
        for record in records {
            source.upsert(record)?;
        }
        Ok(source)
    }

    /// Insert or replace a record.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store lock is poisoned, or if a
    /// record with another URI already holds the same type, id and
    /// modification time.
    pub fn upsert(&self, record: OaiRecord) -> Result<()> {
        self.write()?.put(record)
    }

    /// Change a record's publish flag, stamping it modified at `at`.
    ///
    /// Returns `false` if no record has this URI.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store lock is poisoned.
    pub fn set_publish(&self, uri: &str, publish: bool, at: DateTime<Utc>) -> Result<bool> {
        self.modify(uri, at, |record| record.publish = publish)
    }

    /// Change a record's suppression flag, stamping it modified at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store lock is poisoned.
    pub fn set_suppressed(&self, uri: &str, suppressed: bool, at: DateTime<Utc>) -> Result<bool> {
        self.modify(uri, at, |record| record.suppressed = suppressed)
    }

    /// Replace a record with a deletion marker stamped `at`.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store lock is poisoned.
    pub fn delete(&self, uri: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(record) = inner.lookup(uri).cloned() else {
            return Ok(false);
        };
        let mut tombstone = record.into_tombstone();
        tombstone.mtime = at;
        inner.put(tombstone)?;
        Ok(true)
    }

    /// Number of stored records, deletion markers included.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    /// Whether the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Store`] if the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn modify(
        &self,
        uri: &str,
        at: DateTime<Utc>,
        change: impl FnOnce(&mut OaiRecord),
    ) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(mut record) = inner.lookup(uri).cloned() else {
            return Ok(false);
        };
        change(&mut record);
        record.mtime = at;
        inner.put(record)?;
        Ok(true)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| OaiError::Store("record store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| OaiError::Store("record store lock poisoned".into()))
    }
}

impl RecordSource for MemoryRecordSource {
    fn scan(&self, query: &ScanQuery<'_>) -> Result<Vec<OaiRecord>> {
        let inner = self.read()?;
        let start = match query.after {
            Some(after) => Bound::Excluded((query.record_type, after)),
            None => Bound::Included((
                query.record_type,
                CursorKey::new(DateTime::<Utc>::MIN_UTC, 0),
            )),
        };

        let batch = inner
            .records
            .range((start, Bound::Unbounded))
            .take_while(|((record_type, key), _)| {
                *record_type == query.record_type
                    && query.until.map_or(true, |until| key.mtime <= until)
            })
            .map(|(_, record)| record)
            .filter(|record| query.admits(record))
            .take(query.limit)
            .map(|record| inner.with_current_ancestors(record))
            .collect();
        Ok(batch)
    }

    fn get(&self, uri: &str) -> Result<Option<OaiRecord>> {
        let inner = self.read()?;
        Ok(inner
            .lookup(uri)
            .map(|record| inner.with_current_ancestors(record)))
    }

    fn earliest_datestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let inner = self.read()?;
        Ok(inner.records.keys().map(|(_, key)| key.mtime).min())
    }
}
