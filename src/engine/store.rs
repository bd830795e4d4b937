use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::Collection;
use crate::error::{Reason, Result, StoreError, ValidationError};
use crate::record::{Record, RecordId};
use crate::schema::{validate_full, validate_patch, Fields};
use crate::sink::Sink;

/// The primary struct for working with a collection of records.
///
/// It keeps every record of one shape in memory, in insertion order, and writes the whole
/// collection through to its [`Sink`] after every successful mutation. Clones share the same
/// collection: reads take a shared lock, while mutations hold an exclusive lock for the whole
/// validate, save, apply sequence so two writers can never both pass a uniqueness check.
///
/// A mutation is applied to a copy of the collection first. The copy only replaces the live
/// collection once the sink accepted it, so a failed operation of any kind leaves the store
/// exactly as it was.
pub struct RecordStore<R: Record, S: Sink<R>> {
    inner: Arc<RwLock<Inner<R, S>>>,
}

struct Inner<R, S> {
    // current state, insertion order
    records: Vec<R>,

    // the id the next insert will receive, None once u64::MAX was issued
    next_id: Option<RecordId>,

    // write-through target
    sink: S,
}

impl<R: Record, S: Sink<R>> Clone for RecordStore<R, S> {
    fn clone(&self) -> Self {
        RecordStore {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Record, S: Sink<R>> RecordStore<R, S> {
    /// creates a [`RecordStore`] holding everything `sink` currently has stored
    ///
    /// # Errors
    /// returns `StoreError::Corrupt` if two loaded records share an id or a unique value, or
    /// a loaded record fails its schema
    #[instrument(skip(sink), fields(collection = R::COLLECTION))]
    pub fn open(mut sink: S) -> Result<Self> {
        let records = sink.load()?;
        check_loaded(&records)?;
        let next_id = match records.iter().map(Record::id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        };
        info!(count = records.len(), ?next_id, "opened record store");

        Ok(RecordStore {
            inner: Arc::new(RwLock::new(Inner {
                records,
                next_id,
                sink,
            })),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner<R, S>>> {
        self.inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner<R, S>>> {
        self.inner
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))
    }

    /// number of records in the store
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    /// true if the store holds no records
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.records.is_empty())
    }

    /// returns a copy of every record, in insertion order
    pub fn list_all(&self) -> Result<Vec<R>> {
        Ok(self.read()?.records.clone())
    }

    /// returns one page of [`list_all`](Self::list_all). `page` starts at 1.
    ///
    /// # Errors
    /// returns `StoreError::InvalidPage` if `page` or `size` is zero
    pub fn list_page(&self, page: usize, size: usize) -> Result<Vec<R>> {
        if page < 1 || size < 1 {
            return Err(StoreError::InvalidPage);
        }
        let start = (page - 1).saturating_mul(size);
        Ok(self
            .read()?
            .records
            .iter()
            .skip(start)
            .take(size)
            .cloned()
            .collect())
    }

    /// returns a copy of the record with the given `id`
    ///
    /// # Errors
    /// returns `StoreError::NotFound` if no record has that id
    pub fn get_by_id(&self, id: RecordId) -> Result<R> {
        let inner = self.read()?;
        let pos = inner.position(id)?;
        Ok(inner.records[pos].clone())
    }

    /// returns every record whose `field` equals `value`, in insertion order.
    /// Text fields compare case-insensitively. No match is an empty result, not an error.
    ///
    /// # Errors
    /// returns a `ValidationError` with `Reason::UnknownField` if the record shape does not
    /// declare `field`
    pub fn filter_by_field(&self, field: &str, value: &str) -> Result<Vec<R>> {
        if !R::SCHEMA.iter().any(|spec| spec.name == field) {
            return Err(ValidationError::new(field, Reason::UnknownField).into());
        }
        let matches: Vec<R> = self
            .read()?
            .records
            .iter()
            .filter(|record| {
                record
                    .field(field)
                    .value()
                    .map_or(false, |stored| stored.matches(value))
            })
            .cloned()
            .collect();
        debug!(collection = R::COLLECTION, field, value, count = matches.len(), "filtered");
        Ok(matches)
    }

    /// validates `draft`, assigns it a fresh id and appends it to the store
    ///
    /// # Errors
    /// - `StoreError::IdsExhausted` once the id `u64::MAX` has been issued
    /// - `StoreError::Validation` for the first missing, malformed or duplicate field
    /// - `StoreError::Persistence` if the sink could not record the new collection
    #[instrument(skip(self, draft), fields(collection = R::COLLECTION))]
    pub fn insert(&self, draft: R::Draft) -> Result<R> {
        let mut inner = self.write()?;
        let id = inner.next_id.ok_or(StoreError::IdsExhausted(R::COLLECTION))?;
        validate_full(R::SCHEMA, &draft, inner.records.iter())?;

        let record = R::from_draft(id, draft);
        let mut next = inner.records.clone();
        next.push(record.clone());
        inner.commit(next)?;
        inner.next_id = id.checked_add(1);

        info!(id = record.id(), "inserted record");
        Ok(record)
    }

    /// overwrites every field of record `id` with `draft`. Optional fields the draft leaves
    /// out are cleared. The record keeps its id and its position.
    ///
    /// # Errors
    /// - `StoreError::NotFound` if no record has that id
    /// - `StoreError::Validation` as for [`insert`](Self::insert); the record's own values
    ///   never count as duplicates
    /// - `StoreError::Persistence` if the sink could not record the new collection
    #[instrument(skip(self, draft), fields(collection = R::COLLECTION))]
    pub fn replace(&self, id: RecordId, draft: R::Draft) -> Result<R> {
        let mut inner = self.write()?;
        let pos = inner.position(id)?;
        validate_full(
            R::SCHEMA,
            &draft,
            inner.records.iter().filter(move |other| other.id() != id),
        )?;

        let record = R::from_draft(id, draft);
        let mut next = inner.records.clone();
        next[pos] = record.clone();
        inner.commit(next)?;

        info!("replaced record");
        Ok(record)
    }

    /// merges the fields mentioned by `patch` into record `id`, leaving the rest untouched
    ///
    /// # Errors
    /// - `StoreError::NotFound` if no record has that id
    /// - `StoreError::Validation` if a required field is cleared, or a unique field is
    ///   malformed or held by another record
    /// - `StoreError::Persistence` if the sink could not record the new collection
    #[instrument(skip(self, patch), fields(collection = R::COLLECTION))]
    pub fn update_partial(&self, id: RecordId, patch: R::Patch) -> Result<R> {
        let mut inner = self.write()?;
        let pos = inner.position(id)?;
        validate_patch(
            R::SCHEMA,
            &patch,
            inner.records.iter().filter(move |other| other.id() != id),
        )?;

        let mut record = inner.records[pos].clone();
        record.merge(patch);
        let mut next = inner.records.clone();
        next[pos] = record.clone();
        inner.commit(next)?;

        info!("updated record");
        Ok(record)
    }

    /// removes record `id`
    ///
    /// # Errors
    /// - `StoreError::NotFound` if no record has that id
    /// - `StoreError::Persistence` if the sink could not record the new collection
    #[instrument(skip(self), fields(collection = R::COLLECTION))]
    pub fn delete(&self, id: RecordId) -> Result<()> {
        let mut inner = self.write()?;
        let pos = inner.position(id)?;

        let mut next = inner.records.clone();
        next.remove(pos);
        inner.commit(next)?;

        info!("deleted record");
        Ok(())
    }
}

/// every id appears once, and each record passes its schema against the records before it
fn check_loaded<R: Record>(records: &[R]) -> Result<()> {
    let corrupt = |detail: String| StoreError::Corrupt {
        collection: R::COLLECTION,
        detail,
    };
    let mut ids = HashSet::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        if !ids.insert(record.id()) {
            return Err(corrupt(format!("id {} appears more than once", record.id())));
        }
        validate_full(R::SCHEMA, record, records[..i].iter())
            .map_err(|e| corrupt(format!("record {}: {}", record.id(), e)))?;
    }
    Ok(())
}

impl<R: Record, S: Sink<R>> Inner<R, S> {
    fn position(&self, id: RecordId) -> Result<usize> {
        self.records
            .iter()
            .position(|record| record.id() == id)
            .ok_or(StoreError::NotFound {
                collection: R::COLLECTION,
                id,
            })
    }

    /// hands `next` to the sink and adopts it as the current state once it was saved
    fn commit(&mut self, next: Vec<R>) -> Result<()> {
        if let Err(e) = self.sink.save(&next) {
            warn!(collection = R::COLLECTION, error = %e, "write-through failed, keeping previous state");
            return Err(StoreError::Persistence {
                collection: R::COLLECTION,
                source: Box::new(e),
            });
        }
        self.records = next;
        Ok(())
    }
}

impl<R: Record, S: Sink<R>> Collection for RecordStore<R, S> {
    fn name(&self) -> &'static str {
        R::COLLECTION
    }

    fn list(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.list_all()?)?)
    }

    fn list_page(&self, page: usize, size: usize) -> Result<Value> {
        Ok(serde_json::to_value(RecordStore::list_page(self, page, size)?)?)
    }

    fn get(&self, id: RecordId) -> Result<Value> {
        Ok(serde_json::to_value(self.get_by_id(id)?)?)
    }

    fn filter(&self, field: &str, value: &str) -> Result<Value> {
        Ok(serde_json::to_value(self.filter_by_field(field, value)?)?)
    }

    fn insert(&self, body: Value) -> Result<(RecordId, Value)> {
        let record = RecordStore::insert(self, decode(body)?)?;
        Ok((record.id(), serde_json::to_value(record)?))
    }

    // an unknown id is reported before a body that does not decode
    fn replace(&self, id: RecordId, body: Value) -> Result<Value> {
        self.read()?.position(id)?;
        Ok(serde_json::to_value(RecordStore::replace(self, id, decode(body)?)?)?)
    }

    fn patch(&self, id: RecordId, body: Value) -> Result<Value> {
        self.read()?.position(id)?;
        Ok(serde_json::to_value(self.update_partial(id, decode(body)?)?)?)
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        RecordStore::delete(self, id)
    }
}

/// decodes a request body into a draft or patch; decoding failures are the client's fault
fn decode<T: serde::de::DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| StoreError::Payload(e.to_string()))
}
