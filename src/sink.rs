//! This module provides the persistence sinks a [`RecordStore`] writes through to.
//! A sink only ever sees whole collections: it is asked for the stored records once when the
//! store is opened, and is handed the complete new state after every successful mutation.
//!
//! [`RecordStore`]: ../struct.RecordStore.html
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::record::{Record, RecordId};

/// A trait for the backing collaborator of a [`RecordStore`].
///
/// [`RecordStore`]: ../struct.RecordStore.html
pub trait Sink<R: Record>: Send + Sync + 'static {
    /// Loads every stored record, in insertion order.
    ///
    /// Called once when the store is opened. An empty or missing backing file is an empty
    /// collection, not an error.
    fn load(&mut self) -> Result<Vec<R>>;

    /// Durably records `records` as the complete collection.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller of the mutating operation as a persistence
    /// failure, and the store keeps its previous state.
    fn save(&mut self, records: &[R]) -> Result<()>;
}

/// Keeps a collection as a pretty printed JSON array in `<dir>/<collection>.json`.
///
/// Saves go to a temporary file that is synced and then renamed over the previous one, so a
/// failed save never leaves a half written collection behind.
#[derive(Debug)]
pub struct JsonFileSink<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> JsonFileSink<R> {
    /// creates a sink that keeps its file in `dir`. The directory is created if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(JsonFileSink {
            path: dir.join(format!("{}.json", R::COLLECTION)),
            _record: PhantomData,
        })
    }

    /// the collection file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Record> Sink<R> for JsonFileSink<R> {
    fn load(&mut self) -> Result<Vec<R>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no collection file yet");
            return Ok(vec![]);
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let records: Vec<R> = serde_json::from_reader(reader)?;
        debug!(path = ?self.path, count = records.len(), "loaded collection file");
        Ok(records)
    }

    fn save(&mut self, records: &[R]) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps a collection in its own [`sled`] tree.
///
/// Keys are big-endian ids, so iterating the tree yields records in id order, which is also
/// insertion order because ids are only ever issued in increasing order.
///
/// [`sled`]: https://docs.rs/sled/latest/sled/
#[derive(Debug, Clone)]
pub struct SledSink<R> {
    tree: sled::Tree,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> SledSink<R> {
    /// opens (or creates) the tree named after the record's collection
    pub fn open(db: &sled::Db) -> Result<Self> {
        Ok(SledSink {
            tree: db.open_tree(R::COLLECTION)?,
            _record: PhantomData,
        })
    }
}

fn id_key(id: RecordId) -> [u8; 8] {
    id.to_be_bytes()
}

impl<R: Record> Sink<R> for SledSink<R> {
    fn load(&mut self) -> Result<Vec<R>> {
        self.tree
            .iter()
            .values()
            .map(|value| -> Result<R> { Ok(serde_json::from_slice(&value?)?) })
            .collect()
    }

    fn save(&mut self, records: &[R]) -> Result<()> {
        let live: HashSet<[u8; 8]> = records.iter().map(|record| id_key(record.id())).collect();
        let mut batch = sled::Batch::default();
        for key in self.tree.iter().keys() {
            let key = key?;
            let stale = <[u8; 8]>::try_from(key.as_ref()).map_or(true, |id| !live.contains(&id));
            if stale {
                batch.remove(key);
            }
        }
        for record in records {
            batch.insert(id_key(record.id()).to_vec(), serde_json::to_vec(record)?);
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        Ok(())
    }
}

/// An in-memory sink. Clones share the same snapshot, so a test can hold one clone and inspect
/// what the store last wrote through the other.
#[derive(Debug, Clone)]
pub struct MemorySink<R> {
    saved: Arc<Mutex<Vec<R>>>,
}

impl<R: Record> MemorySink<R> {
    /// an empty sink
    pub fn new() -> Self {
        Self::with_records(vec![])
    }

    /// a sink that will load `records`
    pub fn with_records(records: Vec<R>) -> Self {
        MemorySink {
            saved: Arc::new(Mutex::new(records)),
        }
    }

    /// the collection as last saved
    pub fn snapshot(&self) -> Result<Vec<R>> {
        self.saved
            .lock()
            .map(|saved| saved.clone())
            .map_err(|_| StoreError::LockPoisoned("memory sink read"))
    }
}

impl<R: Record> Default for MemorySink<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Sink<R> for MemorySink<R> {
    fn load(&mut self) -> Result<Vec<R>> {
        self.snapshot()
    }

    fn save(&mut self, records: &[R]) -> Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| StoreError::LockPoisoned("memory sink write"))?;
        *saved = records.to_vec();
        Ok(())
    }
}
