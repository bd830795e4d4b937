//! This module provides the record storage engine, [`RecordStore`], and the [`Collection`]
//! trait that the router and server use to talk to it without knowing the record shape.
//! Records cross this boundary as JSON values; decoding request bodies into drafts and
//! patches happens on the store side.
use serde_json::Value;

use crate::record::RecordId;
use crate::Result;

/// An object-safe, JSON level view of one record collection.
///
/// Every operation maps onto the [`RecordStore`] operation of the same meaning.
pub trait Collection: Send + Sync {
    /// the collection name requests use to address it
    fn name(&self) -> &'static str;

    /// every record, as a JSON array
    fn list(&self) -> Result<Value>;

    /// one page of records, as a JSON array. `page` starts at 1.
    fn list_page(&self, page: usize, size: usize) -> Result<Value>;

    /// a single record
    fn get(&self, id: RecordId) -> Result<Value>;

    /// records whose `field` equals `value`, as a JSON array
    fn filter(&self, field: &str, value: &str) -> Result<Value>;

    /// decodes `body` as a draft and inserts it. Returns the new id and record.
    fn insert(&self, body: Value) -> Result<(RecordId, Value)>;

    /// decodes `body` as a draft and fully replaces record `id` with it
    fn replace(&self, id: RecordId, body: Value) -> Result<Value>;

    /// decodes `body` as a patch and merges it into record `id`
    fn patch(&self, id: RecordId, body: Value) -> Result<Value>;

    /// removes record `id`
    fn delete(&self, id: RecordId) -> Result<()>;
}

mod store;

pub use self::store::RecordStore;
