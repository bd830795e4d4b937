use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::RecordId;

/// type alias for all operations on a [`RecordStore`] that could fail with a [`StoreError`]
///
/// [`RecordStore`]: ./struct.RecordStore.html
pub type Result<T> = std::result::Result<T, StoreError>;

/// The Error variants used by `recs`.
///
/// `NotFound` and `Validation` are expected outcomes of a request and are mapped to 4xx
/// responses by the router. `Persistence` means the sink could not record a mutation; the
/// in-memory state of the store is left as it was before the mutation was attempted.
#[derive(Error, Debug)]
pub enum StoreError {
    /// no record with the requested id exists in the collection
    #[error("no {collection} record found for id {id}")]
    NotFound {
        /// the collection that was searched
        collection: &'static str,
        /// the id that was requested
        id: RecordId,
    },

    /// a candidate record failed a field rule
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// the sink failed to write the new collection state
    #[error("could not persist {collection}: {source}")]
    Persistence {
        /// the collection being written
        collection: &'static str,
        /// the underlying sink error
        source: Box<StoreError>,
    },

    /// the records a sink loaded share an id or a unique value, or fail their schema
    #[error("stored {collection} are inconsistent: {detail}")]
    Corrupt {
        /// the collection being opened
        collection: &'static str,
        /// which record broke which rule
        detail: String,
    },

    /// the highest possible id has already been issued
    #[error("no ids left to issue in {0}")]
    IdsExhausted(&'static str),

    /// page and size of a paged listing must both be at least one
    #[error("page/size must be more than 0")]
    InvalidPage,

    /// a request named a collection that is not mounted on the router
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// a request body could not be decoded into the collection's record shape
    #[error("malformed payload: {0}")]
    Payload(String),

    /// a thread panicked while holding the store lock
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),

    /// variant for errors caused by file or socket IO
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// serde_json error
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// error raised by the sled engine
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// command line or configuration values that could not be parsed
    #[error("{0}")]
    Parsing(String),

    /// error message received from a server
    #[error("{0}")]
    StringErr(String),
}

/// The rule a field broke during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// a required field was absent, null or empty
    Missing,
    /// the value does not satisfy the field's format rule
    Malformed,
    /// the value is already held by another record
    Duplicate,
    /// the field is not declared by the record's schema
    UnknownField,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Missing => write!(f, "missing"),
            Reason::Malformed => write!(f, "malformed"),
            Reason::Duplicate => write!(f, "duplicate"),
            Reason::UnknownField => write!(f, "unknown_field"),
        }
    }
}

/// Which `field` failed and which rule it failed.
///
/// Only the first failing field is ever reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// name of the offending field
    pub field: String,
    /// the rule that was broken
    pub reason: Reason,
}

impl ValidationError {
    /// builds a `ValidationError` for `field`
    pub fn new(field: impl Into<String>, reason: Reason) -> Self {
        ValidationError {
            field: field.into(),
            reason,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Reason::Missing => write!(f, "missing field: {}", self.field),
            Reason::Malformed => write!(f, "{} is not valid", self.field),
            Reason::Duplicate => write!(f, "{} already exists", self.field),
            Reason::UnknownField => write!(f, "unknown field: {}", self.field),
        }
    }
}

impl std::error::Error for ValidationError {}
