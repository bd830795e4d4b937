#![warn(missing_docs)]
//! A multithreaded, validated, write-through record store (recs) for small REST-style
//! resource collections, such as a book catalog or a customer directory.
//!
//! This crate provides the [`RecordStore`] implementation itself, as well as a [`recs-client`]
//! and [`recs-server`] executable that can be used to interact with it.
//! Requests and responses are sent between the client and server using synchronous networking
//! over a custom JSON protocol.
//!
//! ## Supported Operations
//! Each collection supports the operations of a REST resource:
//!
//! - `LIST` every record, or one page of records
//! - `GET` a record by id
//! - `FILTER` records by the value of one field (case-insensitive for text)
//! - `INSERT` a new record, which is assigned a fresh id
//! - `REPLACE` every field of a record (PUT semantics)
//! - `PATCH` only the supplied fields of a record
//! - `DELETE` a record
//!
//! See the [`Request`] and [`Response`] types for the structure of these operations.
//!
//! ## RecordStore
//! [`RecordStore`] is the brains of this entire operation. It is responsible for:
//! - keeping all records of one shape in memory, in insertion order
//! - validating candidates against the shape's schema table: required fields, format rules,
//!   and uniqueness of fields such as a customer's email or phone
//! - writing the complete collection through to a [`Sink`] after every mutation, and keeping
//!   its previous state if that write fails
//! - guarding the collection with a read/write lock, so that concurrent writers cannot both
//!   pass a uniqueness check
//!
//! ## Record shapes
//! Records are typed structs ([`Book`], [`Customer`]) that declare their fields in a static
//! [`FieldSpec`] table. Inserts and replacements take a *draft*, partial updates take a *patch*
//! that distinguishes "not mentioned" from "set to null".
//!
//! ## Sinks
//! - [`JsonFileSink`] keeps each collection in `<collection>.json`
//! - [`SledSink`] keeps each collection in its own [`sled`] tree
//! - [`MemorySink`] keeps the last saved collection in memory
//!
//! ## Client / Server
//! Client and server logic is contained in the [`client`] and [`server`] structs. The server
//! hands each connection to a [`ThreadPool`] worker, which decodes [`Request`]s and lets the
//! [`Router`] dispatch them. Every outcome is returned as a [`Response`] with an HTTP-style
//! [`Status`]: 200 for reads and updates, 201 with a location for inserts, 204 for deletes,
//! 400 for validation failures, 404 for unknown ids and 500 for persistence failures.
//!
//! [`sled`]: https://docs.rs/sled/latest/sled/
//! [`client`]: ./struct.RecsClient.html
//! [`server`]: ./struct.RecsServer.html
//! [`recs-server`]: ./recs-server.rs
//! [`recs-client`]: ./recs-client.rs

pub use error::{Reason, Result, StoreError, ValidationError};
pub use engine::{Collection, RecordStore};
pub use record::{Book, BookDraft, BookPatch, Customer, CustomerDraft, CustomerPatch, Record, RecordId};
pub use schema::{FieldKind, FieldSpec, Fields, Format, Slot};
pub use sink::{JsonFileSink, MemorySink, SledSink, Sink};
pub use router::Router;
pub use server::RecsServer;
pub use client::RecsClient;
pub use thread_pool::{ThreadPool, SharedQueueThreadPool, RayonThreadPool};
pub use command::{Request, Response, Status};

mod client;
mod command;
mod engine;
mod error;
mod record;
mod router;
pub mod schema;
mod server;
mod sink;
pub mod thread_pool;
