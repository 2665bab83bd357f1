//! Graphload store client.
//!
//! A small blocking client for an OrientDB-style REST interface:
//!
//! - [`OrientClient`]: authenticated session, paged queries, commands,
//!   documents, schema and server information, batched scripts;
//! - [`sql`]: typed builders for every statement the client sends;
//! - [`Pager`]: the "keep re-querying with a larger SKIP" loop as an iterator;
//! - [`BatchBuffer`]: ordered command accumulation flushed as one request;
//! - [`GraphStore`]: the narrow seam the import pipeline is written against,
//!   implemented by [`OrientClient`] and by the in-process [`MemoryStore`].

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod pager;
pub mod sql;
pub mod store;

pub use batch::{BatchBuffer, BatchOperation, BatchOptions, BatchRequest};
pub use client::{OrientClient, UpdateMode};
pub use config::{ConfigError, ConnectionConfig};
pub use error::{ClientError, Result};
pub use memory::MemoryStore;
pub use pager::Pager;
pub use sql::{Command, Content, Identifier, PropertyType, RecordId, Select};
pub use store::GraphStore;
