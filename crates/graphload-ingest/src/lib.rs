//! Graphload ingest: triple files into graph vertices and edges.
//!
//! [`run_import`] drives the whole pipeline against any
//! [`graphload_client::GraphStore`]. The pieces are usable on their own:
//! [`initialize_schema`], [`discover_identifiers`] plus
//! [`materialize_vertices`], and [`materialize_edges`] with its
//! [`ResolutionCache`]. [`forward_unique_lines`] is the separate
//! "pipe unique commands into one batch" utility.
//!
//! Per-record problems (malformed lines, failed vertices, unresolved edge
//! endpoints) are collected into an [`ImportReport`] instead of aborting the
//! run, unless [`FailurePolicy::Abort`] is chosen.

pub mod dedup;
pub mod edges;
pub mod error;
pub mod importer;
pub mod policy;
pub mod progress;
pub mod report;
pub mod schema;
pub mod source;
pub mod triple;
pub mod vertices;

pub use dedup::{forward_unique_lines, DedupOutcome, Deduplicator};
pub use edges::{materialize_edges, EdgeOptions, Resolution, ResolutionCache};
pub use error::{IngestError, Result};
pub use importer::{run_import, ImportOptions};
pub use policy::{FailurePolicy, VertexPolicy};
pub use progress::{NoProgress, Progress, Stage};
pub use report::ImportReport;
pub use schema::{initialize_schema, SchemaPlan};
pub use source::TripleSource;
pub use triple::{ParsedLine, Role, TripleLine};
pub use vertices::{discover_identifiers, materialize_vertices, Discovery, VertexJob};
