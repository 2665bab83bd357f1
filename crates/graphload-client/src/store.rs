//! The operations the import pipeline needs from a graph store.
//!
//! [`crate::OrientClient`] implements this over REST; [`crate::MemoryStore`]
//! implements it in process for dry runs and tests.

use crate::batch::BatchRequest;
use crate::error::Result;
use crate::sql::{Content, Identifier, PropertyType, RecordId};

pub trait GraphStore {
    /// `CREATE CLASS <class> EXTENDS V`. Not idempotent on the store side:
    /// a second call fails with an "already exists" response.
    fn create_vertex_class(&mut self, class: &Identifier) -> Result<()>;

    /// `CREATE CLASS <class> EXTENDS E`.
    fn create_edge_class(&mut self, class: &Identifier) -> Result<()>;

    fn create_property(
        &mut self,
        class: &Identifier,
        property: &Identifier,
        kind: PropertyType,
    ) -> Result<()>;

    /// First vertex of `class` whose fields equal every field of `filter`.
    fn find_vertex(&mut self, class: &Identifier, filter: &Content) -> Result<Option<RecordId>>;

    fn create_vertex(&mut self, class: &Identifier, content: &Content) -> Result<RecordId>;

    /// Whether an edge of `class` already leads from `from` to `to`.
    fn edge_exists(&mut self, class: &Identifier, from: RecordId, to: RecordId) -> Result<bool>;

    fn create_edge(
        &mut self,
        class: &Identifier,
        from: RecordId,
        to: RecordId,
        content: Option<&Content>,
    ) -> Result<RecordId>;

    fn submit_batch(&mut self, request: &BatchRequest) -> Result<()>;
}
