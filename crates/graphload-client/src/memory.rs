//! In-process graph store.
//!
//! Mirrors the store semantics the importer relies on: classes must exist
//! before records are created in them, creating a class or property twice is
//! an "already exists" error, and every record gets a `#cluster:position` id
//! from its class's cluster. Used by `import --dry-run` and by tests.

use crate::batch::BatchRequest;
use crate::error::{ClientError, Result};
use crate::sql::{Content, Identifier, PropertyType, RecordId};
use crate::store::GraphStore;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

// The store reserves the low clusters for its own classes.
const FIRST_USER_CLUSTER: i64 = 9;

// Indexed field for vertex lookups.
const URI_FIELD: &str = "uri";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Vertex,
    Edge,
}

#[derive(Debug, Clone)]
struct ClassEntry {
    kind: ClassKind,
    cluster: i64,
    next_position: i64,
    properties: BTreeMap<String, PropertyType>,
}

#[derive(Debug, Clone)]
pub struct StoredVertex {
    pub class: String,
    pub content: Content,
}

#[derive(Debug, Clone)]
pub struct StoredEdge {
    pub class: String,
    pub from: RecordId,
    pub to: RecordId,
    pub content: Option<Content>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    classes: BTreeMap<String, ClassEntry>,
    vertices: BTreeMap<RecordId, StoredVertex>,
    edges: BTreeMap<RecordId, StoredEdge>,
    /// `(class, uri)` to the vertices carrying that uri, in creation order.
    uri_index: HashMap<(String, String), Vec<RecordId>>,
    /// `(class, from)` to the targets of that vertex's edges.
    out_edges: HashMap<(String, RecordId), HashSet<RecordId>>,
    batches: Vec<BatchRequest>,
    failing_uris: HashSet<String>,
    requests: usize,
}

fn server_error(body: String) -> ClientError {
    ClientError::Response {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `create_vertex` whose `uri` equals `uri` fail with a
    /// server error.
    pub fn fail_vertex_creation_for(&mut self, uri: &str) {
        self.failing_uris.insert(uri.to_string());
    }

    /// Number of store operations issued so far (reads and writes).
    pub fn request_count(&self) -> usize {
        self.requests
    }

    pub fn class_kind(&self, class: &str) -> Option<ClassKind> {
        self.classes.get(class).map(|c| c.kind)
    }

    pub fn property_type(&self, class: &str, property: &str) -> Option<PropertyType> {
        self.classes
            .get(class)
            .and_then(|c| c.properties.get(property).copied())
    }

    pub fn vertices(&self) -> impl Iterator<Item = (&RecordId, &StoredVertex)> {
        self.vertices.iter()
    }

    pub fn vertex_count(&self, class: &str) -> usize {
        self.vertices.values().filter(|v| v.class == class).count()
    }

    /// Distinct `uri` values of the vertices of `class`.
    pub fn vertex_uris(&self, class: &str) -> BTreeSet<String> {
        self.vertices
            .values()
            .filter(|v| v.class == class)
            .filter_map(|v| v.content.get("uri").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&RecordId, &StoredEdge)> {
        self.edges.iter()
    }

    pub fn edge_count(&self, class: &str) -> usize {
        self.edges.values().filter(|e| e.class == class).count()
    }

    /// Edges of `class` as `(source uri, target uri)` pairs, duplicates kept.
    pub fn edge_uri_pairs(&self, class: &str) -> Vec<(String, String)> {
        let uri_of = |rid: &RecordId| {
            self.vertices
                .get(rid)
                .and_then(|v| v.content.get("uri"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        self.edges
            .values()
            .filter(|e| e.class == class)
            .map(|e| (uri_of(&e.from), uri_of(&e.to)))
            .collect()
    }

    pub fn batches(&self) -> &[BatchRequest] {
        &self.batches
    }

    fn create_class(&mut self, class: &Identifier, kind: ClassKind) -> Result<()> {
        self.requests += 1;
        if self.classes.contains_key(class.as_str()) {
            return Err(server_error(format!("Class '{class}' already exists in current database")));
        }
        let cluster = FIRST_USER_CLUSTER + self.classes.len() as i64;
        self.classes.insert(
            class.to_string(),
            ClassEntry {
                kind,
                cluster,
                next_position: 0,
                properties: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn allocate(&mut self, class: &Identifier, kind: ClassKind) -> Result<RecordId> {
        let entry = self
            .classes
            .get_mut(class.as_str())
            .ok_or_else(|| server_error(format!("Class '{class}' was not found")))?;
        if entry.kind != kind {
            return Err(server_error(format!(
                "Class '{class}' does not extend {}",
                if kind == ClassKind::Vertex { "V" } else { "E" }
            )));
        }
        let rid = RecordId::new(entry.cluster, entry.next_position);
        entry.next_position += 1;
        Ok(rid)
    }
}

impl GraphStore for MemoryStore {
    fn create_vertex_class(&mut self, class: &Identifier) -> Result<()> {
        self.create_class(class, ClassKind::Vertex)
    }

    fn create_edge_class(&mut self, class: &Identifier) -> Result<()> {
        self.create_class(class, ClassKind::Edge)
    }

    fn create_property(
        &mut self,
        class: &Identifier,
        property: &Identifier,
        kind: PropertyType,
    ) -> Result<()> {
        self.requests += 1;
        let entry = self
            .classes
            .get_mut(class.as_str())
            .ok_or_else(|| server_error(format!("Class '{class}' was not found")))?;
        if entry.properties.contains_key(property.as_str()) {
            return Err(server_error(format!(
                "Property '{class}.{property}' already exists"
            )));
        }
        entry.properties.insert(property.to_string(), kind);
        Ok(())
    }

    fn find_vertex(&mut self, class: &Identifier, filter: &Content) -> Result<Option<RecordId>> {
        self.requests += 1;
        if !self.classes.contains_key(class.as_str()) {
            return Err(server_error(format!("Class '{class}' was not found")));
        }
        let matches = |v: &StoredVertex| {
            v.class == class.as_str()
                && filter.iter().all(|(k, want)| v.content.get(k) == Some(want))
        };
        if let Some(uri) = filter.get(URI_FIELD).and_then(Value::as_str) {
            let key = (class.to_string(), uri.to_string());
            let candidates = self.uri_index.get(&key).map(Vec::as_slice).unwrap_or_default();
            return Ok(candidates
                .iter()
                .copied()
                .find(|rid| self.vertices.get(rid).is_some_and(matches)));
        }
        Ok(self
            .vertices
            .iter()
            .find(|(_, v)| matches(*v))
            .map(|(rid, _)| *rid))
    }

    fn create_vertex(&mut self, class: &Identifier, content: &Content) -> Result<RecordId> {
        self.requests += 1;
        if let Some(uri) = content.get(URI_FIELD).and_then(Value::as_str) {
            if self.failing_uris.contains(uri) {
                return Err(server_error(format!("injected failure for {uri}")));
            }
        }
        let rid = self.allocate(class, ClassKind::Vertex)?;
        if let Some(uri) = content.get(URI_FIELD).and_then(Value::as_str) {
            self.uri_index
                .entry((class.to_string(), uri.to_string()))
                .or_default()
                .push(rid);
        }
        self.vertices.insert(
            rid,
            StoredVertex {
                class: class.to_string(),
                content: content.clone(),
            },
        );
        Ok(rid)
    }

    fn edge_exists(&mut self, class: &Identifier, from: RecordId, to: RecordId) -> Result<bool> {
        self.requests += 1;
        Ok(self
            .out_edges
            .get(&(class.to_string(), from))
            .is_some_and(|targets| targets.contains(&to)))
    }

    fn create_edge(
        &mut self,
        class: &Identifier,
        from: RecordId,
        to: RecordId,
        content: Option<&Content>,
    ) -> Result<RecordId> {
        self.requests += 1;
        for endpoint in [from, to] {
            if !self.vertices.contains_key(&endpoint) {
                return Err(server_error(format!("Record {endpoint} was not found")));
            }
        }
        let rid = self.allocate(class, ClassKind::Edge)?;
        self.out_edges
            .entry((class.to_string(), from))
            .or_default()
            .insert(to);
        self.edges.insert(
            rid,
            StoredEdge {
                class: class.to_string(),
                from,
                to,
                content: content.cloned(),
            },
        );
        Ok(rid)
    }

    fn submit_batch(&mut self, request: &BatchRequest) -> Result<()> {
        self.requests += 1;
        self.batches.push(request.clone());
        Ok(())
    }
}
