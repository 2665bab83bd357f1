//! The triple import pipeline.
//!
//! Stages run strictly one after another: schema, identifier discovery,
//! source vertices, target vertices, edges. Nothing overlaps, and a stage
//! that fails fatally leaves the store in whatever state its last completed
//! request produced.

use crate::edges::{materialize_edges, EdgeOptions};
use crate::error::Result;
use crate::policy::{FailurePolicy, VertexPolicy};
use crate::progress::Progress;
use crate::report::ImportReport;
use crate::schema::{initialize_schema, SchemaPlan};
use crate::source::TripleSource;
use crate::triple::Role;
use crate::vertices::{discover_identifiers, materialize_vertices, VertexJob};
use graphload_client::{Content, GraphStore};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub plan: SchemaPlan,
    pub vertex_policy: VertexPolicy,
    /// Fields written into every vertex next to its `uri`.
    pub vertex_extra: Content,
    pub edge_guard: bool,
    pub edge_uri: bool,
    /// Go straight to the edge pass, assuming the vertices already exist.
    pub skip_vertices: bool,
    /// Process at most this many data lines per pass.
    pub limit: Option<usize>,
    pub failure_policy: FailurePolicy,
}

impl ImportOptions {
    pub fn new(plan: SchemaPlan) -> Self {
        Self {
            plan,
            vertex_policy: VertexPolicy::default(),
            vertex_extra: Content::new(),
            edge_guard: false,
            edge_uri: false,
            skip_vertices: false,
            limit: None,
            failure_policy: FailurePolicy::default(),
        }
    }

    fn edge_options(&self) -> EdgeOptions {
        EdgeOptions {
            guard: self.edge_guard,
            uri_payload: self.edge_uri,
            limit: self.limit,
            failure: self.failure_policy,
        }
    }
}

pub fn run_import<S: GraphStore + ?Sized>(
    store: &mut S,
    source: &TripleSource,
    options: &ImportOptions,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    let mut report = ImportReport::new(&source.describe());
    info!(input = %report.input, "starting import");

    report.schema = initialize_schema(store, &options.plan)?;

    if !options.skip_vertices {
        let discovery = discover_identifiers(source, options.limit, &mut report, progress)?;
        for role in [Role::Source, Role::Target] {
            let job = VertexJob {
                class: options.plan.class_for(role),
                role,
                uri_property: &options.plan.uri_property,
                extra: &options.vertex_extra,
                policy: options.vertex_policy,
                failure: options.failure_policy,
            };
            let stats = if role == Role::Target && options.plan.shares_vertex_class() {
                // Objects that were also subjects got their vertex in the source pass.
                let fresh: Vec<&String> =
                    discovery.targets.difference(&discovery.sources).collect();
                materialize_vertices(store, &job, fresh, progress)?
            } else {
                materialize_vertices(store, &job, discovery.for_role(role), progress)?
            };
            *report.vertices_mut(role) = stats;
        }
    }

    materialize_edges(
        store,
        &options.plan,
        source,
        &options.edge_options(),
        &mut report,
        options.skip_vertices,
        progress,
    )?;

    info!(
        edges = report.edges.created,
        failures = report.vertex_failures() + report.edge_failures(),
        malformed = report.malformed.len(),
        "import finished"
    );
    Ok(report)
}
