//! Vertex materialization.
//!
//! Two steps: one pass over the input collects the distinct source and
//! target identifiers, then one vertex `{uri: identifier}` is created per
//! identifier in the matching class. Creation order is the set's iteration
//! order.

use crate::error::{IngestError, Result};
use crate::policy::{FailurePolicy, VertexPolicy};
use crate::progress::{Progress, Stage};
use crate::report::{ImportReport, VertexFailure, VertexStats};
use crate::source::TripleSource;
use crate::triple::Role;
use graphload_client::{ClientError, Content, GraphStore, Identifier};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

/// Distinct identifiers per role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub sources: HashSet<String>,
    pub targets: HashSet<String>,
}

impl Discovery {
    pub fn for_role(&self, role: Role) -> &HashSet<String> {
        match role {
            Role::Source => &self.sources,
            Role::Target => &self.targets,
        }
    }
}

/// Scan the input once, collecting identifiers and tallying every line into
/// `report` (malformed lines included).
pub fn discover_identifiers(
    source: &TripleSource,
    limit: Option<usize>,
    report: &mut ImportReport,
    progress: &mut dyn Progress,
) -> Result<Discovery> {
    let total = if progress.wants_totals() {
        Some(source.count_lines().map_err(|e| read_error(source, e))?)
    } else {
        None
    };
    progress.begin(Stage::Scanning, total);

    let mut discovery = Discovery::default();
    for scanned in source.scan(limit).map_err(|e| read_error(source, e))? {
        let scanned = scanned.map_err(|e| read_error(source, e))?;
        if let Some(triple) = report.tally(scanned) {
            discovery.sources.insert(triple.subject);
            discovery.targets.insert(triple.object);
        }
        progress.advance(1);
    }
    progress.finish();

    report.source_vertices.distinct = discovery.sources.len();
    report.target_vertices.distinct = discovery.targets.len();
    info!(
        sources = discovery.sources.len(),
        targets = discovery.targets.len(),
        malformed = report.malformed.len(),
        "identifiers collected"
    );
    Ok(discovery)
}

pub(crate) fn read_error(source: &TripleSource, err: std::io::Error) -> IngestError {
    IngestError::Read {
        input: source.describe(),
        source: err,
    }
}

/// Everything needed to create one role's vertices.
#[derive(Debug, Clone)]
pub struct VertexJob<'a> {
    pub class: &'a Identifier,
    pub role: Role,
    pub uri_property: &'a Identifier,
    /// Extra fields written into every vertex alongside the uri.
    pub extra: &'a Content,
    pub policy: VertexPolicy,
    pub failure: FailurePolicy,
}

impl VertexJob<'_> {
    pub fn content_for(&self, uri: &str) -> Content {
        let mut content = self.extra.clone();
        content.insert(
            self.uri_property.to_string(),
            Value::String(uri.to_string()),
        );
        content
    }

    fn existence_filter(&self, content: &Content, uri: &str) -> Option<Content> {
        match self.policy {
            VertexPolicy::Always => None,
            VertexPolicy::MatchContent => Some(content.clone()),
            VertexPolicy::MatchUri => {
                let mut filter = Content::new();
                filter.insert(
                    self.uri_property.to_string(),
                    Value::String(uri.to_string()),
                );
                Some(filter)
            }
        }
    }
}

/// Create one vertex per identifier according to `job.policy`.
pub fn materialize_vertices<'i, S, I>(
    store: &mut S,
    job: &VertexJob<'_>,
    identifiers: I,
    progress: &mut dyn Progress,
) -> Result<VertexStats>
where
    S: GraphStore + ?Sized,
    I: IntoIterator<Item = &'i String>,
    I::IntoIter: ExactSizeIterator,
{
    let identifiers = identifiers.into_iter();
    let mut stats = VertexStats {
        distinct: identifiers.len(),
        ..Default::default()
    };
    let stage = match job.role {
        Role::Source => Stage::SourceVertices,
        Role::Target => Stage::TargetVertices,
    };
    progress.begin(stage, Some(stats.distinct as u64));

    for uri in identifiers {
        progress.advance(1);
        let content = job.content_for(uri);

        if let Some(filter) = job.existence_filter(&content, uri) {
            match store.find_vertex(job.class, &filter) {
                Ok(Some(_)) => {
                    stats.already_present += 1;
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    record_failure(&mut stats, job, uri, err)?;
                    continue;
                }
            }
        }

        match store.create_vertex(job.class, &content) {
            Ok(_) => stats.created += 1,
            Err(err) => record_failure(&mut stats, job, uri, err)?,
        }
    }
    progress.finish();

    info!(
        role = %job.role,
        class = %job.class,
        created = stats.created,
        already_present = stats.already_present,
        failed = stats.failed.len(),
        "vertices materialized"
    );
    Ok(stats)
}

fn record_failure(
    stats: &mut VertexStats,
    job: &VertexJob<'_>,
    uri: &str,
    err: ClientError,
) -> Result<()> {
    if err.is_fatal() {
        return Err(err.into());
    }
    warn!(role = %job.role, %uri, error = %err, "vertex not created");
    let reason = err.to_string();
    stats.failed.push(VertexFailure {
        role: job.role,
        uri: uri.to_string(),
        reason: reason.clone(),
    });
    match job.failure {
        FailurePolicy::Continue => Ok(()),
        FailurePolicy::Abort => Err(IngestError::Aborted {
            stage: "vertex creation",
            reason: format!("{} vertex {uri}: {reason}", job.role),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use graphload_client::sql::content_of;
    use graphload_client::MemoryStore;
    use serde_json::json;

    fn ident(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn ids(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn store_with(class: &str) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.create_vertex_class(&ident(class)).unwrap();
        store
    }

    #[test]
    fn discovery_collects_distinct_identifiers_per_role() {
        let source = TripleSource::text(
            "# comment\nA knows B .\nA knows C .\nC knows A .\nbad line\n",
        );
        let mut report = ImportReport::new("t");
        let discovery = discover_identifiers(&source, None, &mut report, &mut NoProgress).unwrap();
        assert_eq!(discovery.sources, ids(&["A", "C"]));
        assert_eq!(discovery.targets, ids(&["B", "C", "A"]));
        assert_eq!(report.scan.data_lines, 4);
        assert_eq!(report.scan.comments, 1);
        assert_eq!(report.malformed.len(), 1);
        assert_eq!(report.malformed[0].line_no, 5);
    }

    #[test]
    fn always_policy_creates_every_identifier() {
        let mut store = store_with("article");
        let class = ident("article");
        let uri = ident("uri");
        let extra = Content::new();
        let job = VertexJob {
            class: &class,
            role: Role::Source,
            uri_property: &uri,
            extra: &extra,
            policy: VertexPolicy::Always,
            failure: FailurePolicy::Continue,
        };
        let stats = materialize_vertices(&mut store, &job, &ids(&["A", "B"]), &mut NoProgress).unwrap();
        assert_eq!(stats.created, 2);
        let expected: std::collections::BTreeSet<String> =
            ["A", "B"].iter().map(|s| s.to_string()).collect();
        assert_eq!(store.vertex_uris("article"), expected);
    }

    #[test]
    fn match_content_skips_identical_vertices_only() {
        let mut store = store_with("article");
        let class = ident("article");
        let uri = ident("uri");
        store
            .create_vertex(&class, &content_of([("uri", "A"), ("origin", "old")]))
            .unwrap();
        store.create_vertex(&class, &content_of([("uri", "B"), ("origin", "dbpedia")])).unwrap();

        let mut extra = Content::new();
        extra.insert("origin".to_string(), json!("dbpedia"));
        let job = VertexJob {
            class: &class,
            role: Role::Source,
            uri_property: &uri,
            extra: &extra,
            policy: VertexPolicy::MatchContent,
            failure: FailurePolicy::Continue,
        };
        let stats = materialize_vertices(&mut store, &job, &ids(&["A", "B"]), &mut NoProgress).unwrap();
        // A differs in `origin`, so it is created again; B is identical.
        assert_eq!(stats.created, 1);
        assert_eq!(stats.already_present, 1);
        assert_eq!(store.vertex_count("article"), 3);
    }

    #[test]
    fn match_uri_ignores_other_fields() {
        let mut store = store_with("article");
        let class = ident("article");
        let uri = ident("uri");
        store
            .create_vertex(&class, &content_of([("uri", "A"), ("origin", "old")]))
            .unwrap();

        let mut extra = Content::new();
        extra.insert("origin".to_string(), json!("dbpedia"));
        let job = VertexJob {
            class: &class,
            role: Role::Source,
            uri_property: &uri,
            extra: &extra,
            policy: VertexPolicy::MatchUri,
            failure: FailurePolicy::Continue,
        };
        let stats = materialize_vertices(&mut store, &job, &ids(&["A"]), &mut NoProgress).unwrap();
        assert_eq!(stats.created, 0);
        assert_eq!(stats.already_present, 1);
    }

    #[test]
    fn failures_are_collected_or_abort() {
        let class = ident("article");
        let uri = ident("uri");
        let extra = Content::new();
        let mut job = VertexJob {
            class: &class,
            role: Role::Target,
            uri_property: &uri,
            extra: &extra,
            policy: VertexPolicy::Always,
            failure: FailurePolicy::Continue,
        };

        let mut store = store_with("article");
        store.fail_vertex_creation_for("B");
        let stats =
            materialize_vertices(&mut store, &job, &ids(&["A", "B", "C"]), &mut NoProgress).unwrap();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.failed.len(), 1);
        assert_eq!(stats.failed[0].uri, "B");
        assert_eq!(stats.failed[0].role, Role::Target);

        job.failure = FailurePolicy::Abort;
        let mut store = store_with("article");
        store.fail_vertex_creation_for("B");
        let err = materialize_vertices(&mut store, &job, &ids(&["B"]), &mut NoProgress).unwrap_err();
        assert!(matches!(err, IngestError::Aborted { .. }));
    }
}
