//! Edge materialization.
//!
//! A second pass over the input. Each triple's endpoints are resolved to
//! record ids (through [`ResolutionCache`], then the store), and one edge
//! `source -> target` is created per line, in file order. Lines whose
//! endpoints cannot be resolved are skipped and reported, never dropped
//! silently.

use crate::error::{IngestError, Result};
use crate::policy::FailurePolicy;
use crate::progress::{Progress, Stage};
use crate::report::{EdgeFailure, EdgeStats, ImportReport, ResolutionFailure, ResolutionMiss};
use crate::schema::SchemaPlan;
use crate::source::TripleSource;
use crate::triple::{ParsedLine, Role, TripleLine};
use crate::vertices::read_error;
use graphload_client::{ClientError, Content, GraphStore, RecordId};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Outcome of resolving one endpoint.
#[derive(Debug)]
pub enum Resolution {
    Found(RecordId),
    NotFound,
    Failed(ClientError),
}

/// URI to record id, per role, for the lifetime of one run.
///
/// Entries are never invalidated: vertices are not deleted while an import
/// runs. Only successful lookups are cached.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<(Role, String), RecordId>,
    hits: usize,
    lookups: usize,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Lookups that went to the store.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn resolve<S: GraphStore + ?Sized>(
        &mut self,
        store: &mut S,
        plan: &SchemaPlan,
        role: Role,
        uri: &str,
    ) -> Resolution {
        if let Some(rid) = self.entries.get(&(role, uri.to_string())) {
            self.hits += 1;
            return Resolution::Found(*rid);
        }

        self.lookups += 1;
        let mut filter = Content::new();
        filter.insert(
            plan.uri_property.to_string(),
            Value::String(uri.to_string()),
        );
        match store.find_vertex(plan.class_for(role), &filter) {
            Ok(Some(rid)) => {
                self.entries.insert((role, uri.to_string()), rid);
                Resolution::Found(rid)
            }
            Ok(None) => Resolution::NotFound,
            Err(err) => Resolution::Failed(err),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeOptions {
    /// Check for an existing `source -> target` edge before creating one.
    pub guard: bool,
    /// Store the triple's predicate as the edge's `uri`.
    pub uri_payload: bool,
    pub limit: Option<usize>,
    pub failure: FailurePolicy,
}

/// Create the edges for `source`, recording stats into `report.edges`.
///
/// When `tally_lines` is set the pass also fills `report.scan` and
/// `report.malformed`; the importer does this when no discovery pass ran.
pub fn materialize_edges<S: GraphStore + ?Sized>(
    store: &mut S,
    plan: &SchemaPlan,
    source: &TripleSource,
    options: &EdgeOptions,
    report: &mut ImportReport,
    tally_lines: bool,
    progress: &mut dyn Progress,
) -> Result<()> {
    let total = if progress.wants_totals() {
        Some(source.count_lines().map_err(|e| read_error(source, e))?)
    } else {
        None
    };
    progress.begin(Stage::Edges, total);

    let mut cache = ResolutionCache::new();
    let mut pass = EdgePass {
        store,
        plan,
        options,
        cache: &mut cache,
        stats: EdgeStats::default(),
    };

    for scanned in source.scan(options.limit).map_err(|e| read_error(source, e))? {
        let scanned = scanned.map_err(|e| read_error(source, e))?;
        progress.advance(1);
        let line_no = scanned.line_no;
        let triple = if tally_lines {
            report.tally(scanned)
        } else {
            match scanned.parsed {
                ParsedLine::Triple(triple) => Some(triple),
                _ => None,
            }
        };
        if let Some(triple) = triple {
            pass.stats.lines += 1;
            pass.line(line_no, &triple)?;
        }
    }
    progress.finish();

    let mut stats = pass.stats;
    stats.cache_hits = cache.hits();
    stats.store_lookups = cache.lookups();
    info!(
        created = stats.created,
        duplicates_skipped = stats.duplicates_skipped,
        unresolved = stats.unresolved_lines,
        misses = stats.misses.len(),
        cache_hits = stats.cache_hits,
        "edges materialized"
    );
    report.edges = stats;
    Ok(())
}

struct EdgePass<'a, S: ?Sized> {
    store: &'a mut S,
    plan: &'a SchemaPlan,
    options: &'a EdgeOptions,
    cache: &'a mut ResolutionCache,
    stats: EdgeStats,
}

impl<S: GraphStore + ?Sized> EdgePass<'_, S> {
    fn line(&mut self, line_no: usize, triple: &TripleLine) -> Result<()> {
        let from = self.endpoint(line_no, Role::Source, &triple.subject)?;
        let to = self.endpoint(line_no, Role::Target, &triple.object)?;
        let (Some(from), Some(to)) = (from, to) else {
            self.stats.unresolved_lines += 1;
            return Ok(());
        };

        if self.options.guard {
            match self.store.edge_exists(&self.plan.edge_class, from, to) {
                Ok(true) => {
                    debug!(line_no, %from, %to, "edge already present");
                    self.stats.duplicates_skipped += 1;
                    return Ok(());
                }
                Ok(false) => {}
                Err(err) => return self.edge_failed(line_no, triple, err),
            }
        }

        let content = self.options.uri_payload.then(|| {
            let mut content = Content::new();
            content.insert(
                self.plan.uri_property.to_string(),
                Value::String(triple.predicate.clone()),
            );
            content
        });
        match self
            .store
            .create_edge(&self.plan.edge_class, from, to, content.as_ref())
        {
            Ok(_) => {
                self.stats.created += 1;
                Ok(())
            }
            Err(err) => self.edge_failed(line_no, triple, err),
        }
    }

    fn endpoint(&mut self, line_no: usize, role: Role, uri: &str) -> Result<Option<RecordId>> {
        match self.cache.resolve(&mut *self.store, self.plan, role, uri) {
            Resolution::Found(rid) => Ok(Some(rid)),
            Resolution::NotFound => {
                warn!(line_no, %role, %uri, "endpoint not found");
                self.stats.misses.push(ResolutionMiss {
                    line_no,
                    role,
                    uri: uri.to_string(),
                });
                self.abort_if_strict(format!("line {line_no}: no {role} vertex with uri {uri}"))?;
                Ok(None)
            }
            Resolution::Failed(err) => {
                if err.is_fatal() {
                    return Err(err.into());
                }
                warn!(line_no, %role, %uri, error = %err, "endpoint lookup failed");
                let reason = err.to_string();
                self.stats.resolution_errors.push(ResolutionFailure {
                    line_no,
                    role,
                    uri: uri.to_string(),
                    reason: reason.clone(),
                });
                self.abort_if_strict(format!("line {line_no}: {role} lookup for {uri}: {reason}"))?;
                Ok(None)
            }
        }
    }

    fn edge_failed(&mut self, line_no: usize, triple: &TripleLine, err: ClientError) -> Result<()> {
        if err.is_fatal() {
            return Err(err.into());
        }
        warn!(line_no, error = %err, "edge not created");
        let reason = err.to_string();
        self.stats.failed.push(EdgeFailure {
            line_no,
            source_uri: triple.subject.clone(),
            target_uri: triple.object.clone(),
            reason: reason.clone(),
        });
        self.abort_if_strict(format!("line {line_no}: {reason}"))
    }

    fn abort_if_strict(&self, reason: String) -> Result<()> {
        match self.options.failure {
            FailurePolicy::Continue => Ok(()),
            FailurePolicy::Abort => Err(IngestError::Aborted {
                stage: "edge creation",
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::schema::initialize_schema;
    use graphload_client::sql::content_of;
    use graphload_client::MemoryStore;

    fn prepared(sources: &[&str], targets: &[&str]) -> (MemoryStore, SchemaPlan) {
        let mut store = MemoryStore::new();
        let plan = SchemaPlan::new("article", "category", "in_category").unwrap();
        initialize_schema(&mut store, &plan).unwrap();
        for uri in sources {
            store.create_vertex(&plan.source_class, &content_of([("uri", *uri)])).unwrap();
        }
        for uri in targets {
            store.create_vertex(&plan.target_class, &content_of([("uri", *uri)])).unwrap();
        }
        (store, plan)
    }

    fn run(
        store: &mut MemoryStore,
        plan: &SchemaPlan,
        text: &str,
        options: EdgeOptions,
    ) -> Result<ImportReport> {
        let mut report = ImportReport::new("t");
        materialize_edges(
            store,
            plan,
            &TripleSource::text(text),
            &options,
            &mut report,
            true,
            &mut NoProgress,
        )?;
        Ok(report)
    }

    #[test]
    fn one_line_makes_one_edge() {
        let (mut store, plan) = prepared(&["A"], &["B"]);
        let report = run(&mut store, &plan, "A knows B .\n", EdgeOptions::default()).unwrap();
        assert_eq!(report.edges.created, 1);
        assert_eq!(
            store.edge_uri_pairs("in_category"),
            vec![("A".to_string(), "B".to_string())]
        );
    }

    #[test]
    fn cache_serves_repeated_endpoints() {
        let (mut store, plan) = prepared(&["A"], &["B", "C"]);
        let report = run(
            &mut store,
            &plan,
            "A p B .\nA p C .\nA p B .\n",
            EdgeOptions::default(),
        )
        .unwrap();
        assert_eq!(report.edges.store_lookups, 3);
        assert_eq!(report.edges.cache_hits, 3);
        assert_eq!(report.edges.created, 3);
    }

    #[test]
    fn roles_resolve_in_their_own_class() {
        // "B" exists only as a target; a line using it as a source misses.
        let (mut store, plan) = prepared(&["A"], &["B"]);
        let report = run(&mut store, &plan, "B p A .\n", EdgeOptions::default()).unwrap();
        assert_eq!(report.edges.created, 0);
        assert_eq!(report.edges.unresolved_lines, 1);
        let roles: Vec<Role> = report.edges.misses.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Source, Role::Target]);
    }

    #[test]
    fn misses_are_reported_with_line_numbers() {
        let (mut store, plan) = prepared(&["A"], &["B"]);
        let report = run(
            &mut store,
            &plan,
            "# c\nA p B .\nA p Z .\n",
            EdgeOptions::default(),
        )
        .unwrap();
        assert_eq!(report.edges.created, 1);
        assert_eq!(
            report.edges.misses,
            vec![ResolutionMiss {
                line_no: 3,
                role: Role::Target,
                uri: "Z".to_string()
            }]
        );
        assert!(report.has_failures());
    }

    #[test]
    fn guard_skips_existing_edges() {
        let (mut store, plan) = prepared(&["A"], &["B"]);
        let options = EdgeOptions {
            guard: true,
            ..Default::default()
        };
        run(&mut store, &plan, "A p B .\n", options).unwrap();
        let report = run(&mut store, &plan, "A p B .\nA p B .\n", options).unwrap();
        assert_eq!(report.edges.created, 0);
        assert_eq!(report.edges.duplicates_skipped, 2);
        assert_eq!(store.edge_count("in_category"), 1);
    }

    #[test]
    fn predicate_is_stored_as_edge_uri_when_asked() {
        let (mut store, plan) = prepared(&["A"], &["B"]);
        let options = EdgeOptions {
            uri_payload: true,
            ..Default::default()
        };
        run(&mut store, &plan, "A <http://x/p> B .\n", options).unwrap();
        let (_, edge) = store.edges().next().unwrap();
        assert_eq!(edge.content, Some(content_of([("uri", "<http://x/p>")])));
    }

    #[test]
    fn abort_policy_stops_at_first_miss() {
        let (mut store, plan) = prepared(&["A"], &["B"]);
        let options = EdgeOptions {
            failure: FailurePolicy::Abort,
            ..Default::default()
        };
        let err = run(&mut store, &plan, "A p Z .\nA p B .\n", options).unwrap_err();
        assert!(matches!(err, IngestError::Aborted { stage: "edge creation", .. }));
        assert_eq!(store.edge_count("in_category"), 0);
    }

    #[test]
    fn lookup_errors_are_reported_separately_from_misses() {
        // No schema at all: every lookup is a "class not found" response.
        let mut store = MemoryStore::new();
        let plan = SchemaPlan::new("article", "category", "in_category").unwrap();
        let report = run(&mut store, &plan, "A p B .\n", EdgeOptions::default()).unwrap();
        assert!(report.edges.misses.is_empty());
        assert_eq!(report.edges.resolution_errors.len(), 2);
        assert_eq!(report.edges.unresolved_lines, 1);
    }
}
