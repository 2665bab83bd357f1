//! Run summary.
//!
//! Per-record failures never abort an import under the default policy; they
//! land here instead, so the operator sees exactly which lines and
//! identifiers did not make it into the store.

use crate::source::ScannedLine;
use crate::triple::{ParsedLine, Role, TripleLine};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedLine {
    pub line_no: usize,
    pub text: String,
    pub reason: String,
}

/// An edge endpoint whose `uri` matched no vertex of its class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionMiss {
    pub line_no: usize,
    pub role: Role,
    pub uri: String,
}

/// An edge endpoint lookup that the store rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionFailure {
    pub line_no: usize,
    pub role: Role,
    pub uri: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VertexFailure {
    pub role: Role,
    pub uri: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeFailure {
    pub line_no: usize,
    pub source_uri: String,
    pub target_uri: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub lines: usize,
    pub comments: usize,
    pub blanks: usize,
    pub data_lines: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    pub created: Vec<String>,
    pub already_present: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VertexStats {
    pub distinct: usize,
    pub created: usize,
    pub already_present: usize,
    pub failed: Vec<VertexFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeStats {
    pub lines: usize,
    pub created: usize,
    pub duplicates_skipped: usize,
    pub unresolved_lines: usize,
    pub cache_hits: usize,
    pub store_lookups: usize,
    pub misses: Vec<ResolutionMiss>,
    pub resolution_errors: Vec<ResolutionFailure>,
    pub failed: Vec<EdgeFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub input: String,
    pub scan: ScanStats,
    pub malformed: Vec<MalformedLine>,
    pub schema: SchemaReport,
    pub source_vertices: VertexStats,
    pub target_vertices: VertexStats,
    pub edges: EdgeStats,
}

impl ImportReport {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            ..Default::default()
        }
    }

    /// Count one scanned line, keeping malformed ones, and hand back the
    /// triple when there is one.
    pub fn tally(&mut self, line: ScannedLine) -> Option<TripleLine> {
        self.scan.lines += 1;
        match line.parsed {
            ParsedLine::Blank => {
                self.scan.blanks += 1;
                None
            }
            ParsedLine::Comment => {
                self.scan.comments += 1;
                None
            }
            ParsedLine::Triple(triple) => {
                self.scan.data_lines += 1;
                Some(triple)
            }
            ParsedLine::Malformed { reason } => {
                self.scan.data_lines += 1;
                tracing::warn!(line_no = line.line_no, %reason, "malformed line");
                self.malformed.push(MalformedLine {
                    line_no: line.line_no,
                    text: line.text,
                    reason,
                });
                None
            }
        }
    }

    pub fn vertices_mut(&mut self, role: Role) -> &mut VertexStats {
        match role {
            Role::Source => &mut self.source_vertices,
            Role::Target => &mut self.target_vertices,
        }
    }

    pub fn vertex_failures(&self) -> usize {
        self.source_vertices.failed.len() + self.target_vertices.failed.len()
    }

    pub fn edge_failures(&self) -> usize {
        self.edges.misses.len() + self.edges.resolution_errors.len() + self.edges.failed.len()
    }

    /// Whether any record was skipped because of an error.
    pub fn has_failures(&self) -> bool {
        !self.malformed.is_empty() || self.vertex_failures() > 0 || self.edge_failures() > 0
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "input: {}", self.input)?;
        writeln!(
            f,
            "lines: {} ({} data, {} comments, {} blank, {} malformed)",
            self.scan.lines,
            self.scan.data_lines,
            self.scan.comments,
            self.scan.blanks,
            self.malformed.len()
        )?;
        if !self.schema.created.is_empty() || !self.schema.already_present.is_empty() {
            writeln!(
                f,
                "schema: {} created, {} already present",
                self.schema.created.len(),
                self.schema.already_present.len()
            )?;
        }
        for (role, stats) in [
            (Role::Source, &self.source_vertices),
            (Role::Target, &self.target_vertices),
        ] {
            writeln!(
                f,
                "{role} vertices: {} distinct, {} created, {} already present, {} failed",
                stats.distinct,
                stats.created,
                stats.already_present,
                stats.failed.len()
            )?;
        }
        writeln!(
            f,
            "edges: {} created, {} duplicates skipped, {} lines unresolved, {} failed",
            self.edges.created,
            self.edges.duplicates_skipped,
            self.edges.unresolved_lines,
            self.edges.failed.len()
        )?;
        writeln!(
            f,
            "resolution: {} cache hits, {} store lookups, {} misses, {} errors",
            self.edges.cache_hits,
            self.edges.store_lookups,
            self.edges.misses.len(),
            self.edges.resolution_errors.len()
        )?;
        for miss in self.edges.misses.iter().take(10) {
            writeln!(f, "  miss: line {} {} {}", miss.line_no, miss.role, miss.uri)?;
        }
        if self.edges.misses.len() > 10 {
            writeln!(f, "  ... {} more misses", self.edges.misses.len() - 10)?;
        }
        Ok(())
    }
}
