//! Operator progress reporting.
//!
//! Purely observational: the pipeline calls into a [`Progress`] at stage
//! boundaries and after each unit of work, and never depends on it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanning,
    SourceVertices,
    TargetVertices,
    Edges,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Scanning => "Getting vertices",
            Stage::SourceVertices => "Creating source vertices",
            Stage::TargetVertices => "Creating target vertices",
            Stage::Edges => "Creating edges",
        }
    }
}

pub trait Progress {
    /// Whether the caller wants line totals for line-driven stages. Computing
    /// them costs one extra pass over the input.
    fn wants_totals(&self) -> bool {
        false
    }

    fn begin(&mut self, stage: Stage, total: Option<u64>);

    fn advance(&mut self, n: u64);

    fn finish(&mut self);
}

pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&mut self, _stage: Stage, _total: Option<u64>) {}

    fn advance(&mut self, _n: u64) {}

    fn finish(&mut self) {}
}
