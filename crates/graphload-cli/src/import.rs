//! `graphload import`

use crate::{parse_pair, ConnectionArgs};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use graphload_client::{Content, GraphStore, MemoryStore};
use graphload_ingest::{
    run_import, FailurePolicy, ImportOptions, ImportReport, Progress, SchemaPlan, Stage,
    TripleSource, VertexPolicy,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Triple file; `.gz` files are inflated on the fly
    pub file: PathBuf,

    /// Vertex class for subjects
    #[arg(long)]
    pub source_class: String,

    /// Vertex class for objects
    #[arg(long)]
    pub target_class: String,

    /// Edge class for the relation
    #[arg(long)]
    pub edge_class: String,

    /// always | match-content | match-uri
    #[arg(long, default_value = "always")]
    pub vertex_policy: VertexPolicy,

    /// Extra `field=value` written into every vertex (repeatable)
    #[arg(long = "vertex-field", value_name = "FIELD=VALUE")]
    pub vertex_fields: Vec<String>,

    /// Skip lines whose edge already exists
    #[arg(long)]
    pub edge_guard: bool,

    /// Store the predicate as the edge's `uri`
    #[arg(long)]
    pub edge_uri: bool,

    /// Only create edges; the vertices must already exist
    #[arg(long)]
    pub skip_vertices: bool,

    /// Process at most N data lines
    #[arg(long)]
    pub limit: Option<usize>,

    /// Stop at the first failed record instead of reporting it
    #[arg(long)]
    pub abort_on_error: bool,

    /// Write the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Run against an in-memory store instead of the server
    #[arg(long)]
    pub dry_run: bool,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl ImportArgs {
    pub fn options(&self) -> Result<ImportOptions> {
        let plan = SchemaPlan::new(&self.source_class, &self.target_class, &self.edge_class)?;
        let mut vertex_extra = Content::new();
        for raw in &self.vertex_fields {
            let (key, value) = parse_pair(raw)?;
            vertex_extra.insert(key, Value::String(value));
        }
        Ok(ImportOptions {
            plan,
            vertex_policy: self.vertex_policy,
            vertex_extra,
            edge_guard: self.edge_guard,
            edge_uri: self.edge_uri,
            skip_vertices: self.skip_vertices,
            limit: self.limit,
            failure_policy: if self.abort_on_error {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            },
        })
    }
}

pub fn cmd_import(connection: &ConnectionArgs, args: &ImportArgs) -> Result<ImportReport> {
    let options = args.options()?;
    let source = TripleSource::file(&args.file);
    info!(
        input = %source.describe(),
        dry_run = args.dry_run,
        policy = ?options.vertex_policy,
        edge_guard = options.edge_guard,
        "import requested"
    );
    println!(
        "{} {} {}",
        "Importing".green().bold(),
        args.file.display(),
        if args.dry_run { "(dry run)" } else { "" }
    );

    let mut progress = BarProgress::new(!args.no_progress);
    let report = if args.dry_run {
        let mut store = MemoryStore::new();
        run(&mut store, &source, &options, &mut progress)?
    } else {
        let mut client = connection.connect()?;
        run(&mut client, &source, &options, &mut progress)?
    };

    print_report(&report);
    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
        println!("  {} {}", "→".cyan(), path.display());
    }
    Ok(report)
}

fn run<S: GraphStore + ?Sized>(
    store: &mut S,
    source: &TripleSource,
    options: &ImportOptions,
    progress: &mut BarProgress,
) -> Result<ImportReport> {
    let result = run_import(store, source, options, progress);
    progress.finish();
    result.with_context(|| format!("importing {}", source.describe()))
}

fn print_report(report: &ImportReport) {
    for line in report.to_string().lines() {
        println!("  {} {}", "→".cyan(), line);
    }
    if report.has_failures() {
        println!(
            "  {} {} malformed lines, {} vertex failures, {} edge failures",
            "!".yellow().bold(),
            report.malformed.len(),
            report.vertex_failures(),
            report.edge_failures()
        );
    } else {
        println!("{}", "Done.".green());
    }
}

/// Progress bars on stderr, one per stage.
pub struct BarProgress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl BarProgress {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    fn style(total: Option<u64>) -> ProgressStyle {
        let template = match total {
            Some(_) => "{spinner:.green} {prefix:24} [{bar:40.cyan/blue}] {pos}/{len} [{elapsed_precise}]",
            None => "{spinner:.green} {prefix:24} {pos} [{elapsed_precise}]",
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

impl Progress for BarProgress {
    fn wants_totals(&self) -> bool {
        self.enabled
    }

    fn begin(&mut self, stage: Stage, total: Option<u64>) {
        self.finish();
        if !self.enabled {
            return;
        }
        let bar = match total {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.set_style(Self::style(total));
        bar.set_prefix(stage.label());
        self.bar = Some(bar);
    }

    fn advance(&mut self, n: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(n);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}
