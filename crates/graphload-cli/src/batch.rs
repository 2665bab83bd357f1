//! `graphload batch`

use crate::ConnectionArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use graphload_client::{BatchBuffer, BatchOptions};
use graphload_ingest::forward_unique_lines;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::info;

pub fn cmd_batch(
    connection: &ConnectionArgs,
    input: Option<&PathBuf>,
    auto_flush: Option<usize>,
    transaction: bool,
) -> Result<()> {
    let mut client = connection.connect()?;
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let options = BatchOptions {
        transaction,
        auto_flush_at: auto_flush.filter(|n| *n > 0),
    };
    info!(
        input = %input.map_or_else(|| "stdin".to_string(), |p| p.display().to_string()),
        auto_flush = ?options.auto_flush_at,
        transaction,
        "reading batch commands"
    );
    let mut buffer = BatchBuffer::new(&client.config().language, options);
    let mut stdout = io::stdout().lock();
    let outcome = forward_unique_lines(reader, &mut client, &mut buffer, &mut stdout)?;

    eprintln!(
        "{} {} commands in {} batch(es), {} duplicates dropped",
        "Submitted".green().bold(),
        outcome.forwarded,
        outcome.batches_submitted,
        outcome.duplicates
    );
    for invalid in &outcome.invalid {
        eprintln!("  {} line {}: {}", "!".yellow(), invalid.line_no, invalid.reason);
    }
    Ok(())
}
