//! Deduplicating line reader.
//!
//! Pipes a stream of commands into batched writes, dropping any command
//! already seen in this run. Lines are compared after trimming, by SHA-224
//! digest, so two lines that differ only in surrounding whitespace count as
//! the same command. Reading stops at end of input or at the first blank line.

use crate::error::Result;
use crate::source::RawLines;
use graphload_client::{BatchBuffer, GraphStore};
use serde::Serialize;
use sha2::{Digest, Sha224};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

/// SHA-224 of the line's bytes.
pub fn line_digest(line: &str) -> [u8; 28] {
    Sha224::digest(line.as_bytes()).into()
}

#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<[u8; 28]>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` the first time a (trimmed) line is offered, `false` afterwards.
    pub fn admit(&mut self, line: &str) -> bool {
        self.seen.insert(line_digest(line.trim()))
    }

}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidLine {
    pub line_no: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupOutcome {
    pub forwarded: usize,
    pub duplicates: usize,
    pub batches_submitted: usize,
    pub stopped_at_blank: bool,
    pub invalid: Vec<InvalidLine>,
}

/// Forward each unique line to `buffer` (echoing `"{n} {line}"` to `echo`),
/// flushing through `store` whenever the buffer's threshold is reached and
/// once more at the end.
///
/// The echo is best-effort: once a write to it fails, echoing stops and the
/// remaining input is still forwarded.
pub fn forward_unique_lines<S, W>(
    input: Box<dyn BufRead>,
    store: &mut S,
    buffer: &mut BatchBuffer,
    echo: &mut W,
) -> Result<DedupOutcome>
where
    S: GraphStore + ?Sized,
    W: Write,
{
    let mut dedup = Deduplicator::new();
    let mut outcome = DedupOutcome::default();
    let mut echoing = true;

    for (index, bytes) in RawLines::new(input).enumerate() {
        let line_no = index + 1;
        let line = match String::from_utf8(bytes?) {
            Ok(line) => line,
            Err(err) => {
                warn!(line_no, "skipping line that is not UTF-8");
                outcome.invalid.push(InvalidLine {
                    line_no,
                    reason: format!("invalid UTF-8: {}", err.utf8_error()),
                });
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            outcome.stopped_at_blank = true;
            break;
        }
        if !dedup.admit(line) {
            outcome.duplicates += 1;
            continue;
        }

        if echoing {
            if let Err(err) = writeln!(echo, "{} {}", outcome.forwarded, line) {
                warn!(error = %err, "echo closed; commands are still submitted");
                echoing = false;
            }
        }
        outcome.forwarded += 1;
        buffer.push(line);

        if buffer.should_flush() {
            flush(store, buffer, &mut outcome)?;
        }
    }

    flush(store, buffer, &mut outcome)?;
    info!(
        forwarded = outcome.forwarded,
        duplicates = outcome.duplicates,
        batches = outcome.batches_submitted,
        "batch input drained"
    );
    Ok(outcome)
}

fn flush<S: GraphStore + ?Sized>(
    store: &mut S,
    buffer: &mut BatchBuffer,
    outcome: &mut DedupOutcome,
) -> Result<()> {
    if let Some(request) = buffer.take_request() {
        debug!(commands = request.command_count(), "submitting batch");
        store.submit_batch(&request)?;
        outcome.batches_submitted += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphload_client::{BatchOptions, MemoryStore};
    use proptest::prelude::*;
    use std::io::Cursor;

    fn input(text: &str) -> Box<dyn BufRead> {
        Box::new(Cursor::new(text.as_bytes().to_vec()))
    }

    fn run(text: &str, options: BatchOptions) -> (DedupOutcome, MemoryStore, String) {
        let mut store = MemoryStore::new();
        let mut buffer = BatchBuffer::new("sql", options);
        let mut echo = Vec::new();
        let outcome = forward_unique_lines(input(text), &mut store, &mut buffer, &mut echo).unwrap();
        (outcome, store, String::from_utf8(echo).unwrap())
    }

    #[test]
    fn duplicates_are_forwarded_once() {
        let (outcome, store, echo) = run("cmd1\ncmd1\ncmd2\n", BatchOptions::default());
        assert_eq!(outcome.forwarded, 2);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(store.batches().len(), 1);
        assert_eq!(store.batches()[0].operations[0].script, vec!["cmd1", "cmd2"]);
        assert_eq!(echo, "0 cmd1\n1 cmd2\n");
    }

    #[test]
    fn surrounding_whitespace_does_not_make_a_new_command() {
        let (outcome, store, _) = run("  cmd1\ncmd1   \n\tcmd1\n", BatchOptions::default());
        assert_eq!(outcome.forwarded, 1);
        assert_eq!(store.batches()[0].operations[0].script, vec!["cmd1"]);
    }

    #[test]
    fn blank_line_ends_the_input() {
        let (outcome, store, _) = run("a\nb\n\nc\n", BatchOptions::default());
        assert!(outcome.stopped_at_blank);
        assert_eq!(store.batches()[0].operations[0].script, vec!["a", "b"]);
    }

    #[test]
    fn empty_input_sends_nothing() {
        let (outcome, store, _) = run("", BatchOptions::default());
        assert_eq!(outcome.forwarded, 0);
        assert!(store.batches().is_empty());
    }

    #[test]
    fn auto_flush_splits_batches_in_order() {
        let options = BatchOptions {
            transaction: true,
            auto_flush_at: Some(2),
        };
        let (outcome, store, _) = run("a\nb\nc\nd\ne\n", options);
        assert_eq!(outcome.batches_submitted, 3);
        let scripts: Vec<Vec<String>> = store
            .batches()
            .iter()
            .map(|b| b.operations[0].script.clone())
            .collect();
        assert_eq!(scripts, vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);
    }

    #[test]
    fn invalid_utf8_is_collected_not_fatal() {
        let mut store = MemoryStore::new();
        let mut buffer = BatchBuffer::new("sql", BatchOptions::default());
        let mut echo = Vec::new();
        let bytes = b"a\n\xff\xfe\nb\n".to_vec();
        let outcome =
            forward_unique_lines(Box::new(Cursor::new(bytes)), &mut store, &mut buffer, &mut echo)
                .unwrap();
        assert_eq!(outcome.forwarded, 2);
        assert_eq!(outcome.invalid.len(), 1);
        assert_eq!(outcome.invalid[0].line_no, 2);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn closed_echo_still_submits_every_command() {
        let mut store = MemoryStore::new();
        let mut buffer = BatchBuffer::new("sql", BatchOptions::default());
        let outcome =
            forward_unique_lines(input("a\nb\na\nc\n"), &mut store, &mut buffer, &mut ClosedPipe)
                .unwrap();
        assert_eq!(outcome.forwarded, 3);
        assert_eq!(outcome.batches_submitted, 1);
        assert_eq!(store.batches()[0].operations[0].script, vec!["a", "b", "c"]);
    }

    proptest! {
        #[test]
        fn forwards_each_distinct_line_exactly_once(lines in proptest::collection::vec("[a-c]{1,3}", 0..40)) {
            let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
            let (_, store, _) = run(&text, BatchOptions::default());
            let sent: Vec<String> = store
                .batches()
                .iter()
                .flat_map(|b| b.operations[0].script.clone())
                .collect();

            let mut expected = Vec::new();
            for line in &lines {
                if !expected.contains(line) {
                    expected.push(line.clone());
                }
            }
            prop_assert_eq!(sent, expected);
        }
    }
}
