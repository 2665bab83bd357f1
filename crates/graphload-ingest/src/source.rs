//! Line-oriented inputs.
//!
//! A [`TripleSource`] can be read any number of times; every pass reopens it
//! (and re-inflates it when gzip'd), which is what the multi-pass importer
//! needs. [`RawLines`] yields line bytes without assuming UTF-8 so that one
//! bad line can be reported instead of ending the pass.

use crate::triple::ParsedLine;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum TripleSource {
    /// A file on disk; gzip'd when the name ends in `.gz`.
    File(PathBuf),
    /// In-memory text.
    Text(String),
}

impl TripleSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        TripleSource::File(path.as_ref().to_path_buf())
    }

    pub fn text(text: impl Into<String>) -> Self {
        TripleSource::Text(text.into())
    }

    pub fn describe(&self) -> String {
        match self {
            TripleSource::File(path) => path.display().to_string(),
            TripleSource::Text(_) => "<text>".to_string(),
        }
    }

    fn is_gzip(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false)
    }

    pub fn open(&self) -> io::Result<Box<dyn BufRead>> {
        match self {
            TripleSource::File(path) => {
                let file = File::open(path)?;
                if Self::is_gzip(path) {
                    Ok(Box::new(BufReader::new(MultiGzDecoder::new(BufReader::new(file)))))
                } else {
                    Ok(Box::new(BufReader::new(file)))
                }
            }
            TripleSource::Text(text) => Ok(Box::new(Cursor::new(text.clone().into_bytes()))),
        }
    }

    pub fn lines(&self) -> io::Result<RawLines> {
        Ok(RawLines::new(self.open()?))
    }

    /// Total physical lines, for sizing progress displays.
    pub fn count_lines(&self) -> io::Result<u64> {
        let mut total = 0;
        for line in self.lines()? {
            line?;
            total += 1;
        }
        Ok(total)
    }

    /// Scan with at most `limit` data lines (comments and blanks are free).
    pub fn scan(&self, limit: Option<usize>) -> io::Result<LineScanner> {
        Ok(LineScanner {
            lines: self.lines()?,
            line_no: 0,
            data_seen: 0,
            limit,
        })
    }
}

/// Lines as bytes with the trailing `\n` / `\r\n` removed.
pub struct RawLines {
    reader: Box<dyn BufRead>,
}

impl RawLines {
    pub fn new(reader: Box<dyn BufRead>) -> Self {
        Self { reader }
    }
}

impl Iterator for RawLines {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                Some(Ok(buf))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// One classified input line. `line_no` is 1-based.
#[derive(Debug, Clone)]
pub struct ScannedLine {
    pub line_no: usize,
    pub text: String,
    pub parsed: ParsedLine,
}

pub struct LineScanner {
    lines: RawLines,
    line_no: usize,
    data_seen: usize,
    limit: Option<usize>,
}

impl Iterator for LineScanner {
    type Item = io::Result<ScannedLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(limit) = self.limit {
            if self.data_seen >= limit {
                return None;
            }
        }
        let bytes = match self.lines.next()? {
            Ok(bytes) => bytes,
            Err(err) => return Some(Err(err)),
        };
        self.line_no += 1;
        let (text, parsed) = match String::from_utf8(bytes) {
            Ok(text) => {
                let parsed = ParsedLine::parse(&text);
                (text, parsed)
            }
            Err(err) => (
                String::from_utf8_lossy(err.as_bytes()).into_owned(),
                ParsedLine::Malformed {
                    reason: format!("invalid UTF-8: {}", err.utf8_error()),
                },
            ),
        };
        if parsed.is_data() {
            self.data_seen += 1;
        }
        Some(Ok(ScannedLine {
            line_no: self.line_no,
            text,
            parsed,
        }))
    }
}
