//! Client-driven pagination.
//!
//! The store has no server-side cursors; a result set is walked by re-issuing
//! the same query with an increasing `SKIP` until a page comes back empty.
//! [`Pager`] hides that loop behind an iterator.

use crate::error::{ClientError, Result};
use serde_json::Value;
use std::collections::VecDeque;

/// Lazily fetches pages from `fetch(skip)`.
///
/// - `skip` is the number of rows yielded so far;
/// - the first empty page ends the sequence;
/// - a fetch error is yielded once, after which the pager is exhausted.
pub struct Pager<F>
where
    F: FnMut(u64) -> Result<Vec<Value>>,
{
    fetch: F,
    buffer: VecDeque<Value>,
    offset: u64,
    pages: u64,
    done: bool,
}

impl<F> Pager<F>
where
    F: FnMut(u64) -> Result<Vec<Value>>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            buffer: VecDeque::new(),
            offset: 0,
            pages: 0,
            done: false,
        }
    }

    /// Start over from offset zero; the next call re-issues the first page.
    pub fn restart(&mut self) {
        self.buffer.clear();
        self.offset = 0;
        self.pages = 0;
        self.done = false;
    }

    /// Rows yielded so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Pages fetched so far (including the terminating empty page).
    pub fn pages_fetched(&self) -> u64 {
        self.pages
    }

    fn fill(&mut self) -> Option<ClientError> {
        match (self.fetch)(self.offset) {
            Ok(rows) => {
                self.pages += 1;
                if rows.is_empty() {
                    self.done = true;
                }
                self.buffer.extend(rows);
                None
            }
            Err(err) => {
                self.done = true;
                Some(err)
            }
        }
    }
}

impl<F> Iterator for Pager<F>
where
    F: FnMut(u64) -> Result<Vec<Value>>,
{
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            if let Some(err) = self.fill() {
                return Some(Err(err));
            }
        }
        let row = self.buffer.pop_front()?;
        self.offset += 1;
        Some(Ok(row))
    }
}
