use crate::error::Result;
use crate::traits::Cursor;
use crate::types::{RawQueryResult, SqlValue};

/// A cursor over rows the driver has already read in full.
///
/// Reports a native row count and supports seeking back unless told otherwise.
#[derive(Debug, Clone)]
pub struct BufferedCursor {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    pos: usize,
    native_count: bool,
    seekable: bool,
}

impl BufferedCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            pos: 0,
            native_count: true,
            seekable: true,
        }
    }

    /// Behave like a streaming driver that cannot count rows up front.
    pub fn without_native_count(mut self) -> Self {
        self.native_count = false;
        self
    }

    /// Behave like a forward-only driver.
    pub fn without_seek(mut self) -> Self {
        self.seekable = false;
        self
    }
}

impl From<RawQueryResult> for BufferedCursor {
    fn from(result: RawQueryResult) -> Self {
        Self::new(result.columns, result.rows)
    }
}

impl Cursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>> {
        let row = self.rows.get(self.pos).cloned();
        if row.is_some() {
            self.pos += 1;
        }
        Ok(row)
    }

    fn native_row_count(&self) -> Option<u64> {
        self.native_count.then_some(self.rows.len() as u64)
    }

    fn seek_start(&mut self) -> bool {
        if self.seekable {
            self.pos = 0;
        }
        self.seekable
    }

    fn close(&mut self) {
        self.rows.clear();
        self.pos = 0;
    }
}
