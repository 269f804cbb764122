use crate::error::Result;
use crate::types::SqlValue;

/// A native result cursor, moving forward one row at a time.
pub trait Cursor: Send {
    /// Column names in order.
    fn columns(&self) -> &[String];

    /// The next row, or `None` once the cursor is exhausted.
    fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>>;

    /// Total row count, if the driver knows it without reading the rows.
    fn native_row_count(&self) -> Option<u64> {
        None
    }

    /// Move back before the first row. Returns false when the driver cannot seek backward.
    fn seek_start(&mut self) -> bool {
        false
    }

    /// Release native resources. Must not fail, even if the connection is gone.
    fn close(&mut self) {}
}
