use std::fmt;

use crate::error::Result;
use crate::traits::Cursor;
use crate::types::{ParamType, SqlValue};

/// One argument of a prepared statement, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArg {
    pub name: String,
    /// Value already coerced to `param_type`.
    pub value: SqlValue,
    pub param_type: ParamType,
}

/// What executing a prepared statement produced.
pub enum StatementOutcome {
    Rows(Box<dyn Cursor>),
    Affected(u64),
}

impl fmt::Debug for StatementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementOutcome::Rows(cursor) => {
                f.debug_tuple("Rows").field(&cursor.columns()).finish()
            }
            StatementOutcome::Affected(n) => f.debug_tuple("Affected").field(n).finish(),
        }
    }
}

/// A statement prepared by the driver.
pub trait Statement: Send {
    /// Execute with one argument per placeholder occurrence, in order.
    /// Drivers with named placeholders bind each distinct name once.
    fn execute(&mut self, args: &[BoundArg]) -> Result<StatementOutcome>;

    /// Release native resources. Must not fail, even if the connection is gone.
    fn close(&mut self) {}
}
