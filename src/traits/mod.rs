mod cursor;
mod driver;
mod statement;

pub use cursor::Cursor;
pub use driver::{Attribute, DatabaseDriver};
pub use statement::{BoundArg, Statement, StatementOutcome};
