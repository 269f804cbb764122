mod fetch;
mod row;
mod sql_value;

pub use fetch::{AsAny, FetchMode, Fetched, Modifier, RowFactory, RowTarget, SharedTarget};
pub use row::{RawQueryResult, Row};
pub use sql_value::{ParamType, SqlValue};
