//! dbaccess - A uniform, driver-agnostic database access layer
//!
//! Raw connection profiles are normalized into one canonical shape, then a
//! [`Connection`] runs queries, prepared statements and paginated queries
//! through a [`DatabaseDriver`], rewriting placeholders and `LIMIT` clauses
//! into the syntax each database expects.
//!
//! # Example
//! ```
//! use dbaccess::{Connection, ConnectionProfile, ParamType};
//!
//! let raw: ConnectionProfile = [("driver", "pdo_sqlite"), ("database", ":memory:")]
//!     .into_iter()
//!     .collect();
//! let mut conn = Connection::from_profile(&raw)?;
//! conn.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let mut insert = conn.prepare("INSERT INTO users (name) VALUES (:name)")?;
//! insert.bind_value("name", "John", ParamType::Str)?;
//! insert.execute()?;
//!
//! let mut rs = conn.limit_query("SELECT id, name FROM users", 0, 10)?;
//! let row = rs.fetch()?.and_then(|f| f.into_row()).unwrap();
//! assert_eq!(row.get("name").and_then(|v| v.as_str()), Some("John"));
//! # Ok::<(), dbaccess::DbError>(())
//! ```

pub mod dialect;
pub mod drivers;
pub mod error;
pub mod profile;
pub mod sql;
pub mod traits;
pub mod types;

mod connection;
mod result_set;

// Re-export main types for convenient access
pub use connection::{Connection, ConnectionState};
pub use dialect::Dialect;
pub use error::{DbError, Result};
pub use profile::{ConnectionProfile, NormalizedProfile, ParameterNormalizer};
pub use result_set::{BoundVar, CursorState, Execution, ResultSet, Rows};
pub use traits::{Attribute, DatabaseDriver};
pub use types::{FetchMode, Fetched, ParamType, Row, SqlValue};
