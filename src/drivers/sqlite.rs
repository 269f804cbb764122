use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::drivers::BufferedCursor;
use crate::error::{DbError, Result};
use crate::profile::NormalizedProfile;
use crate::traits::{Attribute, BoundArg, Cursor, DatabaseDriver, Statement, StatementOutcome};
use crate::types::SqlValue;

const MEMORY_PATH: &str = ":memory:";

fn error_code(err: &rusqlite::Error) -> Option<i64> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(i64::from(failure.extended_code)),
        rusqlite::Error::SqlInputError { error, .. } => Some(i64::from(error.extended_code)),
        _ => None,
    }
}

fn query_error(sql: &str, err: rusqlite::Error) -> DbError {
    DbError::Query {
        sql: sql.to_string(),
        code: error_code(&err),
        message: err.to_string(),
    }
}

fn connection_error(err: rusqlite::Error) -> DbError {
    DbError::Connection {
        code: error_code(&err),
        message: err.to_string(),
    }
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Int(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
    }
}

fn from_sqlite(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}

/// Runs `sql` with `args` and reads the whole result.
fn run(conn: &Connection, sql: &str, args: &[BoundArg]) -> Result<StatementOutcome> {
    let mut stmt = conn.prepare_cached(sql).map_err(|e| query_error(sql, e))?;
    let params = rusqlite::params_from_iter(args.iter().map(|a| to_sqlite(&a.value)));

    if stmt.column_count() == 0 {
        let affected = stmt.execute(params).map_err(|e| query_error(sql, e))?;
        return Ok(StatementOutcome::Affected(affected as u64));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params).map_err(|e| query_error(sql, e))?;
    let mut buffered = Vec::new();
    while let Some(row) = rows.next().map_err(|e| query_error(sql, e))? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value: Value = row.get(i).map_err(|e| query_error(sql, e))?;
            values.push(from_sqlite(value));
        }
        buffered.push(values);
    }
    Ok(StatementOutcome::Rows(Box::new(BufferedCursor::new(
        columns, buffered,
    ))))
}

/// SQLite driver over `rusqlite`.
///
/// The database path is the DSN body on the PDO path and the `database`
/// field otherwise; `:memory:` opens a private in-memory database.
#[derive(Default)]
pub struct SqliteDriver {
    conn: Option<Arc<Mutex<Connection>>>,
    timeout: Option<u64>,
    attributes: HashMap<String, SqlValue>,
}

impl SqliteDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn conn(&self) -> Result<&Arc<Mutex<Connection>>> {
        self.conn
            .as_ref()
            .ok_or_else(|| DbError::State("sqlite connection is not open".to_string()))
    }

    fn batch(&self, sql: &str) -> Result<()> {
        debug!(sql, "sqlite batch");
        self.conn()?
            .lock()
            .execute_batch(sql)
            .map_err(|e| query_error(sql, e))
    }
}

impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&mut self, profile: &NormalizedProfile) -> Result<()> {
        let path = if profile.use_pdo {
            profile.dsn_body()
        } else {
            profile.database.as_deref()
        };
        let path = path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| DbError::connection("no sqlite database path in profile"))?;

        info!(path, "Opening SQLite database");
        let conn = if path == MEMORY_PATH {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(connection_error)?;

        if let Some(secs) = profile.timeout {
            conn.busy_timeout(Duration::from_secs(secs))
                .map_err(connection_error)?;
        }
        if profile
            .extras
            .get("foreign_keys")
            .is_some_and(|v| v.as_bool())
        {
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(connection_error)?;
        }

        self.timeout = profile.timeout;
        self.conn = Some(Arc::new(Mutex::new(conn)));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        match Arc::try_unwrap(conn) {
            Ok(conn) => conn
                .into_inner()
                .close()
                .map_err(|(_, e)| connection_error(e)),
            // A statement is mid-execution; the handle closes when it is dropped.
            Err(_) => Ok(()),
        }
    }

    fn query(&mut self, sql: &str) -> Result<Box<dyn Cursor>> {
        debug!(sql, "sqlite query");
        match run(&self.conn()?.lock(), sql, &[])? {
            StatementOutcome::Rows(cursor) => Ok(cursor),
            StatementOutcome::Affected(_) => {
                Ok(Box::new(BufferedCursor::new(Vec::new(), Vec::new())))
            }
        }
    }

    fn exec(&mut self, sql: &str) -> Result<u64> {
        debug!(sql, "sqlite exec");
        let conn = self.conn()?.lock();
        conn.execute(sql, [])
            .map(|n| n as u64)
            .map_err(|e| query_error(sql, e))
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        let conn = self.conn()?;
        // Compile once up front so syntax errors surface at prepare time.
        conn.lock()
            .prepare_cached(sql)
            .map_err(|e| query_error(sql, e))?;
        Ok(Box::new(SqliteStatement {
            conn: Arc::downgrade(conn),
            sql: sql.to_string(),
        }))
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK")
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        // SQLite leaves autocommit mode on BEGIN and returns on COMMIT/ROLLBACK.
        debug!(enabled, "sqlite autocommit follows the transaction state");
        Ok(())
    }

    fn last_insert_id(&mut self, _sequence: Option<&str>) -> Result<String> {
        Ok(self.conn()?.lock().last_insert_rowid().to_string())
    }

    fn attribute(&self, attribute: &Attribute) -> Result<Option<SqlValue>> {
        let value = match attribute {
            Attribute::ClientVersion | Attribute::ServerVersion => {
                Some(SqlValue::from(rusqlite::version()))
            }
            Attribute::ServerInfo => None,
            Attribute::Autocommit => Some(SqlValue::Bool(self.conn()?.lock().is_autocommit())),
            Attribute::Timeout => self.timeout.map(|t| SqlValue::Int(t as i64)),
            Attribute::DriverName => Some(SqlValue::from(self.name())),
            Attribute::Custom(name) => self.attributes.get(name).cloned(),
        };
        Ok(value)
    }

    fn set_attribute(&mut self, attribute: &Attribute, value: SqlValue) -> Result<()> {
        match attribute {
            Attribute::Timeout => {
                let secs = value
                    .as_i64()
                    .and_then(|v| u64::try_from(v).ok())
                    .ok_or_else(|| DbError::State(format!("invalid timeout: {value:?}")))?;
                self.conn()?
                    .lock()
                    .busy_timeout(Duration::from_secs(secs))
                    .map_err(|e| query_error("PRAGMA busy_timeout", e))?;
                self.timeout = Some(secs);
                Ok(())
            }
            Attribute::Custom(name) => {
                self.attributes.insert(name.clone(), value);
                Ok(())
            }
            other => Err(DbError::State(format!(
                "attribute `{other}` is read-only for sqlite"
            ))),
        }
    }
}

/// A statement that re-resolves its cached compiled form on every execution.
struct SqliteStatement {
    conn: Weak<Mutex<Connection>>,
    sql: String,
}

impl Statement for SqliteStatement {
    fn execute(&mut self, args: &[BoundArg]) -> Result<StatementOutcome> {
        let conn = self
            .conn
            .upgrade()
            .ok_or_else(|| DbError::State("sqlite connection has been closed".to_string()))?;
        debug!(sql = %self.sql, params = args.len(), "sqlite execute");
        let guard = conn.lock();
        run(&guard, &self.sql, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ConnectionProfile, ParameterNormalizer};

    fn memory_profile() -> NormalizedProfile {
        let raw: ConnectionProfile = [("driver", "sqlite"), ("database", ":memory:")]
            .into_iter()
            .collect();
        ParameterNormalizer::new().normalize(&raw).unwrap()
    }

    fn connected() -> SqliteDriver {
        let mut driver = SqliteDriver::new();
        driver.connect(&memory_profile()).unwrap();
        driver
            .exec("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, data BLOB)")
            .unwrap();
        driver
    }

    #[test]
    fn test_exec_and_query() {
        let mut driver = connected();
        assert_eq!(
            driver.exec("INSERT INTO t (name) VALUES ('a'), ('b')").unwrap(),
            2
        );
        assert_eq!(driver.last_insert_id(None).unwrap(), "2");

        let mut cursor = driver.query("SELECT id, name FROM t ORDER BY id").unwrap();
        assert_eq!(cursor.columns(), ["id", "name"]);
        assert_eq!(cursor.native_row_count(), Some(2));
        assert_eq!(
            cursor.next_row().unwrap(),
            Some(vec![SqlValue::Int(1), SqlValue::Text("a".into())])
        );
    }

    #[test]
    fn test_prepared_statement_values() {
        let mut driver = connected();
        let mut insert = driver
            .prepare("INSERT INTO t (name, data) VALUES (?, ?)")
            .unwrap();
        let args = vec![
            BoundArg {
                name: "p1".into(),
                value: SqlValue::Null,
                param_type: crate::types::ParamType::Null,
            },
            BoundArg {
                name: "p2".into(),
                value: SqlValue::Blob(vec![0, 1, 2]),
                param_type: crate::types::ParamType::Lob,
            },
        ];
        assert!(matches!(
            insert.execute(&args).unwrap(),
            StatementOutcome::Affected(1)
        ));

        let mut cursor = driver.query("SELECT name, data FROM t").unwrap();
        assert_eq!(
            cursor.next_row().unwrap(),
            Some(vec![SqlValue::Null, SqlValue::Blob(vec![0, 1, 2])])
        );
    }

    #[test]
    fn test_prepare_rejects_bad_sql() {
        let mut driver = connected();
        let err = driver.prepare("SELEC nonsense").err().unwrap();
        assert!(matches!(err, DbError::Query { code: Some(1), .. }));
    }

    #[test]
    fn test_statement_after_disconnect() {
        let mut driver = connected();
        let mut stmt = driver.prepare("SELECT 1").unwrap();
        driver.disconnect().unwrap();
        assert!(matches!(stmt.execute(&[]), Err(DbError::State(_))));
    }

    #[test]
    fn test_attributes() {
        let mut driver = connected();
        assert_eq!(
            driver.attribute(&Attribute::DriverName).unwrap(),
            Some(SqlValue::from("sqlite"))
        );
        assert_eq!(
            driver.attribute(&Attribute::Autocommit).unwrap(),
            Some(SqlValue::Bool(true))
        );
        driver
            .set_attribute(&Attribute::Timeout, SqlValue::Int(5))
            .unwrap();
        assert_eq!(
            driver.attribute(&Attribute::Timeout).unwrap(),
            Some(SqlValue::Int(5))
        );
        assert!(driver
            .set_attribute(&Attribute::ServerVersion, SqlValue::from("x"))
            .is_err());
    }
}
