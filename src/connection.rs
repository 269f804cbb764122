use std::fmt;

use tracing::{debug, info, warn};

use crate::dialect::Dialect;
use crate::drivers;
use crate::error::{DbError, Result};
use crate::profile::{ConnectionProfile, NormalizedProfile, ParameterNormalizer};
use crate::result_set::ResultSet;
use crate::sql::{paginate, Paginated, QueryTranslator};
use crate::traits::{Attribute, DatabaseDriver};
use crate::types::SqlValue;

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected yet. The first operation connects.
    Disconnected,
    Connecting,
    Connected,
    Closing,
    /// Closed by the caller. Terminal.
    Closed,
    /// Connecting failed or the driver reported a fatal error. Terminal.
    Broken,
}

/// Main entry point for dbaccess.
/// Holds one driver handle and runs statements through it.
pub struct Connection {
    profile: NormalizedProfile,
    dialect: Dialect,
    driver: Box<dyn DatabaseDriver>,
    state: ConnectionState,
    handle_open: bool,
    in_transaction: bool,
}

impl Connection {
    /// Create a connection for a normalized profile, using the compiled
    /// driver that serves it. Connects lazily on first use.
    ///
    /// # Errors
    /// [`DbError::Connection`] if no compiled driver serves the profile.
    pub fn new(profile: NormalizedProfile) -> Result<Self> {
        let driver = drivers::open_driver(&profile)?;
        Ok(Self::with_driver(profile, driver))
    }

    /// Create a connection and connect immediately.
    ///
    /// # Example
    /// ```
    /// use dbaccess::{Connection, ConnectionProfile, ParameterNormalizer};
    ///
    /// let raw: ConnectionProfile = [("driver", "sqlite"), ("database", ":memory:")]
    ///     .into_iter()
    ///     .collect();
    /// let profile = ParameterNormalizer::new().normalize(&raw)?;
    /// let mut conn = Connection::open(profile)?;
    /// assert_eq!(conn.exec("CREATE TABLE t (id INTEGER)")?, 0);
    /// # Ok::<(), dbaccess::DbError>(())
    /// ```
    pub fn open(profile: NormalizedProfile) -> Result<Self> {
        let mut conn = Self::new(profile)?;
        conn.connect()?;
        Ok(conn)
    }

    /// Normalize a raw profile with the built-in driver table, then create the connection.
    pub fn from_profile(raw: &ConnectionProfile) -> Result<Self> {
        let profile = ParameterNormalizer::default().normalize(raw)?;
        Self::new(profile)
    }

    /// Create a connection with a custom driver.
    /// Useful for testing or for vendor drivers that live outside this crate.
    pub fn with_driver(profile: NormalizedProfile, driver: Box<dyn DatabaseDriver>) -> Self {
        let dialect = Dialect::for_profile(&profile);
        Self {
            profile,
            dialect,
            driver,
            state: ConnectionState::Disconnected,
            handle_open: false,
            in_transaction: false,
        }
    }

    pub fn profile(&self) -> &NormalizedProfile {
        &self.profile
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Open the driver handle. Does nothing if already connected.
    ///
    /// # Errors
    /// [`DbError::Connection`] if the driver cannot connect, or if an
    /// earlier attempt failed; [`DbError::State`] after `close`.
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Disconnected => {}
            ConnectionState::Broken => {
                return Err(DbError::connection("connection is unusable after a failure"))
            }
            ConnectionState::Closed => {
                return Err(DbError::State("connection is closed".to_string()))
            }
            ConnectionState::Connecting | ConnectionState::Closing => {
                return Err(DbError::State(format!(
                    "connection is {:?}",
                    self.state
                )))
            }
        }

        self.state = ConnectionState::Connecting;
        info!(
            driver = %self.profile.driver,
            profile = self.profile.name.as_deref().unwrap_or(""),
            "Connecting"
        );
        match self.driver.connect(&self.profile) {
            Ok(()) => {
                self.handle_open = true;
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = self.driver.disconnect() {
                    debug!(error = %cleanup, "cleanup after failed connect");
                }
                self.state = ConnectionState::Broken;
                warn!(driver = %self.profile.driver, error = %e, "Connect failed");
                Err(e)
            }
        }
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            Ok(())
        } else {
            self.connect()
        }
    }

    /// Marks the connection broken when the driver reports a fatal error.
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                warn!(error = %e, "Connection lost");
                self.state = ConnectionState::Broken;
            }
        }
        result
    }

    /// Run a statement returning rows.
    pub fn query(&mut self, sql: &str) -> Result<ResultSet> {
        self.ensure_connected()?;
        debug!(sql, "query");
        let result = self.driver.query(sql);
        let cursor = self.track(result)?;
        Ok(ResultSet::from_cursor(cursor))
    }

    /// Run a statement and return the number of affected rows.
    pub fn exec(&mut self, sql: &str) -> Result<u64> {
        self.ensure_connected()?;
        debug!(sql, "exec");
        let result = self.driver.exec(sql);
        self.track(result)
    }

    /// Prepare a statement written with `?` or `:name` placeholders.
    pub fn prepare(&mut self, sql: &str) -> Result<ResultSet> {
        self.ensure_connected()?;
        let template = QueryTranslator::for_dialect(&self.dialect).translate(sql)?;
        debug!(sql = template.sql(), params = template.param_count(), "prepare");
        let result = self.driver.prepare(template.sql());
        let statement = self.track(result)?;
        Ok(ResultSet::prepared(statement, template))
    }

    /// Run `sql` restricted to `count` rows starting at row `offset`.
    ///
    /// A zero `count` on a database whose pagination syntax cannot express
    /// it yields an empty result set without running anything. Trailing
    /// comments and `;` are dropped before the window is applied.
    ///
    /// On databases paged with `ROWNUM` the query is wrapped, and every row
    /// carries an extra `page_rnum` column holding its 1-based position.
    pub fn limit_query(&mut self, sql: &str, offset: u64, count: u64) -> Result<ResultSet> {
        self.ensure_connected()?;
        match paginate(sql, offset, count, &self.dialect)? {
            Paginated::Sql(paged) => self.query(&paged),
            Paginated::Empty => {
                debug!(sql, "zero-row page, not sent");
                Ok(ResultSet::empty())
            }
        }
    }

    /// Start a transaction, switching autocommit off.
    ///
    /// Transactions do not nest; calling this inside an open transaction is
    /// passed to the driver as is.
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.ensure_connected()?;
        debug!("begin transaction");
        let result = self.driver.set_autocommit(false);
        self.track(result)?;
        let result = self.driver.begin_transaction();
        if let Err(e) = self.track(result) {
            if self.state == ConnectionState::Connected {
                if let Err(restore) = self.driver.set_autocommit(true) {
                    warn!(error = %restore, "Failed to restore autocommit");
                }
            }
            return Err(e);
        }
        self.in_transaction = true;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_connected()?;
        debug!("commit");
        let result = self.driver.commit();
        self.finish_transaction(result)
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_connected()?;
        debug!("rollback");
        let result = self.driver.rollback();
        self.finish_transaction(result)
    }

    fn finish_transaction(&mut self, result: Result<()>) -> Result<()> {
        self.track(result)?;
        self.in_transaction = false;
        let result = self.driver.set_autocommit(true);
        self.track(result)
    }

    /// The identifier generated by the last insert.
    ///
    /// # Errors
    /// [`DbError::State`] if the database generates identifiers from
    /// sequences and `sequence` is `None`.
    pub fn last_insert_id(&mut self, sequence: Option<&str>) -> Result<String> {
        if self.dialect.sequences && sequence.is_none() {
            warn!(
                dbtype = %self.profile.dbtype,
                "last_insert_id needs a sequence name for this database"
            );
            return Err(DbError::State(format!(
                "a sequence name is required to read the last insert id on {}",
                self.profile.dbtype
            )));
        }
        self.ensure_connected()?;
        let result = self.driver.last_insert_id(sequence);
        self.track(result)
    }

    /// Highest value of `field` in `table` (prefixed), or 0 for an empty table.
    pub fn last_id_in_table(&mut self, field: &str, table: &str) -> Result<i64> {
        let sql = format!(
            "SELECT MAX({}) AS id FROM {}",
            field,
            self.prefix_table(table)
        );
        let mut rs = self.query(&sql)?;
        let id = rs
            .fetch()?
            .and_then(|fetched| fetched.into_row())
            .and_then(|row| row.get_index(0).and_then(SqlValue::as_i64))
            .unwrap_or(0);
        rs.free();
        Ok(id)
    }

    /// `name` with the profile's table prefix.
    pub fn prefix_table(&self, name: &str) -> String {
        format!("{}{}", self.profile.table_prefix, name)
    }

    pub fn has_table_prefix(&self) -> bool {
        !self.profile.table_prefix.is_empty()
    }

    /// Render a value as a SQL literal for this database.
    pub fn quote(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            SqlValue::Text(s) => self.dialect.quote_literal(s),
            SqlValue::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Quote an identifier for this database.
    pub fn enclose_name(&self, name: &str) -> String {
        self.dialect.enclose_name(name)
    }

    pub fn attribute(&mut self, attribute: &Attribute) -> Result<Option<SqlValue>> {
        self.ensure_connected()?;
        let result = self.driver.attribute(attribute);
        self.track(result)
    }

    pub fn set_attribute(&mut self, attribute: &Attribute, value: impl Into<SqlValue>) -> Result<()> {
        self.ensure_connected()?;
        let result = self.driver.set_attribute(attribute, value.into());
        self.track(result)
    }

    /// Release the driver handle. Idempotent; failures are logged, not returned.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closing;
        if self.handle_open {
            if let Err(e) = self.driver.disconnect() {
                warn!(error = %e, "Error while disconnecting");
            }
            self.handle_open = false;
            info!(driver = %self.profile.driver, "Connection closed");
        }
        self.in_transaction = false;
        self.state = ConnectionState::Closed;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.profile.driver)
            .field("state", &self.state)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}
