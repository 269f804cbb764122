use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{DbError, Result};
use crate::sql::PreparedTemplate;
use crate::traits::{Cursor, Statement, StatementOutcome};
use crate::types::{FetchMode, Fetched, Modifier, ParamType, Row, SqlValue};

/// Position of a result set's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// A prepared statement that has not been executed yet.
    Unopened,
    Open,
    Exhausted,
}

/// A variable bound by reference: its value is read when the statement executes.
#[derive(Debug, Clone, Default)]
pub struct BoundVar(Arc<Mutex<SqlValue>>);

impl BoundVar {
    pub fn new(value: impl Into<SqlValue>) -> Self {
        Self(Arc::new(Mutex::new(value.into())))
    }

    pub fn set(&self, value: impl Into<SqlValue>) {
        *self.0.lock() = value.into();
    }

    pub fn get(&self) -> SqlValue {
        self.0.lock().clone()
    }
}

/// What [`ResultSet::execute`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// The statement returned rows, available through `fetch`.
    Rows,
    Affected(u64),
}

#[derive(Debug, Clone)]
enum Binding {
    Value(SqlValue),
    Var(BoundVar),
}

impl Binding {
    fn resolve(&self) -> SqlValue {
        match self {
            Binding::Value(value) => value.clone(),
            Binding::Var(var) => var.get(),
        }
    }
}

fn parameter_name(name: &str) -> String {
    name.strip_prefix(':').unwrap_or(name).to_string()
}

/// Rows returned by a query, or a prepared statement awaiting execution.
///
/// Rows are pulled from the driver cursor on demand. When the row count has
/// to be computed by reading ahead, the rows read are kept in a replay
/// buffer and handed out by later fetches, so no row is ever lost.
pub struct ResultSet {
    cursor: Option<Box<dyn Cursor>>,
    statement: Option<Box<dyn Statement>>,
    template: Option<PreparedTemplate>,
    bindings: IndexMap<String, (Binding, ParamType)>,
    columns: Vec<String>,
    replay: VecDeque<Vec<SqlValue>>,
    delivered: u64,
    affected: Option<u64>,
    state: CursorState,
    freed: bool,
    fetch_mode: FetchMode,
    modifiers: Vec<Modifier>,
}

impl ResultSet {
    fn blank(state: CursorState) -> Self {
        Self {
            cursor: None,
            statement: None,
            template: None,
            bindings: IndexMap::new(),
            columns: Vec::new(),
            replay: VecDeque::new(),
            delivered: 0,
            affected: None,
            state,
            freed: false,
            fetch_mode: FetchMode::default(),
            modifiers: Vec::new(),
        }
    }

    /// Wraps the cursor of a plain query.
    pub fn from_cursor(cursor: Box<dyn Cursor>) -> Self {
        let mut rs = Self::blank(CursorState::Open);
        rs.columns = cursor.columns().to_vec();
        rs.cursor = Some(cursor);
        rs
    }

    /// A prepared statement, unopened until [`ResultSet::execute`] is called.
    pub fn prepared(statement: Box<dyn Statement>, template: PreparedTemplate) -> Self {
        let mut rs = Self::blank(CursorState::Unopened);
        rs.statement = Some(statement);
        rs.template = Some(template);
        rs
    }

    /// A result set that yields no rows and never touched the database.
    pub fn empty() -> Self {
        Self::blank(CursorState::Exhausted)
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    pub fn is_prepared(&self) -> bool {
        self.template.is_some()
    }

    pub fn template(&self) -> Option<&PreparedTemplate> {
        self.template.as_ref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn fetch_mode(&self) -> &FetchMode {
        &self.fetch_mode
    }

    pub fn set_fetch_mode(&mut self, mode: FetchMode) {
        self.fetch_mode = mode;
    }

    /// Registers a hook applied to every row before it is returned or assigned.
    pub fn add_modifier<F>(&mut self, modifier: F)
    where
        F: Fn(&mut Row) + Send + 'static,
    {
        self.modifiers.push(Box::new(modifier));
    }

    fn ensure_live(&self) -> Result<()> {
        if self.freed {
            return Err(DbError::State("result set has been freed".to_string()));
        }
        Ok(())
    }

    fn next_values(&mut self) -> Result<Option<Vec<SqlValue>>> {
        if let Some(values) = self.replay.pop_front() {
            return Ok(Some(values));
        }
        match self.cursor.as_mut() {
            Some(cursor) => cursor.next_row(),
            None => Ok(None),
        }
    }

    /// Advances one row and shapes it according to the fetch mode.
    /// Returns `None` once the rows are exhausted.
    pub fn fetch(&mut self) -> Result<Option<Fetched>> {
        self.ensure_live()?;
        if self.state == CursorState::Unopened {
            return Err(DbError::State(
                "prepared statement has not been executed".to_string(),
            ));
        }

        let Some(values) = self.next_values()? else {
            self.state = CursorState::Exhausted;
            return Ok(None);
        };
        self.delivered += 1;

        let mut row = Row::new(&self.columns, values);
        for modifier in &self.modifiers {
            modifier(&mut row);
        }

        let fetched = match &self.fetch_mode {
            FetchMode::Structured => Fetched::Row(row),
            FetchMode::IntoExisting(target) => {
                {
                    let mut target = target.lock();
                    for (column, value) in row.into_values() {
                        target.assign(&column, value);
                    }
                }
                Fetched::Into(Arc::clone(target))
            }
            FetchMode::AsClass(factory) => {
                let mut object = factory.instantiate();
                for (column, value) in row.into_values() {
                    object.assign(&column, value);
                }
                Fetched::Object(object)
            }
        };
        Ok(Some(fetched))
    }

    /// Fetches every remaining row.
    pub fn fetch_all(&mut self) -> Result<Vec<Fetched>> {
        let mut all = Vec::new();
        while let Some(fetched) = self.fetch()? {
            all.push(fetched);
        }
        Ok(all)
    }

    /// Iterator over the remaining rows.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows { rs: self }
    }

    /// Total number of rows in the result, or the affected row count of an
    /// executed write statement.
    ///
    /// Without a native count the remaining rows are read into the replay
    /// buffer; subsequent fetches still return them.
    pub fn row_count(&mut self) -> Result<u64> {
        self.ensure_live()?;
        if let Some(affected) = self.affected {
            return Ok(affected);
        }
        if self.state == CursorState::Unopened {
            return Err(DbError::State(
                "prepared statement has not been executed".to_string(),
            ));
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(0);
        };
        if let Some(count) = cursor.native_row_count() {
            return Ok(count);
        }
        while let Some(values) = cursor.next_row()? {
            self.replay.push_back(values);
        }
        Ok(self.delivered + self.replay.len() as u64)
    }

    /// Moves back to the first row. Returns false when the driver cannot
    /// seek backward and rows have already been handed out.
    pub fn rewind(&mut self) -> Result<bool> {
        self.ensure_live()?;
        if self.delivered == 0 {
            return Ok(true);
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(false);
        };
        if !cursor.seek_start() {
            debug!("driver cursor cannot seek backward");
            return Ok(false);
        }
        self.replay.clear();
        self.delivered = 0;
        self.state = CursorState::Open;
        Ok(true)
    }

    fn ensure_prepared(&self) -> Result<()> {
        self.ensure_live()?;
        if self.template.is_none() {
            return Err(DbError::State(
                "parameters can only be bound to a prepared statement".to_string(),
            ));
        }
        Ok(())
    }

    /// Binds a variable by reference; its current value is used at execute time.
    pub fn bind_param(&mut self, name: &str, var: &BoundVar, param_type: ParamType) -> Result<()> {
        self.ensure_prepared()?;
        self.bindings.insert(
            parameter_name(name),
            (Binding::Var(var.clone()), param_type),
        );
        Ok(())
    }

    /// Binds a value, copied now.
    pub fn bind_value(
        &mut self,
        name: &str,
        value: impl Into<SqlValue>,
        param_type: ParamType,
    ) -> Result<()> {
        self.ensure_prepared()?;
        self.bindings.insert(
            parameter_name(name),
            (Binding::Value(value.into()), param_type),
        );
        Ok(())
    }

    /// Binding result columns to variables is not supported by any driver.
    pub fn bind_column(&mut self, column: &str, _var: &BoundVar) -> Result<()> {
        Err(DbError::State(format!(
            "binding column `{column}` is not supported"
        )))
    }

    /// Executes the prepared statement with the parameters bound so far.
    pub fn execute(&mut self) -> Result<Execution> {
        self.ensure_prepared()?;
        let values: IndexMap<String, (SqlValue, ParamType)> = self
            .bindings
            .iter()
            .map(|(name, (binding, ty))| (name.clone(), (binding.resolve(), *ty)))
            .collect();
        self.run(values)
    }

    /// Executes with the given parameters, replacing any bound earlier.
    /// Each value's type tag follows from the value itself.
    pub fn execute_with<I, K, V>(&mut self, params: I) -> Result<Execution>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<SqlValue>,
    {
        self.ensure_prepared()?;
        self.bindings.clear();
        for (name, value) in params {
            let value = value.into();
            let ty = value.param_type();
            self.bindings
                .insert(parameter_name(name.as_ref()), (Binding::Value(value), ty));
        }
        self.execute()
    }

    fn release_cursor(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
        self.replay.clear();
        self.delivered = 0;
        self.affected = None;
    }

    fn run(&mut self, values: IndexMap<String, (SqlValue, ParamType)>) -> Result<Execution> {
        let (Some(template), Some(_)) = (self.template.as_ref(), self.statement.as_ref()) else {
            return Err(DbError::State("statement is not prepared".to_string()));
        };
        let args = template.arguments(&values)?;
        debug!(sql = template.sql(), params = args.len(), "executing prepared statement");

        self.release_cursor();
        self.state = CursorState::Unopened;

        let outcome = match self.statement.as_mut() {
            Some(statement) => statement.execute(&args)?,
            None => return Err(DbError::State("statement is not prepared".to_string())),
        };
        match outcome {
            StatementOutcome::Rows(cursor) => {
                self.columns = cursor.columns().to_vec();
                self.cursor = Some(cursor);
                self.state = CursorState::Open;
                Ok(Execution::Rows)
            }
            StatementOutcome::Affected(n) => {
                self.columns.clear();
                self.affected = Some(n);
                self.state = CursorState::Exhausted;
                Ok(Execution::Affected(n))
            }
        }
    }

    /// Releases the cursor and statement. Safe to call more than once, and
    /// after the owning connection has been closed.
    pub fn free(&mut self) {
        if self.freed {
            return;
        }
        self.release_cursor();
        if let Some(mut statement) = self.statement.take() {
            statement.close();
        }
        self.bindings.clear();
        self.freed = true;
        self.state = CursorState::Exhausted;
        debug!("result set freed");
    }
}

impl Drop for ResultSet {
    fn drop(&mut self) {
        if !self.replay.is_empty() && !self.freed {
            debug!(
                buffered = self.replay.len(),
                "result set dropped with unread buffered rows"
            );
        }
        self.free();
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("state", &self.state)
            .field("freed", &self.freed)
            .field("columns", &self.columns)
            .field("template", &self.template)
            .field("buffered", &self.replay.len())
            .field("delivered", &self.delivered)
            .field("fetch_mode", &self.fetch_mode)
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`ResultSet::rows`].
pub struct Rows<'a> {
    rs: &'a mut ResultSet,
}

impl Iterator for Rows<'_> {
    type Item = Result<Fetched>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rs.fetch().transpose()
    }
}
