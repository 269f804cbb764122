use indexmap::IndexMap;

use crate::types::SqlValue;

/// Driver-agnostic raw result from a database query.
#[derive(Debug, Clone, Default)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<SqlValue>>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// A single fetched row.
/// Values are kept in column order and accessed by column name or position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: IndexMap<String, SqlValue>,
}

impl Row {
    /// Creates a new Row from column names and values.
    /// Later duplicates of a column name overwrite earlier ones.
    pub fn new(columns: &[String], values: Vec<SqlValue>) -> Self {
        let values = columns
            .iter()
            .zip(values)
            .map(|(col, val)| (col.clone(), val))
            .collect();
        Self { values }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    /// Gets a value by column position.
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get_index(index).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut SqlValue> {
        self.values.get_mut(column)
    }

    /// Sets a column value, appending the column if it is new.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Returns all column names in this row, in order.
    pub fn columns(&self) -> Vec<&str> {
        self.values.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> IndexMap<String, SqlValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_get() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let values = vec![SqlValue::Int(1), SqlValue::from("John")];
        let row = Row::new(&columns, values);

        assert_eq!(row.get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(row.get("name"), Some(&SqlValue::from("John")));
        assert_eq!(row.get_index(1), Some(&SqlValue::from("John")));
        assert!(row.get("missing").is_none());
        assert_eq!(row.columns(), vec!["id", "name"]);
    }

    #[test]
    fn test_row_set_appends() {
        let mut row = Row::new(&["id".to_string()], vec![SqlValue::Int(1)]);
        row.set("label", "one");
        row.set("id", 2);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("id"), Some(&SqlValue::Int(2)));
        assert_eq!(row.columns(), vec!["id", "label"]);
    }
}
