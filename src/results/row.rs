use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::SqlValue;

/// A fetched row: column names mapped to values, in result-set column order.
///
/// Names come from the cursor's column metadata, not from the SQL text. Assigning to a name
/// that already exists replaces the value in place; a new name is appended at the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    column_names: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create an empty row with room for `capacity` columns
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            column_names: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Build a row from parallel name/value lists. Duplicate names keep their first position
    /// and the last value.
    #[must_use]
    pub fn from_columns(column_names: &[String], values: Vec<SqlValue>) -> Self {
        let mut row = Row::with_capacity(column_names.len());
        for (name, value) in column_names.iter().zip(values) {
            row.set(name.clone(), value);
        }
        row
    }

    fn position(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.position(column_name).map(|idx| &self.values[idx])
    }

    /// Mutable access to a column's value
    pub fn get_mut(&mut self, column_name: &str) -> Option<&mut SqlValue> {
        self.position(column_name).map(|idx| &mut self.values[idx])
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Assign a column, returning the previous value if the column existed.
    pub fn set(&mut self, column_name: impl Into<String>, value: impl Into<SqlValue>) -> Option<SqlValue> {
        let column_name = column_name.into();
        let value = value.into();
        match self.position(&column_name) {
            Some(idx) => Some(std::mem::replace(&mut self.values[idx], value)),
            None => {
                self.column_names.push(column_name);
                self.values.push(value);
                None
            }
        }
    }

    /// Remove a column, returning its value.
    pub fn remove(&mut self, column_name: &str) -> Option<SqlValue> {
        let idx = self.position(column_name)?;
        self.column_names.remove(idx);
        Some(self.values.remove(idx))
    }

    #[must_use]
    pub fn contains(&self, column_name: &str) -> bool {
        self.position(column_name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Iterate `(column, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Freeze the current values as the baseline for change detection.
    #[must_use]
    pub fn snapshot(&self) -> RowSnapshot {
        RowSnapshot { row: self.clone() }
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::default();
        for (name, value) in iter {
            row.set(name, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Immutable copy of a row's values taken right after fetch, before any updater runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSnapshot {
    row: Row,
}

impl RowSnapshot {
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.row.get(column_name)
    }

    #[must_use]
    pub fn contains(&self, column_name: &str) -> bool {
        self.row.contains(column_name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }
}
