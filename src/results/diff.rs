use crate::types::SqlValue;

use super::row::{Row, RowSnapshot};

/// Decide whether `value` under `column_name` must be written back.
///
/// Blank names never count. A column missing from the snapshot always counts. Otherwise
/// NULL-aware value equality decides: two NULLs are equal, NULL against non-NULL is not.
#[must_use]
pub fn field_differs(column_name: &str, value: &SqlValue, snapshot: &RowSnapshot) -> bool {
    if column_name.trim().is_empty() {
        return false;
    }
    let Some(original) = snapshot.get(column_name) else {
        return true;
    };
    match (value.is_null(), original.is_null()) {
        (true, true) => false,
        (true, false) | (false, true) => true,
        (false, false) => value != original,
    }
}

/// Columns of `row` whose values differ from `snapshot`, in row order.
#[must_use]
pub fn changed_fields<'r>(row: &'r Row, snapshot: &RowSnapshot) -> Vec<(&'r str, &'r SqlValue)> {
    row.iter()
        .filter(|(name, value)| field_differs(name, value, snapshot))
        .collect()
}
