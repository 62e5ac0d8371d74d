//! Rows handed to callers and the change detection behind updatable queries.

pub mod diff;
pub mod row;

pub use diff::{changed_fields, field_differs};
pub use row::{Row, RowSnapshot};
