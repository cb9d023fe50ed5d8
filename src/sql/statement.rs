use crate::storage::Row;

/// A prepared statement, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Insert one row; the row has already passed length and sign checks.
    Insert(Row),
    /// Full-table scan in key order.
    Select,
}
