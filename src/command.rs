//! Statement execution against a table.

use crate::errors::Error;
use crate::sql::Statement;
use crate::storage::pager::lock_page;
use crate::storage::{btree, Row, Table};
use tracing::debug;

/// Outcome of a successfully executed statement.
pub enum SqlResult {
    Executed,
    Rows(Vec<Row>),
}

pub fn execute(statement: Statement, table: &mut Table) -> Result<SqlResult, Error> {
    match statement {
        Statement::Insert(row) => execute_insert(row, table),
        Statement::Select => execute_select(table),
    }
}

fn execute_insert(row: Row, table: &mut Table) -> Result<SqlResult, Error> {
    let key_to_insert = row.id;
    debug!(key = key_to_insert, "Executing insert");

    let mut cursor = table.find(key_to_insert)?;

    // The cursor lands on the cell holding the key when it exists.
    {
        let page = cursor.table.pager.get_page(cursor.page_num)?;
        let node = lock_page(&page)?;
        if cursor.cell_num < node.leaf_num_cells() {
            let key_at_index = node.leaf_key(cursor.cell_num as usize)?;
            if key_at_index == key_to_insert {
                return Err(Error::DuplicateKey);
            }
        }
    }

    btree::leaf_node_insert(&mut cursor, key_to_insert, &row)?;
    Ok(SqlResult::Executed)
}

fn execute_select(table: &mut Table) -> Result<SqlResult, Error> {
    let mut rows = Vec::new();
    let mut cursor = table.start()?;
    while !cursor.end_of_table {
        rows.push(cursor.row()?);
        cursor.advance()?;
    }
    debug!(num_rows = rows.len(), "Executed select");
    Ok(SqlResult::Rows(rows))
}
