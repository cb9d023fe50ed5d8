//! Engine-level tests driving the storage layer through the library API.

use minisql::command::{execute, SqlResult};
use minisql::errors::Error;
use minisql::sql::Statement;
use minisql::storage::{Row, Table};
use tempfile::TempDir;

fn open_table(dir: &TempDir) -> Table {
    Table::open(&dir.path().join("test.db")).unwrap()
}

fn row(id: u32) -> Row {
    Row::new(
        id,
        &format!("user{}", id),
        &format!("person{}@example.com", id),
    )
}

fn insert(table: &mut Table, id: u32) -> Result<(), Error> {
    match execute(Statement::Insert(row(id)), table)? {
        SqlResult::Executed => Ok(()),
        SqlResult::Rows(_) => panic!("insert returned rows"),
    }
}

fn select(table: &mut Table) -> Vec<Row> {
    match execute(Statement::Select, table).unwrap() {
        SqlResult::Rows(rows) => rows,
        SqlResult::Executed => panic!("select returned no result set"),
    }
}

#[test]
fn test_insert_then_select_single_row() {
    let dir = TempDir::new().unwrap();
    let mut table = open_table(&dir);

    insert(&mut table, 1).unwrap();
    let rows = select(&mut table);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], row(1));
}

#[test]
fn test_select_on_empty_table_is_empty() {
    let dir = TempDir::new().unwrap();
    let mut table = open_table(&dir);
    assert!(select(&mut table).is_empty());
}

#[test]
fn test_tree_stays_single_leaf_until_overflow() {
    let dir = TempDir::new().unwrap();
    let mut table = open_table(&dir);

    for id in 1..=13 {
        insert(&mut table, id).unwrap();
    }
    assert_eq!(table.pager.num_pages(), 1);
    assert!(table.render_tree().unwrap().starts_with("- leaf (size 13)"));
}

#[test]
fn test_overflowing_the_root_leaf_promotes_an_internal_root() {
    let dir = TempDir::new().unwrap();
    let mut table = open_table(&dir);

    for id in 1..=14 {
        insert(&mut table, id).unwrap();
    }

    let mut expected = String::from("- internal (size 1)\n  - leaf (size 7)\n");
    for id in 1..=7 {
        expected.push_str(&format!("    - {}\n", id));
    }
    expected.push_str("  - key 7\n  - leaf (size 7)\n");
    for id in 8..=14 {
        expected.push_str(&format!("    - {}\n", id));
    }
    assert_eq!(table.render_tree().unwrap(), expected);
}

#[test]
fn test_select_returns_keys_in_ascending_order_after_splits() {
    let permutation = [14, 11, 9, 12, 7, 13, 3, 8, 5, 1, 4, 6, 10, 2];

    let dir = TempDir::new().unwrap();
    let mut table = open_table(&dir);
    for &id in &permutation {
        insert(&mut table, id).unwrap();
    }

    let rows = select(&mut table);
    let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=14).collect::<Vec<u32>>());

    // The two leaves partition the key space at the root separator.
    let mut expected = String::from("- internal (size 1)\n  - leaf (size 7)\n");
    for id in 1..=7 {
        expected.push_str(&format!("    - {}\n", id));
    }
    expected.push_str("  - key 7\n  - leaf (size 7)\n");
    for id in 8..=14 {
        expected.push_str(&format!("    - {}\n", id));
    }
    assert_eq!(table.render_tree().unwrap(), expected);
}

#[test]
fn test_duplicate_key_is_rejected_without_modification() {
    let dir = TempDir::new().unwrap();
    let mut table = open_table(&dir);

    insert(&mut table, 1).unwrap();
    let second = Row::new(1, "other", "other@example.com");
    match execute(Statement::Insert(second), &mut table) {
        Err(Error::DuplicateKey) => (),
        other => panic!("expected duplicate key, got {:?}", other.map(|_| ())),
    }

    let rows = select(&mut table);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], row(1));
}

#[test]
fn test_rows_persist_across_close_and_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    let mut table = Table::open(&path).unwrap();
    for id in [3, 1, 2] {
        insert(&mut table, id).unwrap();
    }
    let before: Vec<Row> = select(&mut table);
    table.close().unwrap();
    drop(table);

    let mut table = Table::open(&path).unwrap();
    let after = select(&mut table);
    assert_eq!(after, before);
    assert_eq!(
        after.iter().map(|r| r.id).collect::<Vec<u32>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn test_multi_leaf_tree_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    let mut table = Table::open(&path).unwrap();
    for id in 1..=21 {
        insert(&mut table, id).unwrap();
    }
    table.close().unwrap();
    drop(table);

    let mut table = Table::open(&path).unwrap();
    let ids: Vec<u32> = select(&mut table).iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=21).collect::<Vec<u32>>());
}

#[test]
fn test_unsaved_inserts_are_lost_without_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    let mut table = Table::open(&path).unwrap();
    insert(&mut table, 1).unwrap();
    drop(table); // no close, nothing flushed

    let mut table = Table::open(&path).unwrap();
    assert!(select(&mut table).is_empty());
}

#[test]
fn test_insert_requiring_internal_split_reports_table_full() {
    let dir = TempDir::new().unwrap();
    let mut table = open_table(&dir);

    // Sequential inserts split the rightmost leaf every 7 rows past the
    // first 13; the fourth split would need the root to gain a fifth
    // child.
    for id in 1..=34 {
        insert(&mut table, id).unwrap();
    }
    match insert(&mut table, 35) {
        Err(Error::TableFull) => (),
        other => panic!("expected table full, got {:?}", other),
    }

    // The refused insert left the table untouched.
    let ids: Vec<u32> = select(&mut table).iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=34).collect::<Vec<u32>>());
}
