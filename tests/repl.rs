//! End-to-end tests: spawn the binary, feed scripted input, assert the
//! exact stdout surface.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn run_script(dir: &TempDir, db: Option<&Path>, lines: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_minisql"));
    if let Some(db) = db {
        command.arg(db);
    }
    let mut child = command
        .arg("--log-file")
        .arg(dir.path().join("test.log"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    for line in lines {
        writeln!(stdin, "{}", line).unwrap();
    }
    drop(stdin);

    child.wait_with_output().unwrap()
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_select_on_fresh_database_prints_no_rows() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let output = run_script(&dir, Some(&db), &["select", ".exit"]);

    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "db > Executed.\ndb > ");
}

#[test]
fn test_insert_then_select_prints_the_row() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let output = run_script(
        &dir,
        Some(&db),
        &["insert 1 user1 person1@example.com", "select", ".exit"],
    );

    assert_eq!(
        stdout_of(&output),
        "db > Executed.\ndb > (1, user1, person1@example.com)\nExecuted.\ndb > "
    );
}

#[test]
fn test_duplicate_key_is_reported_and_ignored() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let output = run_script(
        &dir,
        Some(&db),
        &["insert 1 a a@a", "insert 1 b b@b", "select", ".exit"],
    );

    assert_eq!(
        stdout_of(&output),
        "db > Executed.\ndb > Error: Duplicate key.\ndb > (1, a, a@a)\nExecuted.\ndb > "
    );
}

#[test]
fn test_oversize_username_is_rejected() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let long_username = "a".repeat(33);
    let insert = format!("insert 1 {} a@a", long_username);
    let output = run_script(&dir, Some(&db), &[&insert, "select", ".exit"]);

    assert_eq!(
        stdout_of(&output),
        "db > String is too long.\ndb > Executed.\ndb > "
    );
}

#[test]
fn test_negative_id_is_rejected() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let output = run_script(&dir, Some(&db), &["insert -1 u e", ".exit"]);

    assert_eq!(stdout_of(&output), "db > ID must be positive.\ndb > ");
}

#[test]
fn test_rows_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");

    let output = run_script(
        &dir,
        Some(&db),
        &[
            "insert 1 user1 person1@example.com",
            "insert 2 user2 person2@example.com",
            "insert 3 user3 person3@example.com",
            ".exit",
        ],
    );
    assert!(output.status.success());

    let output = run_script(&dir, Some(&db), &["select", ".exit"]);
    assert_eq!(
        stdout_of(&output),
        "db > (1, user1, person1@example.com)\n\
         (2, user2, person2@example.com)\n\
         (3, user3, person3@example.com)\n\
         Executed.\ndb > "
    );
}

#[test]
fn test_out_of_order_inserts_scan_in_key_order_after_split() {
    let permutation = [14, 11, 9, 12, 7, 13, 3, 8, 5, 1, 4, 6, 10, 2];

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let inserts: Vec<String> = permutation
        .iter()
        .map(|id| format!("insert {} user{} person{}@example.com", id, id, id))
        .collect();
    let mut lines: Vec<&str> = inserts.iter().map(String::as_str).collect();
    lines.push("select");
    lines.push(".btree");
    lines.push(".exit");
    let output = run_script(&dir, Some(&db), &lines);

    let mut expected = "db > Executed.\n".repeat(permutation.len());
    expected.push_str("db > ");
    for id in 1..=14 {
        expected.push_str(&format!("({}, user{}, person{}@example.com)\n", id, id, id));
    }
    expected.push_str("Executed.\n");
    expected.push_str("db > Tree:\n- internal (size 1)\n  - leaf (size 7)\n");
    for id in 1..=7 {
        expected.push_str(&format!("    - {}\n", id));
    }
    expected.push_str("  - key 7\n  - leaf (size 7)\n");
    for id in 8..=14 {
        expected.push_str(&format!("    - {}\n", id));
    }
    expected.push_str("db > ");

    assert_eq!(stdout_of(&output), expected);
}

#[test]
fn test_constants_output() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let output = run_script(&dir, Some(&db), &[".constants", ".exit"]);

    assert_eq!(
        stdout_of(&output),
        "db > Constants:\n\
         ROW_SIZE: 293\n\
         COMMON_NODE_HEADER_SIZE: 6\n\
         LEAF_NODE_HEADER_SIZE: 14\n\
         LEAF_NODE_CELL_SIZE: 297\n\
         LEAF_NODE_SPACE_FOR_CELLS: 4082\n\
         LEAF_NODE_MAX_CELLS: 13\n\
         db > "
    );
}

#[test]
fn test_unrecognized_meta_command() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let output = run_script(&dir, Some(&db), &[".foo", ".exit"]);

    assert_eq!(
        stdout_of(&output),
        "db > Unrecognized command '.foo'\ndb > "
    );
}

#[test]
fn test_unrecognized_keyword() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    let output = run_script(&dir, Some(&db), &["update 1", ".exit"]);

    assert_eq!(
        stdout_of(&output),
        "db > Unrecognized keyword at start of 'update 1'. \ndb > "
    );
}

#[test]
fn test_missing_filename_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_script(&dir, None, &[]);

    assert!(!output.status.success());
    assert_eq!(stdout_of(&output), "Must supply a database filename.\n");
}

#[test]
fn test_torn_file_is_reported_as_corrupt() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("test.db");
    std::fs::write(&db, vec![0u8; 100]).unwrap();
    let output = run_script(&dir, Some(&db), &[]);

    assert!(!output.status.success());
    assert_eq!(
        stdout_of(&output),
        "DB file is not a whole number of pages. Corrupt file.\n"
    );
}
