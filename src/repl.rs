//! # REPL
//!
//! Line-oriented front-end. Each line is either a meta-command (starting
//! with `.`) or a statement. Everything the user sees goes to stdout;
//! diagnostics go to the tracing log.

use crate::command::{self, SqlResult};
use crate::errors::Error;
use crate::sql;
use crate::storage::node::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::storage::row::ROW_SIZE;
use crate::storage::Table;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

enum MetaResult {
    Exit,
    Handled,
    Unrecognized,
}

/// Runs the REPL until `.exit` or a fatal storage error.
pub fn start(filename: &Path) -> Result<(), Error> {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, path = %filename.display(), "Starting REPL session");

    let mut table = Table::open(filename)?;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print_prompt()?;

        line.clear();
        let bytes_read = input.read_line(&mut line)?;
        if bytes_read == 0 {
            return Err(err!(Storage, "Error reading input"));
        }
        let line = line.trim_end_matches(|c| c == '\n' || c == '\r');

        if line.starts_with('.') {
            match do_meta_command(line, &mut table)? {
                MetaResult::Exit => {
                    table.close()?;
                    info!(session_id = %session_id, "Closed REPL session");
                    return Ok(());
                }
                MetaResult::Handled => continue,
                MetaResult::Unrecognized => {
                    println!("Unrecognized command '{}'", line);
                    continue;
                }
            }
        }

        match sql::prepare(line) {
            Ok(statement) => match command::execute(statement, &mut table) {
                Ok(SqlResult::Executed) => println!("Executed."),
                Ok(SqlResult::Rows(rows)) => {
                    for row in &rows {
                        println!("{}", row);
                    }
                    println!("Executed.");
                }
                Err(Error::DuplicateKey) => println!("Error: Duplicate key."),
                Err(Error::TableFull) => println!("Error: Table full."),
                Err(e) => return Err(e),
            },
            Err(e) => println!("{}", e),
        }
    }
}

fn print_prompt() -> io::Result<()> {
    print!("db > ");
    io::stdout().flush()
}

fn do_meta_command(line: &str, table: &mut Table) -> Result<MetaResult, Error> {
    match line {
        ".exit" => Ok(MetaResult::Exit),
        ".btree" => {
            println!("Tree:");
            print!("{}", table.render_tree()?);
            Ok(MetaResult::Handled)
        }
        ".constants" => {
            println!("Constants:");
            print_constants();
            Ok(MetaResult::Handled)
        }
        _ => Ok(MetaResult::Unrecognized),
    }
}

fn print_constants() {
    println!("ROW_SIZE: {}", ROW_SIZE);
    println!("COMMON_NODE_HEADER_SIZE: {}", COMMON_NODE_HEADER_SIZE);
    println!("LEAF_NODE_HEADER_SIZE: {}", LEAF_NODE_HEADER_SIZE);
    println!("LEAF_NODE_CELL_SIZE: {}", LEAF_NODE_CELL_SIZE);
    println!("LEAF_NODE_SPACE_FOR_CELLS: {}", LEAF_NODE_SPACE_FOR_CELLS);
    println!("LEAF_NODE_MAX_CELLS: {}", LEAF_NODE_MAX_CELLS);
}
