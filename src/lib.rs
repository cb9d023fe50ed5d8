#[macro_use]
pub mod errors;
pub mod command;
pub mod repl;
pub mod sql;
pub mod storage;
