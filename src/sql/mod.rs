pub mod parser;
pub mod statement;

pub use parser::{prepare, PrepareError};
pub use statement::Statement;
