use std::fmt;

/// Crate-wide error type.
///
/// `Io` and `Storage` are fatal: the REPL propagates them to `main`, which
/// prints the diagnostic and exits with a failure status. `DuplicateKey` and
/// `TableFull` are tagged execution outcomes surfaced to the user, after
/// which the REPL continues.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Storage(String),
    DuplicateKey,
    TableFull,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{}", e),
            Error::Storage(msg) => write!(f, "{}", msg),
            Error::DuplicateKey => write!(f, "Duplicate key."),
            Error::TableFull => write!(f, "Table full."),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// Build an [`Error`] variant from a format string.
#[macro_export]
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        $crate::errors::Error::$variant(format!($($arg)*))
    };
}
