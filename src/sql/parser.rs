//! # Statement preparation
//!
//! Turns an input line into a [`Statement`], enforcing the user-input
//! checks (token count, id sign and range, column lengths) before anything
//! reaches the storage engine.

use super::statement::Statement;
use crate::storage::row::{Row, COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE};
use std::fmt;

/// User-input rejection. The `Display` text is surfaced verbatim by the
/// REPL, which then continues with the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    /// Missing or malformed arguments.
    SyntaxError,
    /// A column exceeds its fixed slot.
    StringTooLong,
    /// The id parsed as a negative number.
    NegativeId,
    /// The line does not start with a known keyword.
    Unrecognized(String),
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrepareError::SyntaxError => write!(f, "Syntax error, could not parse statement."),
            PrepareError::StringTooLong => write!(f, "String is too long."),
            PrepareError::NegativeId => write!(f, "ID must be positive."),
            // Trailing space is part of the message.
            PrepareError::Unrecognized(line) => {
                write!(f, "Unrecognized keyword at start of '{}'. ", line)
            }
        }
    }
}

impl std::error::Error for PrepareError {}

/// Prepares one input line.
pub fn prepare(line: &str) -> Result<Statement, PrepareError> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("insert") => prepare_insert(tokens),
        Some("select") => {
            // Only the bare keyword is a select; anything trailing makes
            // the whole line unrecognized.
            if tokens.next().is_some() {
                return Err(PrepareError::Unrecognized(line.to_string()));
            }
            Ok(Statement::Select)
        }
        _ => Err(PrepareError::Unrecognized(line.to_string())),
    }
}

fn prepare_insert<'a, I>(mut tokens: I) -> Result<Statement, PrepareError>
where
    I: Iterator<Item = &'a str>,
{
    let id_string = tokens.next().ok_or(PrepareError::SyntaxError)?;
    let username = tokens.next().ok_or(PrepareError::SyntaxError)?;
    let email = tokens.next().ok_or(PrepareError::SyntaxError)?;
    // Anything after the third argument is ignored.

    let id: i64 = id_string
        .parse()
        .map_err(|_| PrepareError::SyntaxError)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::SyntaxError)?;

    if username.len() > COLUMN_USERNAME_SIZE {
        return Err(PrepareError::StringTooLong);
    }
    if email.len() > COLUMN_EMAIL_SIZE {
        return Err(PrepareError::StringTooLong);
    }

    Ok(Statement::Insert(Row::new(id, username, email)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_select() {
        assert_eq!(prepare("select"), Ok(Statement::Select));
    }

    #[test]
    fn test_select_with_trailing_tokens_is_unrecognized() {
        assert_eq!(
            prepare("select extra"),
            Err(PrepareError::Unrecognized("select extra".to_string()))
        );
    }

    #[test]
    fn test_prepare_insert() {
        let statement = prepare("insert 1 user1 person1@example.com").unwrap();
        match statement {
            Statement::Insert(row) => {
                assert_eq!(row.id, 1);
                assert_eq!(row.username(), "user1");
                assert_eq!(row.email(), "person1@example.com");
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_with_too_few_arguments() {
        assert_eq!(prepare("insert 1 user1"), Err(PrepareError::SyntaxError));
        assert_eq!(prepare("insert"), Err(PrepareError::SyntaxError));
    }

    #[test]
    fn test_insert_extra_arguments_are_ignored() {
        assert!(matches!(
            prepare("insert 1 user1 a@b extra tokens"),
            Ok(Statement::Insert(_))
        ));
    }

    #[test]
    fn test_negative_id() {
        assert_eq!(prepare("insert -1 u e"), Err(PrepareError::NegativeId));
    }

    #[test]
    fn test_non_numeric_id_is_a_syntax_error() {
        assert_eq!(prepare("insert abc u e"), Err(PrepareError::SyntaxError));
    }

    #[test]
    fn test_id_above_u32_range_is_a_syntax_error() {
        assert_eq!(
            prepare("insert 4294967296 u e"),
            Err(PrepareError::SyntaxError)
        );
        assert!(prepare("insert 4294967295 u e").is_ok());
    }

    #[test]
    fn test_oversize_columns() {
        let long_username = "u".repeat(COLUMN_USERNAME_SIZE + 1);
        assert_eq!(
            prepare(&format!("insert 1 {} a@b", long_username)),
            Err(PrepareError::StringTooLong)
        );

        let long_email = "e".repeat(COLUMN_EMAIL_SIZE + 1);
        assert_eq!(
            prepare(&format!("insert 1 u {}", long_email)),
            Err(PrepareError::StringTooLong)
        );

        let max_username = "u".repeat(COLUMN_USERNAME_SIZE);
        let max_email = "e".repeat(COLUMN_EMAIL_SIZE);
        assert!(prepare(&format!("insert 1 {} {}", max_username, max_email)).is_ok());
    }

    #[test]
    fn test_unrecognized_keyword() {
        let err = prepare("update 1").unwrap_err();
        assert_eq!(err, PrepareError::Unrecognized("update 1".to_string()));
        assert_eq!(
            err.to_string(),
            "Unrecognized keyword at start of 'update 1'. "
        );
    }

    #[test]
    fn test_empty_line_is_unrecognized() {
        assert_eq!(prepare(""), Err(PrepareError::Unrecognized(String::new())));
    }
}
