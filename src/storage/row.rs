//! # Row layout
//!
//! A row is a fixed-width record: a `u32` primary key followed by two
//! null-terminated text columns stored in fixed slots.
//!
//! | column     | size | offset |
//! |------------|------|--------|
//! | id         |   4  |    0   |
//! | username   |  33  |    4   |
//! | email      | 256  |   37   |
//! | total      | 293  |        |
//!
//! Each text slot reserves one byte for the terminator; bytes past the
//! terminator are undefined. The id is little-endian. The codec does not
//! validate column lengths, that is the statement preparer's job.

use crate::errors::Error;
use std::fmt;

/// Maximum username length in bytes, excluding the terminator.
pub const COLUMN_USERNAME_SIZE: usize = 32;
/// Maximum email length in bytes, excluding the terminator.
pub const COLUMN_EMAIL_SIZE: usize = 255;

const ID_SIZE: usize = std::mem::size_of::<u32>();
const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE + 1;
const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE + 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Serialized width of a row.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// Copy a string into a fixed null-padded slot, never exceeding the slot.
fn str_to_fixed_bytes<const N: usize>(input: &str) -> [u8; N] {
    let mut buffer = [0u8; N];
    let bytes = input.as_bytes();
    let len = bytes.len().min(N - 1);
    buffer[..len].copy_from_slice(&bytes[..len]);
    buffer
}

/// Decode a null-terminated slot back into text.
fn fixed_bytes_to_str(slot: &[u8]) -> std::borrow::Cow<'_, str> {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    String::from_utf8_lossy(&slot[..end])
}

/// A single table record.
#[derive(Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    username: [u8; USERNAME_SIZE],
    email: [u8; EMAIL_SIZE],
}

impl Row {
    /// Builds a row from validated column values. Oversize input is
    /// truncated at the slot boundary; the statement preparer rejects it
    /// before it gets here.
    pub fn new(id: u32, username: &str, email: &str) -> Self {
        Row {
            id,
            username: str_to_fixed_bytes(username),
            email: str_to_fixed_bytes(email),
        }
    }

    pub fn username(&self) -> std::borrow::Cow<'_, str> {
        fixed_bytes_to_str(&self.username)
    }

    pub fn email(&self) -> std::borrow::Cow<'_, str> {
        fixed_bytes_to_str(&self.email)
    }

    /// Writes the row into a `ROW_SIZE`-byte region at fixed offsets.
    pub fn serialize(&self, destination: &mut [u8]) -> Result<(), Error> {
        if destination.len() != ROW_SIZE {
            return Err(err!(
                Storage,
                "Row destination size mismatch (expected={}, got={})",
                ROW_SIZE,
                destination.len()
            ));
        }
        destination[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        destination[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]
            .copy_from_slice(&self.username);
        destination[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
        Ok(())
    }

    /// Reads a row back out of a `ROW_SIZE`-byte region.
    pub fn deserialize(source: &[u8]) -> Result<Row, Error> {
        if source.len() != ROW_SIZE {
            return Err(err!(
                Storage,
                "Row source size mismatch (expected={}, got={})",
                ROW_SIZE,
                source.len()
            ));
        }
        let id_bytes: [u8; ID_SIZE] = source[ID_OFFSET..ID_OFFSET + ID_SIZE]
            .try_into()
            .map_err(|e| err!(Storage, "Failed to decode row id: {:?}", e))?;

        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&source[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&source[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);

        Ok(Row {
            id: u32::from_le_bytes(id_bytes),
            username,
            email,
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username(), self.email())
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("id", &self.id)
            .field("username", &self.username())
            .field("email", &self.email())
            .finish()
    }
}
