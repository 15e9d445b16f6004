//! Message classification.
//!
//! The first character of a reassembled message tells what kind it is.
use super::error::DatabaseError;

/// Leading character of an error message.
pub const MSG_ERROR: char = '!';
/// Leading character of a query result.
pub const MSG_QUERY: char = '&';
/// Leading character of a table header line.
pub const MSG_HEADER: char = '%';
/// Leading character of a redirect, another challenge follows.
pub const MSG_REDIRECT: char = '^';

/// Table producing result class, the character after [`MSG_QUERY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// `&1`, result of a query.
    Table,
    /// `&5`, result of a `PREPARE`, one row per parameter and result column.
    Prepare,
}

impl ResultKind {
    pub fn from_code(code: u8) -> Option<ResultKind> {
        match code {
            b'1' => Some(Self::Table),
            b'5' => Some(Self::Prepare),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Self::Table => '1',
            Self::Prepare => '5',
        }
    }
}

/// Kind of a reassembled message.
#[derive(Debug)]
pub enum Message {
    /// Empty message, server is ready.
    Prompt,
    Redirect,
    Error(DatabaseError),
    Table(ResultKind),
    /// Anything else, only tells the command succeeded.
    Other,
}

impl Message {
    pub fn classify(message: &str) -> Message {
        let bytes = message.as_bytes();
        match bytes.first().map(|&b| b as char) {
            None => Self::Prompt,
            Some(MSG_REDIRECT) => Self::Redirect,
            Some(MSG_ERROR) => Self::Error(DatabaseError::parse(message)),
            Some(MSG_QUERY) => match bytes.get(1).copied().and_then(ResultKind::from_code) {
                Some(kind) => Self::Table(kind),
                None => Self::Other,
            },
            Some(_) => Self::Other,
        }
    }
}
