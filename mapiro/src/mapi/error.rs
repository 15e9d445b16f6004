//! Protocol error types.
use std::{fmt, str::Utf8Error};

/// An error when translating bytes or text from the server.
pub enum ProtocolError {
    /// Reassembled message is not valid utf8.
    Utf8(Utf8Error),
    /// Table header line is missing or malformed.
    Header {
        line: usize,
        reason: &'static str,
    },
    /// Number of fields does not match the declared column count.
    ColumnCount {
        expect: usize,
        found: usize,
    },
    /// Quoted value is not closed before end of line.
    UnterminatedQuote {
        column: usize,
    },
    /// Value text cannot be coerced into its column type.
    Value {
        type_name: String,
        value: String,
    },
    /// Server reply is not the kind the request expects.
    Unexpected {
        expect: &'static str,
    },
}

impl ProtocolError {
    pub(crate) fn header(line: usize, reason: &'static str) -> ProtocolError {
        Self::Header { line, reason }
    }

    pub(crate) fn column_count(expect: usize, found: usize) -> ProtocolError {
        Self::ColumnCount { expect, found }
    }

    pub(crate) fn value(type_name: &str, value: &str) -> ProtocolError {
        Self::Value { type_name: type_name.into(), value: value.into() }
    }

    pub(crate) fn unexpected(expect: &'static str) -> ProtocolError {
        Self::Unexpected { expect }
    }
}

impl From<Utf8Error> for ProtocolError {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8(value)
    }
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8(e) => write!(f, "non utf8 message: {e}"),
            Self::Header { line, reason } => write!(f, "invalid table header at line {line}: {reason}"),
            Self::ColumnCount { expect, found } => {
                write!(f, "expected {expect} columns, found {found}")
            },
            Self::UnterminatedQuote { column } => {
                write!(f, "unterminated quoted value at column {column}")
            },
            Self::Value { type_name, value } => {
                write!(f, "cannot read {value:?} as `{type_name}`")
            },
            Self::Unexpected { expect } => write!(f, "unexpected response, expected {expect}"),
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Length of the SQLSTATE code some errors are prefixed with.
const CODE_LEN: usize = 5;

/// An error reported by the server for a single command.
///
/// Server errors come in as `!<message>\n`, where message is optionally
/// prefixed with an SQLSTATE code, e.g. `!42000!syntax error`.
#[derive(Clone)]
pub struct DatabaseError {
    message: String,
    code: bool,
}

impl DatabaseError {
    pub(crate) fn parse(message: &str) -> DatabaseError {
        let message = message.strip_prefix('!').unwrap_or(message);
        let message = message.strip_suffix('\n').unwrap_or(message);
        let code = message.len() > CODE_LEN
            && message.as_bytes()[CODE_LEN] == b'!'
            && message.as_bytes()[..CODE_LEN].iter().all(u8::is_ascii_alphanumeric);
        Self { message: message.into(), code }
    }

    /// Returns the error text with the marker and terminator stripped.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the SQLSTATE code, if the server sent one.
    pub fn code(&self) -> Option<&str> {
        self.code.then(|| &self.message[..CODE_LEN])
    }

    /// Returns the error text without the SQLSTATE code.
    pub fn detail(&self) -> &str {
        match self.code {
            true => &self.message[CODE_LEN + 1..],
            false => &self.message,
        }
    }
}

impl std::error::Error for DatabaseError { }

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseError")
            .field("code", &self.code())
            .field("detail", &self.detail())
            .finish()
    }
}

/// Server rejected the login.
#[derive(Clone)]
pub struct AuthError {
    message: String,
}

impl AuthError {
    pub(crate) fn new(error: DatabaseError) -> AuthError {
        Self { message: error.message }
    }

    /// Returns the text the server rejected the login with.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for AuthError { }

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication failed: {}", self.message)
    }
}

impl fmt::Debug for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::DatabaseError;

    #[test]
    fn error_with_code() {
        let err = DatabaseError::parse("!42000!syntax error, unexpected IDENT\n");
        assert_eq!(err.message(), "42000!syntax error, unexpected IDENT");
        assert_eq!(err.code(), Some("42000"));
        assert_eq!(err.detail(), "syntax error, unexpected IDENT");
    }

    #[test]
    fn error_without_code() {
        let err = DatabaseError::parse("!InvalidCredentialsException:checkCredentials:invalid credentials\n");
        assert_eq!(err.code(), None);
        assert_eq!(err.detail(), "InvalidCredentialsException:checkCredentials:invalid credentials");

        let err = DatabaseError::parse("!oops");
        assert_eq!(err.message(), "oops");
    }
}
