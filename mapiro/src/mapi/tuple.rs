//! Tuple line tokenizer.
//!
//! A tuple line looks like:
//!
//! ```text
//! [ 1,	"a,b",	NULL,	true	]
//! ```
//!
//! Values are separated by comma and tab, strings are double quoted with
//! backslash escapes. The first two characters and the trailing `]` are not
//! part of the values. An unquoted `#` ends the line.
use super::error::ProtocolError;
use crate::value::Value;

/// Length of the `[ ` line prefix.
const PREFIX_LEN: usize = 2;

const TERMINATOR: char = ']';
const COMMENT: char = '#';
const QUOTE: char = '"';
const ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between values.
    Separator,
    /// Inside an unquoted value, or after the closing quote of a quoted one.
    InToken,
    InQuotes,
    /// Right after a backslash inside quotes.
    Escaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Skip,
    Push,
    Unescape,
    /// Current token is complete.
    Close,
    /// Rest of the line is not data.
    Stop,
}

fn transition(state: State, c: char) -> (State, Action) {
    use {Action::*, State::*};
    match (state, c) {
        (Separator, ',' | '\t') => (Separator, Skip),
        (Separator | InToken, COMMENT) => (state, Stop),
        (Separator, QUOTE) => (InQuotes, Skip),
        (Separator, _) => (InToken, Push),

        (InToken, ',') => (Separator, Close),
        (InToken, '\t') => (InToken, Skip),
        (InToken, _) => (InToken, Push),

        (InQuotes, ESCAPE) => (Escaped, Skip),
        (InQuotes, QUOTE) => (InToken, Skip),
        (InQuotes, _) => (InQuotes, Push),

        (Escaped, _) => (InQuotes, Unescape),
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        c => c,
    }
}

/// Split one tuple line into values, coercing each with its column type.
///
/// The number of values must equal the number of `types`.
pub fn parse_tuple<T: AsRef<str>>(line: &str, types: &[T]) -> Result<Vec<Value>, ProtocolError> {
    let body = line.get(PREFIX_LEN..).unwrap_or_default();
    let body = body.strip_suffix(TERMINATOR).unwrap_or(body);

    let mut values = Vec::with_capacity(types.len());
    let mut token = String::new();
    let mut state = State::Separator;

    for c in body.chars() {
        let (next, action) = transition(state, c);
        match action {
            Action::Skip => {},
            Action::Push => token.push(c),
            Action::Unescape => token.push(unescape(c)),
            Action::Close => values.push(close(&mut token, values.len(), types)?),
            Action::Stop => break,
        }
        state = next;
    }

    match state {
        State::Separator => {},
        State::InToken => values.push(close(&mut token, values.len(), types)?),
        State::InQuotes | State::Escaped => {
            return Err(ProtocolError::UnterminatedQuote { column: values.len() });
        },
    }

    if values.len() != types.len() {
        return Err(ProtocolError::column_count(types.len(), values.len()));
    }

    Ok(values)
}

fn close<T: AsRef<str>>(token: &mut String, column: usize, types: &[T]) -> Result<Value, ProtocolError> {
    let Some(type_name) = types.get(column) else {
        return Err(ProtocolError::column_count(types.len(), column + 1));
    };
    let value = Value::coerce(token, type_name.as_ref())?;
    token.clear();
    Ok(value)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value::*;

    const TYPES: [&str; 4] = ["int", "varchar", "varchar", "boolean"];

    #[test]
    fn comment_terminated() {
        let values = parse_tuple("  1,\t\"a,b\",\tNULL,\ttrue#comment", &TYPES).unwrap();
        assert_eq!(values, [Int(1), Text("a,b".into()), Null, Bool(true)]);
    }

    #[test]
    fn bracket_terminated() {
        let values = parse_tuple("[ 1,\t\"a,b\",\tNULL,\ttrue\t]", &TYPES).unwrap();
        assert_eq!(values, [Int(1), Text("a,b".into()), Null, Bool(true)]);
    }

    #[test]
    fn escapes_inside_quotes() {
        let line = "[ \"say \\\"hi\\\"\\n\",\t\"back\\\\slash\",\t\"a#b\"\t]";
        let values = parse_tuple(line, &["clob", "varchar", "varchar"]).unwrap();
        assert_eq!(
            values,
            [Text("say \"hi\"\n".into()), Text("back\\slash".into()), Text("a#b".into())],
        );
    }

    #[test]
    fn unquoted_with_spaces() {
        let line = "[ 2020-01-01 10:00:00.000000,\t1.5\t]";
        let values = parse_tuple(line, &["timestamp", "double"]).unwrap();
        assert_eq!(values, [Text("2020-01-01 10:00:00.000000".into()), Float(1.5)]);
    }

    #[test]
    fn boundaries() {
        let none: [&str; 0] = [];
        assert!(parse_tuple("[ ]", &none).unwrap().is_empty());
        assert!(parse_tuple("", &none).unwrap().is_empty());
        assert_eq!(parse_tuple("[ 42\t]", &["int"]).unwrap(), [Int(42)]);
        assert_eq!(parse_tuple("[ NULL\t]", &["int"]).unwrap(), [Null]);
        assert_eq!(parse_tuple("[ \"\"\t]", &["varchar"]).unwrap(), [Null]);
    }

    #[test]
    fn arity_mismatch() {
        assert!(matches!(
            parse_tuple("[ ]", &["int"]),
            Err(ProtocolError::ColumnCount { expect: 1, found: 0 }),
        ));
        assert!(matches!(
            parse_tuple("[ 1,\t2\t]", &["int"]),
            Err(ProtocolError::ColumnCount { expect: 1, found: 2 }),
        ));
    }

    #[test]
    fn unterminated_quote() {
        assert!(matches!(
            parse_tuple("[ 1,\t\"abc\t]", &["int", "varchar"]),
            Err(ProtocolError::UnterminatedQuote { column: 1 }),
        ));
    }
}
