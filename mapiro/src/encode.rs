//! Statement parameter encoding.
//!
//! Parameters are rendered as SQL literals into an `EXEC` command:
//!
//! ```text
//! EXEC 7(42, 'O\'Brien', NULL)
//! ```
use std::fmt::Write;

/// A value that can be bound to a prepared statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Param {
    /// Append the SQL literal of this parameter.
    pub fn render(&self, buf: &mut String) {
        match self {
            Self::Null => buf.push_str("NULL"),
            Self::Bool(true) => buf.push_str("true"),
            Self::Bool(false) => buf.push_str("false"),
            Self::Int(i) => buf.push_str(itoa::Buffer::new().format(*i)),
            Self::Float(f) if !f.is_finite() => buf.push_str("NULL"),
            Self::Float(f) => {
                let _ = write!(buf, "{f}");
            },
            Self::Text(text) => quote(text, buf),
        }
    }
}

/// Single quote `text`, escaping every single quote that is not already escaped.
///
/// A quote is escaped when preceded by an odd run of backslashes. An odd
/// trailing run gets one more backslash so the closing quote stays literal.
fn quote(text: &str, buf: &mut String) {
    buf.reserve(text.len() + 2);
    buf.push('\'');
    let mut slashes = 0usize;
    for c in text.chars() {
        match c {
            '\\' => slashes += 1,
            '\'' if slashes % 2 == 0 => {
                buf.push('\\');
                slashes = 0;
            },
            _ => slashes = 0,
        }
        buf.push(c);
    }
    if slashes % 2 == 1 {
        buf.push('\\');
    }
    buf.push('\'');
}

/// Build `EXEC <id>(<params>)` command text.
pub(crate) fn exec_command(query_id: i64, params: &[Param]) -> String {
    let mut sql = String::from("EXEC ");
    sql.push_str(itoa::Buffer::new().format(query_id));
    sql.push('(');
    for (i, param) in params.iter().enumerate() {
        if i != 0 {
            sql.push_str(", ");
        }
        param.render(&mut sql);
    }
    sql.push(')');
    sql
}

/// Value that can be encoded to be bound to a statement parameter.
pub trait Encode {
    fn encode(self) -> Param;
}

impl Encode for Param {
    fn encode(self) -> Param {
        self
    }
}

impl Encode for bool {
    fn encode(self) -> Param {
        Param::Bool(self)
    }
}

macro_rules! encode {
    (<$variant:ident as $inner:ty> $($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(self) -> Param {
                    Param::$variant(<$inner>::from(self))
                }
            }
        )*
    };
}

encode!(<Int as i64> i8, i16, i32, i64, u8, u16, u32);
encode!(<Float as f64> f32, f64);
encode!(<Text as String> &str, String, &String);

impl<T: Encode> Encode for Option<T> {
    fn encode(self) -> Param {
        match self {
            Some(value) => value.encode(),
            None => Param::Null,
        }
    }
}
