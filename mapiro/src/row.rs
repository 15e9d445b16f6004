//! Table result types.
//!
//! - [`TableResult`]
//! - [`Column`]
//! - [`Row`]
//!
//! - [`Index`]
//! - [`DecodeError`]
use std::{borrow::Cow, fmt};

use crate::{mapi::ResultKind, value::Value};

/// Column descriptor from the table header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub(crate) table: String,
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) type_len: u32,
    pub(crate) index: usize,
}

impl Column {
    /// Returns the table name, schema qualified.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type name, e.g. `int` or `varchar`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the declared type length.
    pub fn type_len(&self) -> u32 {
        self.type_len
    }

    /// Returns the ordinal position.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Decoded table result.
///
/// `columns().len()` always equals `column_count()`, and every row holds
/// exactly one value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct TableResult {
    pub(crate) kind: ResultKind,
    pub(crate) query_id: i64,
    pub(crate) row_count: usize,
    pub(crate) column_count: usize,
    pub(crate) columns: Vec<Column>,
    pub(crate) rows: Vec<Vec<Value>>,
}

impl TableResult {
    /// Returns the result class.
    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    /// Returns the query id, for a prepared statement this identifies the plan.
    pub fn query_id(&self) -> i64 {
        self.query_id
    }

    /// Returns the row count declared in the header.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the column count declared in the header.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of decoded rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no rows were decoded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a column descriptor.
    pub fn column<I: Index>(&self, idx: I) -> Result<&Column, DecodeError> {
        let i = idx.position(&self.columns)?;
        Ok(&self.columns[i])
    }

    /// Returns the `nth` row.
    pub fn row(&self, nth: usize) -> Option<Row<'_>> {
        self.rows.get(nth).map(|values| Row { columns: &self.columns, values })
    }

    /// Iterate rows in server order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row { columns: &self.columns, values })
    }

    /// Consume self into the raw row values.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}

/// A borrowed row of a [`TableResult`].
#[derive(Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [Column],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if row contains no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Get value by column position or name.
    pub fn try_get<I: Index>(&self, idx: I) -> Result<&'a Value, DecodeError> {
        let i = idx.position(self.columns)?;
        self.values.get(i).ok_or(DecodeError::IndexOutOfBounds(i))
    }
}

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        for (column, value) in self.columns.iter().zip(self.values) {
            dbg.entry(&column.name, value);
        }
        dbg.finish()
    }
}

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns column position.
    fn position(self, columns: &[Column]) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, columns: &[Column]) -> Result<usize, DecodeError> {
        match self < columns.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, columns: &[Column]) -> Result<usize, DecodeError> {
        columns
            .iter()
            .position(|e| e.name == self)
            .ok_or_else(|| DecodeError::ColumnNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

/// An error when looking up a value.
pub enum DecodeError {
    /// Column requested not found.
    ColumnNotFound(Cow<'static,str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to get value, ")?;
        match self {
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
        }
    }
}

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> TableResult {
        let column = |index: usize, name: &str, type_name: &str| Column {
            table: "sys.env".into(),
            name: name.into(),
            type_name: type_name.into(),
            type_len: 0,
            index,
        };
        TableResult {
            kind: ResultKind::Table,
            query_id: 0,
            row_count: 2,
            column_count: 2,
            columns: vec![column(0, "name", "varchar"), column(1, "value", "varchar")],
            rows: vec![
                vec![Value::Text("gdk_dbpath".into()), Value::Text("/tmp/demo".into())],
                vec![Value::Text("monet_version".into()), Value::Null],
            ],
        }
    }

    #[test]
    fn lookup_by_name_and_position() {
        let table = table();
        let row = table.row(0).unwrap();
        assert_eq!(row.try_get("value").unwrap().as_str(), Some("/tmp/demo"));
        assert_eq!(row.try_get(0usize).unwrap().as_str(), Some("gdk_dbpath"));
        assert!(table.row(1).unwrap().try_get("value").unwrap().is_null());
        assert_eq!(table.column("value").unwrap().index(), 1);
    }

    #[test]
    fn lookup_errors() {
        let table = table();
        let row = table.row(0).unwrap();
        assert!(matches!(row.try_get("nope"), Err(DecodeError::ColumnNotFound(_))));
        assert!(matches!(row.try_get(2usize), Err(DecodeError::IndexOutOfBounds(2))));
        assert!(table.row(2).is_none());
        assert_eq!(table.rows().len(), 2);
    }
}
