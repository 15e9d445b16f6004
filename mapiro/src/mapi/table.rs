//! Table result parsing.
//!
//! ```text
//! &1 0 2 2 2
//! % sys.t,	sys.t # table_name
//! % id,	name # name
//! % int,	varchar # type
//! % 1,	5 # length
//! [ 1,	"alice"	]
//! [ 2,	"bob"	]
//! ```
//!
//! The first line holds class, query id, row count and column count. Four
//! header lines follow, then one tuple line per row.
use super::{
    error::ProtocolError,
    message::{MSG_HEADER, ResultKind},
    tuple::parse_tuple,
};
use crate::row::{Column, TableResult};

const COMMENT: char = '#';
const FIELD_SEPARATOR: &str = ",\t";

/// Extract the field list of one header line, `% a,\tb # comment`.
///
/// Returns `None` when the line is not a header line.
pub fn header_fields(line: &str) -> Option<Vec<&str>> {
    let line = line.strip_prefix(MSG_HEADER)?;
    let line = line.strip_prefix(' ').unwrap_or(line);
    let end = line.find(COMMENT)?;
    let fields = line[..end].trim_end_matches(' ');

    if fields.is_empty() {
        return Some(vec![]);
    }

    Some(fields.split(FIELD_SEPARATOR).collect())
}

/// Parse a table producing message.
pub fn parse_table(kind: ResultKind, message: &str) -> Result<TableResult, ProtocolError> {
    let mut lines = message.split('\n');

    let mut head = lines.next().unwrap_or_default().split(' ').skip(1);
    let mut number = |reason| {
        head.next()
            .and_then(|e| e.parse::<i64>().ok())
            .ok_or(ProtocolError::header(0, reason))
    };
    let query_id = number("invalid query id")?;
    let row_count = number("invalid row count")?;
    let column_count = number("invalid column count")?;

    // negative count is how the server says "unknown"
    let row_count = usize::try_from(row_count).unwrap_or_default();
    let column_count = usize::try_from(column_count)
        .map_err(|_| ProtocolError::header(0, "negative column count"))?;

    let mut header = |line: usize| {
        lines
            .next()
            .and_then(header_fields)
            .ok_or(ProtocolError::header(line, "missing header line"))
            .and_then(|fields| match fields.len() == column_count {
                true => Ok(fields),
                false => Err(ProtocolError::column_count(column_count, fields.len())),
            })
    };
    let tables = header(1)?;
    let names = header(2)?;
    let types = header(3)?;
    let lengths = header(4)?;

    let columns = (0..column_count)
        .map(|index| {
            let type_len = lengths[index]
                .parse::<u32>()
                .map_err(|_| ProtocolError::header(4, "invalid type length"))?;
            Ok::<_, ProtocolError>(Column {
                table: tables[index].into(),
                name: names[index].into(),
                type_name: types[index].into(),
                type_len,
                index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rows = lines
        .filter(|line| !line.is_empty() && !line.starts_with(MSG_HEADER))
        .map(|line| parse_tuple(line, &types))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TableResult { kind, query_id, row_count, column_count, columns, rows })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value::*;

    #[test]
    fn header_line_forms() {
        assert_eq!(header_fields("%sys.foo,\tsys.bar#table").unwrap(), ["sys.foo", "sys.bar"]);
        assert_eq!(header_fields("% sys.foo,\tsys.bar # table_name").unwrap(), ["sys.foo", "sys.bar"]);
        assert_eq!(header_fields("% id # name").unwrap(), ["id"]);
        assert!(header_fields("% # name").unwrap().is_empty());
        assert!(header_fields("[ 1\t]").is_none());
        assert!(header_fields("% no comment").is_none());
    }

    #[test]
    fn parse_select() {
        let message = "&1 0 2 2 2\n\
            % sys.t,\tsys.t # table_name\n\
            % id,\tname # name\n\
            % int,\tvarchar # type\n\
            % 1,\t5 # length\n\
            [ 1,\t\"alice\"\t]\n\
            [ 2,\tNULL\t]\n";

        let table = parse_table(ResultKind::Table, message).unwrap();
        assert_eq!(table.query_id(), 0);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);

        let column = &table.columns()[1];
        assert_eq!(column.table(), "sys.t");
        assert_eq!(column.name(), "name");
        assert_eq!(column.type_name(), "varchar");
        assert_eq!(column.type_len(), 5);
        assert_eq!(column.index(), 1);

        assert_eq!(
            table.into_rows(),
            [vec![Int(1), Text("alice".into())], vec![Int(2), Null]],
        );
    }

    #[test]
    fn extra_header_lines_skipped() {
        let message = "&1 0 1 1 1\n\
            % .L1 # table_name\n\
            % single_value # name\n\
            % tinyint # type\n\
            % 2 # length\n\
            % 1 # typesizes\n\
            [ 42\t]\n";

        let table = parse_table(ResultKind::Table, message).unwrap();
        assert_eq!(table.into_rows(), [vec![Int(42)]]);
    }

    #[test]
    fn prepare_result() {
        let message = "&5 7 2 6 2\n\
            % .prepare,\t.prepare,\t.prepare,\t.prepare,\t.prepare,\t.prepare # table_name\n\
            % type,\tdigits,\tscale,\tschema,\ttable,\tcolumn # name\n\
            % varchar,\tint,\tint,\tstr,\tstr,\tstr # type\n\
            % 7,\t2,\t1,\t0,\t1,\t1 # length\n\
            [ \"int\",\t32,\t0,\tNULL,\tNULL,\tNULL\t]\n\
            [ \"varchar\",\t10,\t0,\tNULL,\tNULL,\tNULL\t]\n";

        let table = parse_table(ResultKind::Prepare, message).unwrap();
        assert_eq!(table.kind(), ResultKind::Prepare);
        assert_eq!(table.query_id(), 7);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn malformed_tables() {
        assert!(matches!(
            parse_table(ResultKind::Table, "&1 x 1 1 1\n"),
            Err(ProtocolError::Header { line: 0, .. }),
        ));
        assert!(matches!(
            parse_table(ResultKind::Table, "&1 0 1 1 1\n% t # table_name\n"),
            Err(ProtocolError::Header { line: 2, .. }),
        ));
        assert!(matches!(
            parse_table(ResultKind::Table, "&1 0 1 2 1\n% t # table_name\n"),
            Err(ProtocolError::ColumnCount { expect: 2, found: 1 }),
        ));

        let bad_int = "&1 0 1 1 1\n% t # table_name\n% a # name\n% int # type\n% 1 # length\n[ x\t]\n";
        assert!(matches!(
            parse_table(ResultKind::Table, bad_int),
            Err(ProtocolError::Value { .. }),
        ));
    }
}
