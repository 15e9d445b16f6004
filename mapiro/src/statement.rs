//! Prepared statement.
use std::{borrow::Cow, fmt};

use crate::{
    Connection,
    encode::{Encode, Param, exec_command},
    response::{Response, ResponseFuture},
    row::TableResult,
};

const PREPARE: &str = "PREPARE";

/// Prepend `PREPARE` unless `sql` already starts with it, ignoring case and
/// leading whitespace.
pub(crate) fn prepare_command(sql: &str) -> Cow<'_, str> {
    let head = sql.trim_start().get(..PREPARE.len());
    match head.is_some_and(|e|e.eq_ignore_ascii_case(PREPARE)) {
        true => Cow::Borrowed(sql),
        false => Cow::Owned(format!("{PREPARE} {sql}")),
    }
}

/// A server side prepared statement.
///
/// Created by [`Connection::prepare`]. There is no deallocation, the plan
/// lives as long as the server session.
pub struct PreparedStatement {
    conn: Connection,
    table: TableResult,
}

impl PreparedStatement {
    pub(crate) fn new(conn: Connection, table: TableResult) -> PreparedStatement {
        Self { conn, table }
    }

    /// Returns the id the server assigned to this statement.
    pub fn id(&self) -> i64 {
        self.table.query_id()
    }

    /// Returns the `PREPARE` result, one row per parameter and result column.
    pub fn describe(&self) -> &TableResult {
        &self.table
    }

    /// Start binding parameters, in order.
    pub fn bind<P: Encode>(&self, param: P) -> Exec<'_> {
        Exec { stmt: self, params: vec![] }.bind(param)
    }

    /// Execute with given parameters.
    pub fn exec(&self, params: &[Param]) -> ResponseFuture {
        self.conn.query(exec_command(self.id(), params))
    }
}

impl fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("id", &self.id())
            .finish()
    }
}

/// Bound execution of a [`PreparedStatement`].
///
/// Await it to submit.
#[must_use = "`Exec` does nothing unless you `.await` it"]
#[derive(Debug)]
pub struct Exec<'a> {
    stmt: &'a PreparedStatement,
    params: Vec<Param>,
}

impl Exec<'_> {
    /// Bind next parameter.
    pub fn bind<P: Encode>(mut self, param: P) -> Self {
        self.params.push(param.encode());
        self
    }

    /// Returns the command text that will be submitted.
    pub fn sql(&self) -> String {
        exec_command(self.stmt.id(), &self.params)
    }

    /// Submit the command.
    pub fn execute(self) -> ResponseFuture {
        self.stmt.exec(&self.params)
    }
}

impl IntoFuture for Exec<'_> {
    type Output = crate::Result<Response>;

    type IntoFuture = ResponseFuture;

    fn into_future(self) -> Self::IntoFuture {
        self.execute()
    }
}
