//! Command response.
use std::{
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::sync::oneshot;

use crate::{
    Result,
    error::ErrorKind,
    mapi::{Message, ProtocolError, table::parse_table},
    row::TableResult,
};

pub(crate) type ResponseSender = oneshot::Sender<Result<Response>>;

/// Server answer to a single command.
///
/// Server reported errors are returned as [`ErrorKind::Database`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Command succeeded without table, holds the raw message.
    Ok(String),
    /// Command produced a table.
    Table(TableResult),
}

impl Response {
    /// Interpret a reassembled message.
    pub(crate) fn parse(message: &str) -> Result<Response> {
        match Message::classify(message) {
            Message::Error(err) => Err(err.into()),
            Message::Table(kind) => Ok(Response::Table(parse_table(kind, message)?)),
            Message::Prompt | Message::Redirect | Message::Other => Ok(Response::Ok(message.into())),
        }
    }

    /// Returns `true` if response contains a table.
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table(_))
    }

    pub fn as_table(&self) -> Option<&TableResult> {
        match self {
            Self::Table(table) => Some(table),
            Self::Ok(_) => None,
        }
    }

    /// Consume self into the table, error if command did not produce one.
    pub fn into_table(self) -> Result<TableResult> {
        match self {
            Self::Table(table) => Ok(table),
            Self::Ok(_) => Err(ProtocolError::unexpected("table result").into()),
        }
    }
}

/// Future returned by submitting a command.
///
/// Resolves once the server answered, responses are delivered in submission order.
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub struct ResponseFuture {
    recv: oneshot::Receiver<Result<Response>>,
}

impl ResponseFuture {
    pub(crate) fn channel() -> (ResponseSender, ResponseFuture) {
        let (send, recv) = oneshot::channel();
        (send, ResponseFuture { recv })
    }
}

impl Future for ResponseFuture {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.recv).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(_) => Poll::Ready(Err(ErrorKind::Closed.into())),
        }
    }
}
