//! Protocol engine.
//!
//! [`Session`] does no io by itself. Inbound bytes are fed with
//! [`receive`][Session::receive], outbound blocks are taken from
//! [`write_buf`][Session::write_buf]. This keeps every state transition in one
//! place, processed strictly in the order bytes arrive.
use bytes::BytesMut;
use std::{
    collections::{HashMap, VecDeque},
    io, mem,
    sync::Arc,
};
use tokio::sync::oneshot;

use crate::{
    Result,
    common::{debug, verbose, warning},
    connection::Config,
    error::{Error, ErrorKind},
    mapi::{
        AuthError, BlockDecoder, Message,
        auth::{Challenge, Login},
        block,
    },
    response::{Response, ResponseSender},
    row::TableResult,
};

/// Server environment, name to value.
pub(crate) type Environment = Arc<HashMap<String, String>>;
pub(crate) type ConnectSender = oneshot::Sender<Result<Environment>>;

const REPLY_SIZE: &str = "Xreply_size -1";
const AUTO_COMMIT: &str = "Xauto_commit 1";
const ENVIRONMENT: &str = "SELECT * FROM env()";
/// Cheap query used to confirm the connection and to fence `close`.
const PROBE: &str = "SELECT 42";

/// Connection state.
///
/// ```text
/// Connected -> Authenticating -> Ready -> Disconnected
///          \               \
///           `---------------`-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Transport established, waiting for the challenge.
    Connected,
    /// Login sent, waiting for the prompt.
    Authenticating,
    Ready,
    /// Closed, either by request or by the transport.
    Disconnected,
    /// Login rejected.
    Failed,
}

/// Whoever is waiting for a response.
enum Reply {
    Caller(ResponseSender),
    /// Raw setup directive, result only logged.
    Setup,
    Environment,
    /// Answer is what `connect` resolves with.
    Probe,
    /// Answer means every previous request is done.
    Close,
}

struct Request {
    message: String,
    reply: Reply,
}

impl Request {
    fn new(command: &str, raw: bool, reply: Reply) -> Request {
        let message = match raw {
            true => command.into(),
            false => format!("s{command};"),
        };
        Self { message, reply }
    }
}

pub(crate) struct Session {
    state: State,
    config: Config,
    decoder: BlockDecoder,
    write_buf: BytesMut,
    queue: VecDeque<Request>,
    /// The single in-flight request.
    pending: Option<Reply>,
    connect: Option<ConnectSender>,
    env: HashMap<String, String>,
    closing: bool,
    closers: Vec<ResponseSender>,
}

impl Session {
    /// Create session over an established transport.
    ///
    /// `connect` resolves after login, setup and the probe query.
    pub(crate) fn new(config: Config, connect: ConnectSender) -> Session {
        let queue = VecDeque::from([
            Request::new(REPLY_SIZE, true, Reply::Setup),
            Request::new(AUTO_COMMIT, true, Reply::Setup),
            Request::new(ENVIRONMENT, false, Reply::Environment),
            Request::new(PROBE, false, Reply::Probe),
        ]);

        Self {
            state: State::Connected,
            decoder: BlockDecoder::new().with_trace(config.debug),
            config,
            write_buf: BytesMut::new(),
            queue,
            pending: None,
            connect: Some(connect),
            env: HashMap::new(),
            closing: false,
            closers: vec![],
        }
    }

    #[cfg(any(test, feature = "log"))]
    pub(crate) fn state(&self) -> State {
        self.state
    }

    /// Returns `true` if no more io should be done, other than flushing and shutdown.
    pub(crate) fn is_finished(&self) -> bool {
        matches!(self.state, State::Disconnected | State::Failed)
    }

    /// Buffered outbound blocks.
    pub(crate) fn write_buf(&mut self) -> &mut BytesMut {
        &mut self.write_buf
    }

    /// Enqueue a command, `raw` commands are sent verbatim.
    ///
    /// Nothing is sent until [`drain`][Session::drain].
    pub(crate) fn submit(&mut self, command: &str, raw: bool, send: ResponseSender) {
        if self.is_finished() {
            let _ = send.send(Err(ErrorKind::Closed.into()));
            return;
        }
        if self.closing {
            let _ = send.send(Err(ErrorKind::Closing.into()));
            return;
        }
        self.queue.push_back(Request::new(command, raw, Reply::Caller(send)));
    }

    /// Enqueue the close probe, every request queued before it completes first.
    pub(crate) fn close(&mut self, send: Option<ResponseSender>) {
        self.closers.extend(send);
        if self.closing || self.is_finished() {
            return;
        }
        self.closing = true;
        self.queue.push_back(Request::new(PROBE, false, Reply::Close));
    }

    /// Senders of `close` calls, to be resolved after transport shutdown.
    pub(crate) fn take_closers(&mut self) -> Vec<ResponseSender> {
        mem::take(&mut self.closers)
    }

    /// Send the head of the queue if nothing is in flight.
    pub(crate) fn drain(&mut self) {
        if self.state != State::Ready || self.pending.is_some() {
            return;
        }
        let Some(Request { message, reply }) = self.queue.pop_front() else {
            return;
        };

        verbose!(queued = self.queue.len(), "dispatch");

        self.send(&message);
        self.pending = Some(reply);
    }

    fn send(&mut self, message: &str) {
        if self.config.debug {
            debug!("TX: {message}");
        }
        block::encode_with(message, self.config.block_size, &mut self.write_buf, self.config.debug);
    }

    /// Feed inbound bytes, every complete message in `buf` is handled in order.
    ///
    /// Incomplete trailing message is kept for the next call.
    pub(crate) fn receive(&mut self, buf: &mut BytesMut) {
        while !self.is_finished() {
            match self.decoder.decode(buf) {
                Ok(Some(message)) => self.handle(message),
                Ok(None) => break,
                Err(err) => self.handle_error(err.into()),
            }
        }
    }

    fn handle(&mut self, message: String) {
        if self.config.debug {
            debug!("RX [{:?}]: {message}", self.state);
        }

        match self.state {
            State::Connected | State::Authenticating => self.authenticate(&message),
            State::Ready => self.respond(&message),
            State::Disconnected | State::Failed => {},
        }
    }

    fn authenticate(&mut self, message: &str) {
        match Message::classify(message) {
            Message::Prompt => self.state = State::Ready,
            Message::Redirect => {},
            Message::Error(err) => self.fail(AuthError::new(err).into()),
            Message::Table(_) | Message::Other => {
                let challenge = Challenge::parse(message);
                let response = Login::from(&self.config).respond(&challenge);
                self.state = State::Authenticating;
                self.send(&response);
            },
        }
    }

    fn respond(&mut self, message: &str) {
        if let Message::Redirect = Message::classify(message) {
            return;
        }
        let Some(reply) = self.pending.take() else {
            warning!("unexpected message with no request in flight");
            return;
        };
        self.complete(reply, Response::parse(message));
    }

    /// Message could not be reassembled.
    fn handle_error(&mut self, error: Error) {
        match self.state {
            State::Connected | State::Authenticating => self.fail(error),
            _ => match self.pending.take() {
                Some(reply) => self.complete(reply, Err(error)),
                None => {
                    warning!("unexpected message with no request in flight: {error}");
                },
            },
        }
    }

    fn complete(&mut self, reply: Reply, result: Result<Response>) {
        match reply {
            Reply::Caller(send) => {
                let _ = send.send(result);
            },
            Reply::Setup => {
                if let Err(_err) = result {
                    warning!("setup command failed: {_err}");
                }
            },
            Reply::Environment => match result.and_then(Response::into_table) {
                Ok(table) => self.env = environment(&table),
                Err(_err) => {
                    warning!("failed to read server environment: {_err}");
                },
            },
            Reply::Probe => {
                if let Some(send) = self.connect.take() {
                    let env = &mut self.env;
                    let _ = send.send(result.map(|_| Arc::new(mem::take(env))));
                }
            },
            Reply::Close => self.state = State::Disconnected,
        }
    }

    /// Returns the sender waiting for given reply, if any.
    fn sender(&mut self, reply: Reply) -> Option<Waiter> {
        match reply {
            Reply::Caller(send) => Some(Waiter::Caller(send)),
            Reply::Probe => self.connect.take().map(Waiter::Connect),
            Reply::Setup | Reply::Environment | Reply::Close => None,
        }
    }

    /// Login rejected or unreadable, nothing else can be done.
    fn fail(&mut self, error: Error) {
        self.state = State::Failed;
        self.abort(error);
    }

    /// Transport failed, the in-flight request receives the error.
    pub(crate) fn transport_error(&mut self, error: io::Error) {
        debug!("transport error: {error}");
        self.state = match self.state {
            State::Connected | State::Authenticating => State::Failed,
            _ => State::Disconnected,
        };
        self.write_buf.clear();
        self.abort(error.into());
    }

    /// Transport reached eof.
    pub(crate) fn transport_closed(&mut self) {
        let expected = self.state == State::Disconnected;
        if expected && self.pending.is_none() && self.queue.is_empty() {
            return;
        }
        self.transport_error(io::ErrorKind::UnexpectedEof.into());
    }

    /// Resolve every waiter, the first one with `error`, the rest as closed.
    fn abort(&mut self, error: Error) {
        let mut error = Some(error);
        let mut next = move || error.take().unwrap_or_else(|| ErrorKind::Closed.into());

        let first = match self.pending.take() {
            Some(reply) => self.sender(reply),
            None => None,
        };
        let first = first.or_else(|| self.connect.take().map(Waiter::Connect));
        if let Some(waiter) = first {
            waiter.fail(next());
        }

        let queue = mem::take(&mut self.queue);
        for Request { reply, .. } in queue {
            if let Some(waiter) = self.sender(reply) {
                waiter.fail(next());
            }
        }
        if let Some(send) = self.connect.take() {
            let _ = send.send(Err(next()));
        }
    }
}

enum Waiter {
    Caller(ResponseSender),
    Connect(ConnectSender),
}

impl Waiter {
    fn fail(self, error: Error) {
        match self {
            Self::Caller(send) => {
                let _ = send.send(Err(error));
            },
            Self::Connect(send) => {
                let _ = send.send(Err(error));
            },
        }
    }
}

/// Fold `SELECT * FROM env()` result into a map.
fn environment(table: &TableResult) -> HashMap<String, String> {
    table
        .rows()
        .filter_map(|row| {
            let name = row.try_get(0usize).ok()?.as_str()?;
            let value = row.try_get(1usize).ok()?;
            Some((name.to_owned(), value.to_string()))
        })
        .collect()
}
