use bytes::BytesMut;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};

use crate::{
    common::{debug, verbose, warning},
    io::{poll_read, poll_write_all},
    response::{Response, ResponseSender},
    session::Session,
};

const READ_SIZE: usize = 8 * 1024;

pub(crate) enum WorkerMessage {
    Submit {
        command: String,
        raw: bool,
        send: ResponseSender,
    },
    Close(ResponseSender),
}

#[cfg(test)]
impl WorkerMessage {
    pub(crate) fn command(&self) -> Option<&str> {
        match self {
            Self::Submit { command, .. } => Some(command),
            Self::Close(_) => None,
        }
    }
}

/// Owns the transport and drives the [`Session`].
///
/// Resolves after the transport is shut down, either by `close`, by dropping
/// every handle, or by transport failure.
pub(crate) struct WorkerFuture<IO> {
    io: IO,
    session: Session,
    /// `None` when every handle is dropped
    recv: Option<UnboundedReceiver<WorkerMessage>>,
    read_buf: BytesMut,
}

impl<IO> WorkerFuture<IO> {
    pub(crate) fn new(io: IO, session: Session) -> (UnboundedSender<WorkerMessage>, Self) {
        let (send, recv) = mpsc::unbounded_channel();
        (
            send,
            WorkerFuture {
                io,
                session,
                recv: Some(recv),
                read_buf: BytesMut::with_capacity(READ_SIZE),
            },
        )
    }
}

impl<IO> Future for WorkerFuture<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let WorkerFuture { io, session, recv, read_buf } = self.as_mut().get_mut();

        loop {
            // NOTE:
            // 1. Collect all request upfront
            // 2. Send the head of queue if idle
            // 3. Flush, then read whatever the server sent

            while let Some(Poll::Ready(msg)) = recv.as_mut().map(|e|e.poll_recv(cx)) {
                use WorkerMessage::*;
                match msg {
                    Some(Submit { command, raw, send }) => session.submit(&command, raw, send),
                    Some(Close(send)) => session.close(Some(send)),
                    None => {
                        verbose!("all handles dropped");
                        recv.take();
                        session.close(None);
                    },
                }
            }

            session.drain();

            if !session.write_buf().is_empty() {
                if let Poll::Ready(Err(err)) = poll_write_all(io, session.write_buf(), cx) {
                    session.transport_error(err);
                }
            }

            if session.is_finished() && session.write_buf().is_empty() {
                let result = std::task::ready!(Pin::new(&mut *io).poll_shutdown(cx));
                if let Err(_err) = result {
                    warning!("shutdown error: {_err}");
                }

                debug!("connection closed, state: {:?}", session.state());

                for send in session.take_closers() {
                    let _ = send.send(Ok(Response::Ok(String::new())));
                }
                return Poll::Ready(());
            }

            if read_buf.capacity() - read_buf.len() < READ_SIZE / 2 {
                read_buf.reserve(READ_SIZE);
            }

            match poll_read(io, read_buf, cx) {
                Poll::Ready(Ok(0)) => session.transport_closed(),
                Poll::Ready(Ok(_)) => session.receive(read_buf),
                Poll::Ready(Err(err)) => session.transport_error(err),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
