//! Poll based io helpers.
use std::{
    io::{self, IoSlice},
    pin::Pin,
    task::{Context, Poll, ready},
};
use bytes::{Buf, BufMut};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Read once from `reader` into the spare capacity of `buf`.
///
/// Returns `Ok(0)` on eof.
pub fn poll_read<R, B>(reader: &mut R, buf: &mut B, cx: &mut Context) -> Poll<io::Result<usize>>
where
    R: AsyncRead + Unpin + ?Sized,
    B: BufMut + ?Sized,
{
    if !buf.has_remaining_mut() {
        return Poll::Ready(Ok(0));
    }

    let n = {
        let dst = buf.chunk_mut();
        let dst = unsafe { dst.as_uninit_slice_mut() };
        let mut buf = ReadBuf::uninit(dst);
        let ptr = buf.filled().as_ptr();
        ready!(Pin::new(reader).poll_read(cx, &mut buf)?);

        // Ensure the pointer does not change from under us
        assert_eq!(ptr, buf.filled().as_ptr());
        buf.filled().len()
    };

    // Safety: This is guaranteed to be the number of initialized (and read)
    // bytes due to the invariants provided by `ReadBuf::filled`.
    unsafe {
        buf.advance_mut(n);
    }

    Poll::Ready(Ok(n))
}

/// Write all of `buf`, advancing it as bytes are written.
///
/// On `Pending`, bytes already written are consumed from `buf`.
pub fn poll_write_all<W, B>(writer: &mut W, buf: &mut B, cx: &mut Context) -> Poll<io::Result<()>>
where
    W: AsyncWrite + Unpin + ?Sized,
    B: Buf + ?Sized,
{
    const MAX_VECTOR_ELEMENTS: usize = 64;

    while buf.has_remaining() {
        let n = if writer.is_write_vectored() {
            let mut slices = [IoSlice::new(&[]); MAX_VECTOR_ELEMENTS];
            let cnt = buf.chunks_vectored(&mut slices);
            ready!(Pin::new(&mut *writer).poll_write_vectored(cx, &slices[..cnt]))?
        } else {
            ready!(Pin::new(&mut *writer).poll_write(cx, buf.chunk())?)
        };
        buf.advance(n);
        if n == 0 {
            return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
        }
    }

    Poll::Ready(Ok(()))
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;
    use std::future::poll_fn;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn write_then_read() {
        let (mut a, mut b) = tokio::io::duplex(8);

        let writer = tokio::spawn(async move {
            let mut buf = BytesMut::from(&b"0123456789abcdef"[..]);
            poll_fn(|cx| poll_write_all(&mut a, &mut buf, cx)).await.unwrap();
            assert!(buf.is_empty());
            a.shutdown().await.unwrap();
        });

        let mut read = BytesMut::with_capacity(4);
        loop {
            read.reserve(4);
            let n = poll_fn(|cx| poll_read(&mut b, &mut read, cx)).await.unwrap();
            if n == 0 {
                break;
            }
        }
        assert_eq!(&read[..], b"0123456789abcdef");

        writer.await.unwrap();
        assert_eq!(b.read(&mut [0; 1]).await.unwrap(), 0);
    }
}
