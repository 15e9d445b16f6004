//! Block framing.
//!
//! Every message is cut into one or more blocks, each prefixed with a 2 byte
//! little endian header:
//!
//! ```text
//! | bit 15 ..  1 | bit 0 |
//! |--------------|-------|
//! | payload len  | final |
//! ```
//!
//! The block with the `final` bit set is the last block of a message.
use bytes::{Buf, BufMut, BytesMut};

use super::error::ProtocolError;
use crate::common::debug;

/// Default block size, header included.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Length of the block header.
pub const HEADER_LEN: usize = size_of::<u16>();

/// Largest payload a 15 bit length can describe.
pub const MAX_PAYLOAD: usize = (u16::MAX >> 1) as usize;

/// Block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    len: u16,
    last: bool,
}

impl BlockHeader {
    /// Create new header.
    ///
    /// # Panics
    ///
    /// Panics if `len` is larger than [`MAX_PAYLOAD`].
    pub fn new(len: usize, last: bool) -> Self {
        assert!(len <= MAX_PAYLOAD, "block payload too large for protocol: {len}");
        Self { len: len as u16, last }
    }

    /// Returns payload length in bytes, header excluded.
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns `true` if block has no payload.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if this is the final block of a message.
    pub const fn is_last(&self) -> bool {
        self.last
    }

    /// Pack header as `len << 1 | final`.
    pub const fn to_bits(self) -> u16 {
        (self.len << 1) | self.last as u16
    }

    /// Unpack header.
    pub const fn from_bits(bits: u16) -> Self {
        Self { len: bits >> 1, last: bits & 1 == 1 }
    }
}

/// Write `message` into `buf` as blocks of at most `block_size` bytes, header included.
///
/// An empty message still produces one header only block with `final` set.
pub fn encode(message: &str, block_size: usize, buf: &mut BytesMut) {
    encode_with(message, block_size, buf, false);
}

pub(crate) fn encode_with(message: &str, block_size: usize, buf: &mut BytesMut, trace: bool) {
    // at least one byte per block, otherwise a non empty message never drains
    let max = block_size.saturating_sub(HEADER_LEN).clamp(1, MAX_PAYLOAD);
    let mut rest = message.as_bytes();

    loop {
        let (chunk, tail) = rest.split_at(rest.len().min(max));
        let header = BlockHeader::new(chunk.len(), tail.is_empty());

        if trace {
            debug!("writing {} bytes, final={}", header.len(), header.is_last() as u8);
        }

        buf.reserve(HEADER_LEN + chunk.len());
        buf.put_u16_le(header.to_bits());
        buf.put_slice(chunk);

        if header.is_last() {
            break;
        }
        rest = tail;
    }
}

/// Reassemble blocks into messages across arbitrary read boundaries.
#[derive(Debug, Default)]
pub struct BlockDecoder {
    /// Payload bytes still expected for the current block,
    /// `None` when the next bytes are a header.
    leftover: Option<usize>,
    last: bool,
    message: BytesMut,
    trace: bool,
}

impl BlockDecoder {
    /// Create new decoder.
    pub fn new() -> BlockDecoder {
        Self::default()
    }

    /// Log every block header read.
    pub fn with_trace(mut self, trace: bool) -> BlockDecoder {
        self.trace = trace;
        self
    }

    /// Returns `true` if no partial message is buffered.
    pub fn is_idle(&self) -> bool {
        self.leftover.is_none() && self.message.is_empty()
    }

    /// Consume bytes from `buf` until a complete message is reassembled.
    ///
    /// Returns `Ok(None)` when `buf` is exhausted before a message completes,
    /// the partial message is kept for the next call. Bytes after a complete
    /// message stay in `buf`, so callers should call `decode` again until it
    /// returns `None`.
    ///
    /// A message that is not valid utf8 is consumed and reported as error,
    /// the decoder stays usable for the next message.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        loop {
            let leftover = match self.leftover {
                Some(leftover) => leftover,
                None => {
                    if buf.len() < HEADER_LEN {
                        return Ok(None);
                    }
                    let header = BlockHeader::from_bits(buf.get_u16_le());
                    if self.trace {
                        debug!("reading {} bytes, final={}", header.len(), header.is_last() as u8);
                    }
                    self.last = header.is_last();
                    header.len()
                }
            };

            let read = leftover.min(buf.len());
            self.message.put(buf.split_to(read));

            if read < leftover {
                self.leftover = Some(leftover - read);
                return Ok(None);
            }

            self.leftover = None;

            if self.last {
                self.last = false;
                let message = self.message.split();
                return match std::str::from_utf8(&message) {
                    Ok(ok) => Ok(Some(ok.to_owned())),
                    Err(err) => Err(err.into()),
                };
            }
        }
    }
}
