use bytes::{Bytes, BytesMut};

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::header::{Header, MessageKind};
use crate::wire::{WireReader, WireWriter};

/// A message with a fixed little-endian wire layout.
///
/// Implementors describe their size and body; the provided methods handle
/// the header gate, bounds checks and offset bookkeeping. Encoding is
/// two-phase: size with [`Message::required_size`], allocate, then
/// [`Message::encode`] into the buffer.
pub trait Message: Sized {
    const KIND: MessageKind;

    /// Exact encoded size in bytes, header included.
    fn required_size(&self) -> usize;

    /// Reject values that cannot be put on the wire.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Write everything after the header. The writer holds exactly
    /// `required_size() - HEADER_SIZE` bytes.
    fn write_body(&self, w: &mut WireWriter<'_>);

    /// Read everything after the header.
    fn read_body(r: &mut WireReader, config: &CodecConfig) -> Result<Self>;

    fn header() -> Header {
        Header::current(Self::KIND)
    }

    /// Encode into `dst` at `offset`, returning the offset just past the message.
    ///
    /// On error nothing has been written to `dst`.
    fn encode(&self, dst: &mut [u8], offset: usize) -> Result<usize> {
        self.validate()?;
        let size = self.required_size();
        let end = offset.saturating_add(size);
        if end > dst.len() {
            return Err(CodecError::BufferTooSmall {
                needed: end,
                available: dst.len(),
            });
        }
        let mut w = WireWriter::new(&mut dst[offset..end]);
        w.header(Self::header());
        self.write_body(&mut w);
        debug_assert_eq!(w.position(), size, "{} size mismatch", Self::KIND);
        Ok(end)
    }

    /// Decode the message at `offset`, returning it with the offset just past it.
    fn decode_with(src: &Bytes, offset: usize, config: &CodecConfig) -> Result<(Self, usize)> {
        let mut r = WireReader::new(src, offset)?;
        r.expect_header(Self::KIND, config)?;
        let message = Self::read_body(&mut r, config)?;
        Ok((message, offset + r.position()))
    }

    /// [`Message::decode_with`] using the default limits.
    fn decode(src: &Bytes, offset: usize) -> Result<(Self, usize)> {
        Self::decode_with(src, offset, &CodecConfig::default())
    }

    /// Encode into a freshly allocated buffer of exactly the required size.
    fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.required_size());
        self.encode(&mut buf, 0)?;
        Ok(buf.freeze())
    }

    /// Decode a buffer holding exactly one message at offset 0.
    fn from_bytes(src: &Bytes) -> Result<Self> {
        Self::decode(src, 0).map(|(message, _)| message)
    }
}
