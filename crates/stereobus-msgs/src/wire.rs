//! Bounds-checked little-endian cursors over message buffers.
//!
//! [`WireReader`] walks a shared [`Bytes`] buffer so that large payloads can be
//! split off without copying. [`WireWriter`] fills a caller-supplied slice that
//! has already been sized with `Message::required_size`.

use bytes::{Buf, BufMut, Bytes};
use tracing::debug;

use crate::array::PodArray;
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::header::{Header, MessageKind, HEADER_SIZE};
use crate::message::Message;

/// Reads fields from one message, starting at its header.
///
/// Positions are relative to the start of the message, not the buffer.
#[derive(Debug)]
pub struct WireReader {
    cur: Bytes,
    len: usize,
}

impl WireReader {
    /// Start reading a message at `offset` within `src`.
    pub fn new(src: &Bytes, offset: usize) -> Result<Self> {
        if offset > src.len() {
            return Err(CodecError::Truncated {
                needed: offset,
                available: src.len(),
            });
        }
        let cur = src.slice(offset..);
        Ok(Self {
            len: cur.len(),
            cur,
        })
    }

    /// Bytes consumed since the start of the message.
    pub fn position(&self) -> usize {
        self.len - self.cur.len()
    }

    pub fn remaining(&self) -> usize {
        self.cur.len()
    }

    /// Fail with `Truncated` unless `n` more bytes are available.
    pub fn ensure(&self, n: usize) -> Result<()> {
        if self.cur.len() < n {
            return Err(CodecError::Truncated {
                needed: self.position().saturating_add(n),
                available: self.len,
            });
        }
        Ok(())
    }

    /// Read the header and reject it unless it matches `kind`.
    pub fn expect_header(&mut self, kind: MessageKind, config: &CodecConfig) -> Result<Header> {
        self.ensure(HEADER_SIZE)?;
        let found = Header::new(self.cur.get_u16_le(), self.cur.get_u8(), self.cur.get_u8());
        let expected = Header::current(kind);
        if !found.is_compatible(&expected, config.version_policy) {
            debug!(%kind, %expected, %found, "rejecting message with incompatible header");
            return Err(CodecError::IncompatibleHeader { expected, found });
        }
        Ok(found)
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cur.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.cur.get_u16_le())
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.cur.get_u32_le())
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.cur.get_u64_le())
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.cur.get_i32_le())
    }

    pub fn f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.cur.get_f32_le())
    }

    pub fn f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.cur.get_f64_le())
    }

    /// Any non-zero byte reads as `true`.
    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn f32_array<const N: usize>(&mut self) -> Result<[f32; N]> {
        self.ensure(N * 4)?;
        let mut out = [0f32; N];
        for value in &mut out {
            *value = self.cur.get_f32_le();
        }
        Ok(out)
    }

    /// Split off the next `n` bytes without copying.
    pub fn bytes(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        Ok(self.cur.split_to(n))
    }

    /// Split off `count` packed elements without copying.
    pub fn pod_array<T: bytemuck::Pod>(&mut self, count: usize) -> Result<PodArray<T>> {
        let n = count
            .checked_mul(PodArray::<T>::ELEMENT_SIZE)
            .ok_or(CodecError::Truncated {
                needed: usize::MAX,
                available: self.len,
            })?;
        Ok(PodArray::from_bytes_unchecked(self.bytes(n)?))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.cur.advance(n);
        Ok(())
    }

    /// Skip forward to `position` (relative to the message start).
    ///
    /// Used to step over the zero padding at the end of fixed header regions.
    pub fn skip_to(&mut self, position: usize) -> Result<()> {
        let here = self.position();
        debug_assert!(position >= here, "cannot seek backwards");
        self.skip(position.saturating_sub(here))
    }

    /// Read an element count and check it against the configured bound.
    pub fn element_count(&mut self, field: &'static str, config: &CodecConfig) -> Result<usize> {
        let declared = self.u64()?;
        if declared > config.max_array_elements {
            debug!(field, declared, max = config.max_array_elements, "rejecting implausible element count");
            return Err(CodecError::SizeSanity {
                field,
                declared,
                max: config.max_array_elements,
            });
        }
        usize::try_from(declared).map_err(|_| CodecError::SizeSanity {
            field,
            declared,
            max: usize::MAX as u64,
        })
    }

    /// Read the `time, frame_id, count` prologue shared by array messages and
    /// skip to the end of the fixed `region`.
    pub fn array_header(
        &mut self,
        field: &'static str,
        region: usize,
        config: &CodecConfig,
    ) -> Result<(u64, u64, usize)> {
        let time = self.u64()?;
        let frame_id = self.u64()?;
        let count = self.element_count(field, config)?;
        self.skip_to(region)?;
        Ok((time, frame_id, count))
    }

    /// Decode a complete embedded message at the current position.
    pub fn message<M: Message>(&mut self, config: &CodecConfig) -> Result<M> {
        let (message, end) = M::decode_with(&self.cur, 0, config)?;
        self.cur.advance(end);
        Ok(message)
    }
}

/// Writes fields into a slice sized exactly for one message.
///
/// Callers check capacity up front, so the put methods do not fail.
#[derive(Debug)]
pub struct WireWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> WireWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            len: buf.len(),
            buf,
        }
    }

    /// Bytes written since the start of the message.
    pub fn position(&self) -> usize {
        self.len - self.buf.len()
    }

    pub fn header(&mut self, header: Header) {
        self.buf.put_slice(&header.encode());
    }

    pub fn u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn f64(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    pub fn bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn f32_slice(&mut self, values: &[f32]) {
        for value in values {
            self.buf.put_f32_le(*value);
        }
    }

    pub fn bytes(&mut self, src: &[u8]) {
        self.buf.put_slice(src);
    }

    pub fn pod_array<T: bytemuck::Pod>(&mut self, array: &PodArray<T>) {
        self.buf.put_slice(array.as_bytes());
    }

    pub fn zeros(&mut self, n: usize) {
        self.buf.put_bytes(0, n);
    }

    /// Zero-fill up to `position` (relative to the message start).
    pub fn pad_to(&mut self, position: usize) {
        let here = self.position();
        debug_assert!(position >= here, "header fields overflow the fixed region");
        self.zeros(position.saturating_sub(here));
    }

    /// Write the `time, frame_id, count` prologue shared by array messages and
    /// zero-fill the rest of the fixed `region`.
    pub fn array_header(&mut self, time: u64, frame_id: u64, count: usize, region: usize) {
        self.u64(time);
        self.u64(frame_id);
        self.u64(count as u64);
        self.pad_to(region);
    }

    /// Write a complete embedded message (header included) at the current position.
    pub fn message<M: Message>(&mut self, message: &M) {
        let size = message.required_size();
        let (head, tail) = std::mem::take(&mut self.buf).split_at_mut(size);
        let mut nested = WireWriter::new(head);
        nested.header(M::header());
        message.write_body(&mut nested);
        debug_assert_eq!(nested.position(), size);
        self.buf = tail;
    }
}
