use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use super::codec::{decode_frame, Frame, FrameConfig};
use super::error::{FrameError, Result};
use crate::stream::BusStream;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Reads whole frames from a byte stream.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    scratch: Box<[u8]>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            scratch: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            config,
        }
    }

    /// Block until a complete frame has arrived.
    ///
    /// EOF, including EOF in the middle of a frame, is `ConnectionClosed`; an
    /// elapsed read timeout is `Timeout` and leaves any partial frame buffered.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(frame);
            }

            // scratch is zeroed once per reader, not once per read
            match self.inner.read(&mut self.scratch) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(read) => self.buf.extend_from_slice(&self.scratch[..read]),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(FrameError::Timeout)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<BusStream> {
    /// Wrap a bus stream and apply the configured read timeout to it.
    pub fn for_stream(inner: BusStream, config: FrameConfig) -> crate::Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
