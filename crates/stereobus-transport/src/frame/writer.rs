use std::io::{ErrorKind, Write};

use super::codec::{encode_header, Frame, FrameConfig};
use super::error::{FrameError, Result};
use crate::stream::BusStream;

/// Writes whole frames to a byte stream.
///
/// The header and payload are written separately so payloads are never
/// copied into an intermediate buffer.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.topic, frame.payload.as_ref())
    }

    /// Frame `payload` for `topic` and write it out (blocking).
    ///
    /// On `Timeout` or any I/O error the peer may have received part of the
    /// frame; the stream should not be reused.
    pub fn send(&mut self, topic: u16, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }
        let header = encode_header(topic, payload.len())?;
        write_fully(&mut self.inner, &header)?;
        write_fully(&mut self.inner, payload)?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(io_error(err)),
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

impl FrameWriter<BusStream> {
    /// Wrap a bus stream and apply the configured write timeout to it.
    pub fn for_stream(inner: BusStream, config: FrameConfig) -> crate::Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

fn write_fully<W: Write>(dst: &mut W, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        match dst.write(bytes) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => bytes = &bytes[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(io_error(err)),
        }
    }
    Ok(())
}

fn io_error(err: std::io::Error) -> FrameError {
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => FrameError::Timeout,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => FrameError::ConnectionClosed,
        _ => FrameError::Io(err),
    }
}
