use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::error::{FrameError, Result};

/// Magic (2) + payload length (4) + topic port (2).
pub const HEADER_SIZE: usize = 8;

/// `"SB"`.
pub const MAGIC: [u8; 2] = [0x53, 0x42];

/// Large enough for a 4K color image in a soup with its disparity map.
pub const DEFAULT_MAX_PAYLOAD: usize = 256 * 1024 * 1024;

/// One message as carried on a bus socket, tagged with its topic port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub topic: u16,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(topic: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            topic,
            payload: payload.into(),
        }
    }

    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Frame header for a payload of `len` bytes.
///
/// ```text
/// ┌────────────┬──────────────┬────────────┬──────────────┐
/// │ Magic (2B) │ Length       │ Topic port │ Payload      │
/// │ "SB"       │ (u32 LE)     │ (u16 LE)   │ (Length B)   │
/// └────────────┴──────────────┴────────────┴──────────────┘
/// ```
pub fn encode_header(topic: u16, len: usize) -> Result<[u8; HEADER_SIZE]> {
    let wire_len = u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: u32::MAX as usize,
    })?;
    let mut header = [0u8; HEADER_SIZE];
    header[..2].copy_from_slice(&MAGIC);
    header[2..6].copy_from_slice(&wire_len.to_le_bytes());
    header[6..].copy_from_slice(&topic.to_le_bytes());
    Ok(header)
}

/// Append a complete frame to `dst`.
pub fn encode_frame(topic: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = encode_header(topic, payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header);
    dst.put_slice(payload);
    Ok(())
}

/// Take one frame off the front of `src`.
///
/// Returns `Ok(None)` until `src` holds a complete frame; nothing is consumed
/// in that case. The length field is checked against `max_payload` as soon as
/// the header is available, before waiting for the payload.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }
    if src[..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let mut header = &src[2..HEADER_SIZE];
    let payload_len = header.get_u32_le() as usize;
    let topic = header.get_u16_le();

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }
    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    Ok(Some(Frame { topic, payload }))
}

/// Limits and timeouts for framed streams.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest accepted payload. Default: 256 MiB.
    pub max_payload_size: usize,
    pub read_timeout: Option<std::time::Duration>,
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
