//! Length-prefixed framing for bus sockets.
//!
//! Every frame carries a 2-byte magic (`"SB"`), the payload length and the
//! port of the topic it was published on, so a subscriber can tell a stray
//! frame from its own traffic.

mod codec;
mod error;
mod reader;
mod writer;

pub use codec::{
    decode_frame, encode_frame, encode_header, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE, MAGIC,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
