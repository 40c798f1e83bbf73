/// Errors raised while framing messages on a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream is not positioned at a frame boundary.
    #[error("invalid frame magic (expected 0x5342 \"SB\")")]
    InvalidMagic,

    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream, possibly mid-frame.
    #[error("connection closed")]
    ConnectionClosed,

    /// A read or write timeout elapsed before the frame was complete.
    #[error("timed out waiting for the peer")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, FrameError>;
