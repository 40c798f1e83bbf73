use std::path::PathBuf;

use stereobus_msgs::CodecError;

use crate::frame::FrameError;

/// Errors raised by sockets, framing and the publish/subscribe layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path does not fit in `sockaddr_un.sun_path`.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),

    /// A message could not be encoded for publishing.
    #[error("cannot publish message: {0}")]
    Codec(#[from] CodecError),

    /// No topic matches the given name or port.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The publisher or subscriber has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// The peer went away or the endpoint was shut down.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            TransportError::Shutdown | TransportError::Frame(FrameError::ConnectionClosed)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
