use std::fmt;
use std::io;

use stereobus_msgs::CodecError;
use stereobus_transport::{FrameError, TransportError};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Any decode or encode failure means the bytes on hand are not a usable message.
pub fn codec_error(context: &str, err: CodecError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::InvalidMagic | FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Frame(err) => frame_error(context, err),
        TransportError::Codec(err) => codec_error(context, err),
        TransportError::UnknownTopic(_) | TransportError::PathTooLong { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Shutdown => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use stereobus_msgs::{Header, MessageKind};

    use super::*;

    #[test]
    fn transport_errors_map_by_cause() {
        let missing = TransportError::Connect {
            path: PathBuf::from("/tmp/none.sock"),
            source: io::ErrorKind::NotFound.into(),
        };
        assert_eq!(transport_error("connect", missing).code, TRANSPORT_ERROR);

        let denied = TransportError::Bind {
            path: PathBuf::from("/root/x.sock"),
            source: io::ErrorKind::PermissionDenied.into(),
        };
        assert_eq!(transport_error("bind", denied).code, PERMISSION_DENIED);

        let unknown = TransportError::UnknownTopic("nodar/x".into());
        let err = transport_error("lookup", unknown);
        assert_eq!(err.code, USAGE);
        assert_eq!(err.to_string(), "lookup: unknown topic: nodar/x");

        let timeout = TransportError::Frame(FrameError::Timeout);
        assert_eq!(transport_error("recv", timeout).code, TIMEOUT);
    }

    #[test]
    fn codec_errors_are_data_invalid() {
        let err = CodecError::IncompatibleHeader {
            expected: Header::current(MessageKind::Image),
            found: Header::current(MessageKind::Velocity),
        };
        assert_eq!(codec_error("decode", err.clone()).code, DATA_INVALID);
        assert_eq!(
            transport_error("recv", TransportError::Codec(err)).code,
            DATA_INVALID
        );
    }
}
