use crate::header::Header;
use crate::pixel::ElementKind;

/// Coarse classification of codec failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Type or version mismatch on decode. The message should be dropped.
    IncompatibleHeader,
    /// A declared row/column/element count is implausibly large.
    SizeSanityViolation,
    /// The message cannot be represented on the wire. Nothing was written.
    UnsupportedEncoding,
    /// The buffer is shorter than its own header fields imply.
    TruncatedBuffer,
}

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The header does not match the type/version the decoder expects.
    #[error("incompatible header: expected {expected}, found {found}")]
    IncompatibleHeader { expected: Header, found: Header },

    /// The header carries a type id that no message kind is registered for.
    #[error("unknown message type id {0}")]
    UnknownType(u16),

    /// A declared size field exceeds its sanity bound.
    #[error("{field} of {declared} exceeds sanity bound {max}")]
    SizeSanity {
        field: &'static str,
        declared: u64,
        max: u64,
    },

    /// The (channels, element kind) pair has no pixel-type tag.
    #[error("unsupported pixel type: {channels} channel(s) of {element}")]
    UnsupportedPixelType { channels: u32, element: ElementKind },

    /// The pixel-type tag read from the wire is not in the table.
    #[error("unknown pixel type tag {0}")]
    UnknownPixelTag(u32),

    /// Image arrays must have rank 2 (single channel) or 3.
    #[error("image must have rank 2 or 3, got rank {0}")]
    InvalidShape(usize),

    /// The pixel buffer length disagrees with rows, cols and pixel type.
    #[error("pixel buffer holds {actual} bytes, image geometry requires {expected}")]
    PixelLength { expected: usize, actual: usize },

    /// The image extension does not fit its 16-bit length field.
    #[error("image extension of {0} bytes exceeds {max} bytes", max = u16::MAX)]
    ExtensionTooLong(usize),

    /// Parallel point and color arrays differ in length.
    #[error("parallel arrays differ in length: {points} points, {colors} colors")]
    LengthMismatch { points: usize, colors: usize },

    /// The two images embedded in a point-cloud soup differ in geometry.
    #[error("embedded images differ in size: rectified {rectified:?}, disparity {disparity:?}")]
    DimensionMismatch {
        rectified: (u32, u32),
        disparity: (u32, u32),
    },

    /// The input buffer ends before the message does.
    #[error("buffer truncated: message needs {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// The output buffer cannot hold the encoded message.
    #[error("output buffer too small: need {needed} bytes, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
}

impl CodecError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::IncompatibleHeader { .. } | CodecError::UnknownType(_) => {
                ErrorKind::IncompatibleHeader
            }
            CodecError::SizeSanity { .. } => ErrorKind::SizeSanityViolation,
            CodecError::Truncated { .. } => ErrorKind::TruncatedBuffer,
            CodecError::UnsupportedPixelType { .. }
            | CodecError::UnknownPixelTag(_)
            | CodecError::InvalidShape(_)
            | CodecError::PixelLength { .. }
            | CodecError::ExtensionTooLong(_)
            | CodecError::LengthMismatch { .. }
            | CodecError::DimensionMismatch { .. }
            | CodecError::BufferTooSmall { .. } => ErrorKind::UnsupportedEncoding,
        }
    }

    /// Whether a receive loop should log this error and move on to the next message.
    ///
    /// An unknown pixel tag is only ever produced while decoding, so it is
    /// recoverable even though it shares the encoding bucket.
    pub fn is_recoverable(&self) -> bool {
        match self.kind() {
            ErrorKind::IncompatibleHeader
            | ErrorKind::SizeSanityViolation
            | ErrorKind::TruncatedBuffer => true,
            ErrorKind::UnsupportedEncoding => matches!(self, CodecError::UnknownPixelTag(_)),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
