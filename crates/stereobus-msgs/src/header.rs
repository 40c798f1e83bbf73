//! The 4-byte type+version tag that prefixes every message, and the registry
//! of message kinds that owns every type id.

use std::fmt;

use crate::error::{CodecError, Result};

/// Header: type id (2) + major (1) + minor (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Protocol major version written by this crate.
pub const MAJOR_VERSION: u8 = 0;

/// Protocol minor version written by this crate.
pub const MINOR_VERSION: u8 = 1;

/// Type and version prefix shared by every message.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────┬─────────┐
/// │ Type id      │ Major   │ Minor   │
/// │ (2B LE)      │ (1B)    │ (1B)    │
/// └──────────────┴─────────┴─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub type_id: u16,
    pub major: u8,
    pub minor: u8,
}

impl Header {
    pub const fn new(type_id: u16, major: u8, minor: u8) -> Self {
        Self {
            type_id,
            major,
            minor,
        }
    }

    /// The header this crate writes for `kind`.
    pub const fn current(kind: MessageKind) -> Self {
        Self::new(kind.type_id(), MAJOR_VERSION, MINOR_VERSION)
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let [lo, hi] = self.type_id.to_le_bytes();
        [lo, hi, self.major, self.minor]
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        match src {
            [lo, hi, major, minor, ..] => Ok(Self::new(
                u16::from_le_bytes([*lo, *hi]),
                *major,
                *minor,
            )),
            _ => Err(CodecError::Truncated {
                needed: HEADER_SIZE,
                available: src.len(),
            }),
        }
    }

    /// Whether a received header may be decoded by a consumer expecting `expected`.
    pub fn is_compatible(&self, expected: &Header, policy: VersionPolicy) -> bool {
        if self.type_id != expected.type_id || self.major != expected.major {
            return false;
        }
        match policy {
            VersionPolicy::Exact => self.minor == expected.minor,
            VersionPolicy::SameMajor => true,
        }
    }

    /// The registered kind for this header's type id, if any.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_type_id(self.type_id)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {} v{}.{}", self.type_id, self.major, self.minor)
    }
}

/// Read the header at `offset` without touching the body.
pub fn peek_header(src: &[u8], offset: usize) -> Result<Header> {
    let available = src.len().saturating_sub(offset);
    if available < HEADER_SIZE {
        return Err(CodecError::Truncated {
            needed: HEADER_SIZE,
            available,
        });
    }
    Header::decode(&src[offset..])
}

/// How strictly the minor version is compared on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersionPolicy {
    /// Type id, major and minor must all match.
    #[default]
    Exact,
    /// Type id and major must match; any minor is accepted.
    SameMajor,
}

/// Every message kind on the bus, with its wire type id.
///
/// This enum is the only place type ids are assigned. The explicit
/// discriminants make a duplicate id a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum MessageKind {
    Image = 0,
    PointCloudSoup = 1,
    CameraParameterRequest = 2,
    CameraParameterResponse = 3,
    PointCloud = 4,
    PointCloudRgb = 5,
    SetBoolRequest = 6,
    SetBoolResponse = 7,
    ObstacleData = 8,
    QaFindings = 9,
    // Legacy producers tag navigation and velocity with 9 as well.
    Navigation = 10,
    Velocity = 11,
}

impl MessageKind {
    pub const ALL: [MessageKind; 12] = [
        MessageKind::Image,
        MessageKind::PointCloudSoup,
        MessageKind::CameraParameterRequest,
        MessageKind::CameraParameterResponse,
        MessageKind::PointCloud,
        MessageKind::PointCloudRgb,
        MessageKind::SetBoolRequest,
        MessageKind::SetBoolResponse,
        MessageKind::ObstacleData,
        MessageKind::QaFindings,
        MessageKind::Navigation,
        MessageKind::Velocity,
    ];

    pub const fn type_id(self) -> u16 {
        self as u16
    }

    pub fn from_type_id(type_id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_id() == type_id)
    }

    pub const fn name(self) -> &'static str {
        match self {
            MessageKind::Image => "image",
            MessageKind::PointCloudSoup => "point_cloud_soup",
            MessageKind::CameraParameterRequest => "camera_parameter_request",
            MessageKind::CameraParameterResponse => "camera_parameter_response",
            MessageKind::PointCloud => "point_cloud",
            MessageKind::PointCloudRgb => "point_cloud_rgb",
            MessageKind::SetBoolRequest => "set_bool_request",
            MessageKind::SetBoolResponse => "set_bool_response",
            MessageKind::ObstacleData => "obstacle_data",
            MessageKind::QaFindings => "qa_findings",
            MessageKind::Navigation => "navigation",
            MessageKind::Velocity => "velocity",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let header = Header::new(0x0102, 3, 4);
        let wire = header.encode();
        assert_eq!(wire, [0x02, 0x01, 3, 4]);
        assert_eq!(Header::decode(&wire).unwrap(), header);
    }

    #[test]
    fn decode_short_buffer() {
        let err = Header::decode(&[0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                needed: 4,
                available: 3
            }
        );
    }

    #[test]
    fn peek_at_offset() {
        let mut buf = vec![0xFF; 3];
        buf.extend_from_slice(&Header::current(MessageKind::ObstacleData).encode());
        let header = peek_header(&buf, 3).unwrap();
        assert_eq!(header.kind(), Some(MessageKind::ObstacleData));
        assert!(peek_header(&buf, 4).is_err());
        assert!(peek_header(&buf, 100).is_err());
    }

    #[test]
    fn compatibility_requires_every_field_by_default() {
        let expected = Header::new(4, 0, 1);
        assert!(expected.is_compatible(&expected, VersionPolicy::Exact));
        assert!(!Header::new(5, 0, 1).is_compatible(&expected, VersionPolicy::Exact));
        assert!(!Header::new(4, 1, 1).is_compatible(&expected, VersionPolicy::Exact));
        assert!(!Header::new(4, 0, 2).is_compatible(&expected, VersionPolicy::Exact));
    }

    #[test]
    fn same_major_relaxes_only_the_minor() {
        let expected = Header::new(4, 0, 1);
        assert!(Header::new(4, 0, 7).is_compatible(&expected, VersionPolicy::SameMajor));
        assert!(!Header::new(4, 1, 1).is_compatible(&expected, VersionPolicy::SameMajor));
        assert!(!Header::new(8, 0, 1).is_compatible(&expected, VersionPolicy::SameMajor));
    }

    #[test]
    fn type_ids_are_unique_and_resolvable() {
        let ids: HashSet<u16> = MessageKind::ALL.iter().map(|k| k.type_id()).collect();
        assert_eq!(ids.len(), MessageKind::ALL.len());
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_type_id(kind.type_id()), Some(kind));
        }
        assert_eq!(MessageKind::from_type_id(12), None);
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<&str> = MessageKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), MessageKind::ALL.len());
    }

    #[test]
    fn current_header_uses_protocol_version() {
        let header = Header::current(MessageKind::Velocity);
        assert_eq!(header, Header::new(11, MAJOR_VERSION, MINOR_VERSION));
        assert_eq!(header.to_string(), "type 11 v0.1");
    }
}
