//! Fixed-layout, versioned binary messages for a stereo-camera sensor bus.
//!
//! Every message starts with a 4-byte [`Header`] (type id + protocol version)
//! followed by a little-endian body whose layout is fixed per [`MessageKind`]:
//! - [`Image`]: 64-byte header region, raw pixels, opaque extension bytes
//! - [`PointCloud`], [`PointCloudRgb`], [`ObstacleData`], [`QaFindings`]:
//!   a fixed header region followed by packed elements
//! - [`PointCloudSoup`]: calibration scalars plus two embedded images
//! - [`Navigation`], [`Velocity`] and the request/response pairs: flat records
//!
//! Encoding is two-phase: ask [`Message::required_size`], allocate, then
//! [`Message::encode`] into the buffer. Decoding takes a shared [`bytes::Bytes`]
//! buffer and returns the message together with the offset just past it.
//! Large numeric payloads are not copied; they alias the input buffer.
//!
//! Every decode checks the header, bounds every length field against
//! [`CodecConfig`], and verifies the buffer is long enough before slicing it.

#[cfg(not(target_endian = "little"))]
compile_error!("stereobus-msgs exposes packed little-endian arrays as native slices and requires a little-endian target");

pub mod any;
pub mod array;
pub mod config;
pub mod error;
pub mod extension;
pub mod header;
pub mod image;
pub mod message;
pub mod obstacle;
pub mod pixel;
pub mod point_cloud;
pub mod qa;
pub mod soup;
pub mod telemetry;
pub mod wire;

pub use any::AnyMessage;
pub use array::PodArray;
pub use config::{CodecConfig, DEFAULT_MAX_ARRAY_ELEMENTS, DEFAULT_MAX_IMAGE_PIXELS};
pub use error::{CodecError, ErrorKind, Result};
pub use extension::{Extrinsics, OccupancyMetadata};
pub use header::{
    peek_header, Header, MessageKind, VersionPolicy, HEADER_SIZE, MAJOR_VERSION, MINOR_VERSION,
};
pub use image::{ColorConversion, Image, IMAGE_HEADER_SIZE};
pub use message::Message;
pub use obstacle::{BoundingBox, Obstacle, ObstacleData, Vec2, OBSTACLE_HEADER_SIZE};
pub use pixel::{Element, ElementKind, PixelType};
pub use point_cloud::{Color, Point, PointCloud, PointCloudRgb, POINT_CLOUD_HEADER_SIZE};
pub use qa::{Finding, QaFindings, Severity, FINDING_SIZE, QA_HEADER_SIZE};
pub use soup::{PointCloudSoup, SOUP_FIXED_SIZE};
pub use telemetry::{
    CameraParameterRequest, CameraParameterResponse, Gps, Imu, Navigation, Odometry,
    SetBoolRequest, SetBoolResponse, Velocity,
};
