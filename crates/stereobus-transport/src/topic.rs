//! Well-known bus topics.
//!
//! Each topic has a fixed port number. On a Unix socket bus the port is the
//! identity carried in every frame, and the topic name picks the socket file.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use stereobus_msgs::MessageKind;

use crate::error::{Result, TransportError};

/// How peers talk on a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// One publisher, any number of keep-newest subscribers.
    PubSub,
    /// A client sends a request and waits for the reply.
    RequestReply,
}

impl Pattern {
    pub const fn as_str(self) -> &'static str {
        match self {
            Pattern::PubSub => "pub/sub",
            Pattern::RequestReply => "req/rep",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic {
    pub name: &'static str,
    pub port: u16,
    /// Message kind published (or requested) on this topic; `None` for raw
    /// payloads that are not codec messages.
    pub kind: Option<MessageKind>,
    pub pattern: Pattern,
}

impl Topic {
    const fn publish(name: &'static str, port: u16, kind: MessageKind) -> Self {
        Self {
            name,
            port,
            kind: Some(kind),
            pattern: Pattern::PubSub,
        }
    }

    const fn request(name: &'static str, port: u16, kind: Option<MessageKind>) -> Self {
        Self {
            name,
            port,
            kind,
            pattern: Pattern::RequestReply,
        }
    }

    const fn image(name: &'static str, port: u16) -> Self {
        Self::publish(name, port, MessageKind::Image)
    }

    /// Socket file for this topic under `dir`, e.g. `nodar-left-image_raw.sock`.
    pub fn socket_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref()
            .join(format!("{}.sock", self.name.replace('/', "-")))
    }

    pub fn is_image(&self) -> bool {
        IMAGE_TOPICS.contains(self)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.port)
    }
}

pub const LEFT_RAW: Topic = Topic::image("nodar/left/image_raw", 9800);
pub const RIGHT_RAW: Topic = Topic::image("nodar/right/image_raw", 9801);
pub const LEFT_RECT: Topic = Topic::image("nodar/left/image_rect", 9802);
pub const RIGHT_RECT: Topic = Topic::image("nodar/right/image_rect", 9803);
pub const DISPARITY: Topic = Topic::image("nodar/disparity", 9804);
pub const COLOR_BLENDED_DEPTH: Topic = Topic::image("nodar/color_blended_depth/image_raw", 9805);
pub const TOPBOT_RAW: Topic = Topic::image("nodar/topbot_raw", 9813);
pub const TOPBOT_RECT: Topic = Topic::image("nodar/topbot_rect", 9823);
pub const OCCUPANCY_MAP: Topic = Topic::image("nodar/occupancy_map", 9900);

pub const SOUP: Topic = Topic::publish("nodar/point_cloud_soup", 9806, MessageKind::PointCloudSoup);
pub const CAMERA_EXPOSURE: Topic = Topic::request(
    "nodar/set_exposure",
    9807,
    Some(MessageKind::CameraParameterRequest),
);
pub const CAMERA_GAIN: Topic = Topic::request(
    "nodar/set_gain",
    9808,
    Some(MessageKind::CameraParameterRequest),
);
pub const POINT_CLOUD: Topic = Topic::publish("nodar/point_cloud", 9809, MessageKind::PointCloud);
pub const POINT_CLOUD_RGB: Topic =
    Topic::publish("nodar/point_cloud_rgb", 9810, MessageKind::PointCloudRgb);
pub const RECORDING: Topic =
    Topic::request("nodar/recording", 9811, Some(MessageKind::SetBoolRequest));
pub const OBSTACLE: Topic = Topic::publish("nodar/obstacle", 9812, MessageKind::ObstacleData);
/// Frame-pacing handshake; requests are a bare little-endian `u64` frame id.
pub const WAIT: Topic = Topic::request("nodar/wait", 9814, None);
pub const QA_FINDINGS: Topic = Topic::publish("nodar/qa_findings", 9822, MessageKind::QaFindings);
pub const VELOCITY: Topic = Topic::publish("nodar/velocity", 9824, MessageKind::Velocity);

pub const IMAGE_TOPICS: [Topic; 9] = [
    LEFT_RAW,
    RIGHT_RAW,
    LEFT_RECT,
    RIGHT_RECT,
    DISPARITY,
    COLOR_BLENDED_DEPTH,
    TOPBOT_RAW,
    TOPBOT_RECT,
    OCCUPANCY_MAP,
];

/// Every well-known topic, images first.
pub const ALL_TOPICS: [Topic; 19] = [
    LEFT_RAW,
    RIGHT_RAW,
    LEFT_RECT,
    RIGHT_RECT,
    DISPARITY,
    COLOR_BLENDED_DEPTH,
    TOPBOT_RAW,
    TOPBOT_RECT,
    OCCUPANCY_MAP,
    SOUP,
    CAMERA_EXPOSURE,
    CAMERA_GAIN,
    POINT_CLOUD,
    POINT_CLOUD_RGB,
    RECORDING,
    OBSTACLE,
    WAIT,
    QA_FINDINGS,
    VELOCITY,
];

/// Ports that user-defined topics must not reuse.
pub fn reserved_ports() -> BTreeSet<u16> {
    ALL_TOPICS.iter().map(|topic| topic.port).collect()
}

pub fn topic_by_port(port: u16) -> Option<Topic> {
    ALL_TOPICS.iter().copied().find(|topic| topic.port == port)
}

/// Resolve a topic from its full name, its name without the `nodar/`
/// prefix, or its port number.
pub fn lookup_topic(query: &str) -> Result<Topic> {
    let query = query.trim();
    let found = match query.parse::<u16>() {
        Ok(port) => topic_by_port(port),
        Err(_) => ALL_TOPICS.iter().copied().find(|topic| {
            topic.name == query || topic.name.strip_prefix("nodar/") == Some(query)
        }),
    };
    found.ok_or_else(|| TransportError::UnknownTopic(query.to_string()))
}
