//! Message codec and local bus for a stereo-camera sensor pipeline.
//!
//! - [`msgs`]: fixed-layout, versioned binary messages (images, point clouds,
//!   obstacles, QA findings, navigation and settings RPCs)
//! - [`transport`]: topic sockets, framing, keep-newest pub/sub and
//!   request/reply
//!
//! The `stereobus` binary (feature `cli`) inspects message files, listens on
//! topics and publishes files to them.

pub mod msgs {
    pub use stereobus_msgs::*;
}

pub mod transport {
    pub use stereobus_transport::*;
}
