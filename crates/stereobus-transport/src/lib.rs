//! Local transport for stereobus messages.
//!
//! Topics are Unix domain sockets in a shared directory, one socket file per
//! topic. Every message travels in a frame tagged with its topic port:
//! - [`Publisher`] / [`Subscriber`]: keep-newest fan-out for sensor streams
//! - [`Requester`] / [`Responder`]: one reply per request for device settings
//! - [`FrameReader`] / [`FrameWriter`]: the framing underneath, usable on any
//!   byte stream
//!
//! Payloads are opaque bytes here; the `publish`, `recv_message` and
//! `request` helpers encode and decode them with `stereobus-msgs`.

#[cfg(not(unix))]
compile_error!("stereobus-transport runs over Unix domain sockets and supports Unix targets only");

pub mod error;
pub mod frame;
pub mod pubsub;
pub mod rpc;
pub mod stream;
pub mod topic;
pub mod uds;

pub use error::{Result, TransportError};
pub use frame::{Frame, FrameConfig, FrameError, FrameReader, FrameWriter};
pub use topic::{lookup_topic, reserved_ports, Pattern, Topic, ALL_TOPICS, IMAGE_TOPICS};
pub use pubsub::{Publisher, PublisherConfig, Subscriber, SubscriberConfig};
pub use rpc::{Requester, Responder};
pub use stream::BusStream;
pub use uds::UnixDomainSocket;
