//! Request/reply on a topic socket.
//!
//! Used for the device's settings topics (exposure, gain, recording): the
//! client sends one request frame and blocks for exactly one reply frame.

use std::path::Path;

use bytes::Bytes;
use stereobus_msgs::{CodecConfig, Message};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use crate::stream::BusStream;
use crate::topic::Topic;
use crate::uds::UnixDomainSocket;

struct Connection {
    reader: FrameReader<BusStream>,
    writer: FrameWriter<BusStream>,
}

impl Connection {
    fn open(stream: BusStream, config: &FrameConfig) -> Result<Self> {
        let writer = FrameWriter::for_stream(stream.try_clone()?, config.clone())?;
        let reader = FrameReader::for_stream(stream, config.clone())?;
        Ok(Self { reader, writer })
    }

    fn read_payload(&mut self, topic: Topic) -> Result<Bytes> {
        let frame = self.reader.read_frame()?;
        if frame.topic != topic.port {
            // a request/reply stream carries exactly one topic
            warn!(%topic, found = frame.topic, "frame for another topic");
            return Err(TransportError::UnknownTopic(frame.topic.to_string()));
        }
        Ok(frame.payload)
    }
}

/// Client side: sends requests and waits for replies.
pub struct Requester {
    topic: Topic,
    conn: Connection,
    codec: CodecConfig,
}

impl Requester {
    pub fn connect(topic: Topic, dir: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(topic, dir, FrameConfig::default())
    }

    pub fn connect_with_config(
        topic: Topic,
        dir: impl AsRef<Path>,
        config: FrameConfig,
    ) -> Result<Self> {
        let stream = UnixDomainSocket::connect(topic.socket_path(dir))?;
        Ok(Self {
            topic,
            conn: Connection::open(stream, &config)?,
            codec: CodecConfig::default(),
        })
    }

    /// Send raw request bytes and return the raw reply.
    pub fn request_raw(&mut self, payload: &[u8]) -> Result<Bytes> {
        self.conn.writer.send(self.topic.port, payload)?;
        self.conn.read_payload(self.topic)
    }

    /// Encode `request`, send it, and decode the reply as `Resp`.
    pub fn request<Req: Message, Resp: Message>(&mut self, request: &Req) -> Result<Resp> {
        let reply = self.request_raw(&request.to_bytes()?)?;
        let (response, _) = Resp::decode_with(&reply, 0, &self.codec)?;
        Ok(response)
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// Server side: answers one request at a time, one client at a time.
pub struct Responder {
    topic: Topic,
    socket: UnixDomainSocket,
    config: FrameConfig,
    codec: CodecConfig,
    conn: Option<Connection>,
}

impl Responder {
    pub fn bind(topic: Topic, dir: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_config(topic, dir, FrameConfig::default())
    }

    pub fn bind_with_config(
        topic: Topic,
        dir: impl AsRef<Path>,
        config: FrameConfig,
    ) -> Result<Self> {
        Ok(Self {
            topic,
            socket: UnixDomainSocket::bind(topic.socket_path(dir))?,
            config,
            codec: CodecConfig::default(),
            conn: None,
        })
    }

    /// Wait for the next request and answer it with `handler`.
    ///
    /// Clients that hang up are replaced by the next one to connect. If the
    /// request cannot be read or `handler` fails, the client is disconnected
    /// so it is not left waiting for a reply.
    pub fn serve_raw<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnOnce(Bytes) -> Result<Bytes>,
    {
        let request = loop {
            let conn = match self.conn.as_mut() {
                Some(conn) => conn,
                None => {
                    let stream = self.socket.accept()?;
                    self.conn.insert(Connection::open(stream, &self.config)?)
                }
            };
            match conn.read_payload(self.topic) {
                Ok(request) => break request,
                Err(TransportError::Frame(FrameError::ConnectionClosed)) => {
                    debug!(topic = self.topic.name, "client hung up");
                    self.conn = None;
                }
                Err(err) => {
                    self.conn = None;
                    return Err(err);
                }
            }
        };

        let reply = handler(request).and_then(|reply| match self.conn.as_mut() {
            Some(conn) => Ok(conn.writer.send(self.topic.port, &reply)?),
            None => Err(TransportError::Shutdown),
        });
        if reply.is_err() {
            self.conn = None;
        }
        reply
    }

    /// Typed [`serve_raw`](Self::serve_raw).
    pub fn serve<Req, Resp, F>(&mut self, handler: F) -> Result<()>
    where
        Req: Message,
        Resp: Message,
        F: FnOnce(Req) -> Resp,
    {
        let codec = self.codec;
        self.serve_raw(|payload| {
            let (request, _) = Req::decode_with(&payload, 0, &codec)?;
            Ok(handler(request).to_bytes()?)
        })
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use stereobus_msgs::{
        CameraParameterRequest, CameraParameterResponse, SetBoolRequest, SetBoolResponse,
    };

    use super::*;
    use crate::topic;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sb-rpc-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn camera_parameter_round_trip() {
        let dir = scratch_dir("exposure");
        let mut responder = Responder::bind(topic::CAMERA_EXPOSURE, &dir).unwrap();

        let client_dir = dir.clone();
        let client = std::thread::spawn(move || {
            let mut requester = Requester::connect(topic::CAMERA_EXPOSURE, &client_dir).unwrap();
            let ok: CameraParameterResponse = requester
                .request(&CameraParameterRequest { value: 8.5 })
                .unwrap();
            let rejected: CameraParameterResponse = requester
                .request(&CameraParameterRequest { value: -1.0 })
                .unwrap();
            (ok.success, rejected.success)
        });

        for _ in 0..2 {
            responder
                .serve(|request: CameraParameterRequest| CameraParameterResponse {
                    success: request.value > 0.0,
                })
                .unwrap();
        }
        assert_eq!(client.join().unwrap(), (true, false));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn next_client_is_served_after_a_hang_up() {
        let dir = scratch_dir("hangup");
        let mut responder = Responder::bind(topic::RECORDING, &dir).unwrap();

        let client_dir = dir.clone();
        let clients = std::thread::spawn(move || {
            let first = Requester::connect(topic::RECORDING, &client_dir).unwrap();
            drop(first);
            let mut second = Requester::connect(topic::RECORDING, &client_dir).unwrap();
            let reply: SetBoolResponse = second.request(&SetBoolRequest { value: true }).unwrap();
            reply.success
        });

        responder
            .serve(|request: SetBoolRequest| SetBoolResponse {
                success: request.value,
            })
            .unwrap();
        assert!(clients.join().unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn undecodable_request_disconnects_the_client() {
        let dir = scratch_dir("garbage");
        let mut responder = Responder::bind(topic::CAMERA_GAIN, &dir).unwrap();

        let client_dir = dir.clone();
        let client = std::thread::spawn(move || {
            let mut requester = Requester::connect(topic::CAMERA_GAIN, &client_dir).unwrap();
            requester.request_raw(b"not a message").unwrap_err()
        });

        let err = responder
            .serve(|_: CameraParameterRequest| CameraParameterResponse { success: true })
            .unwrap_err();
        assert!(matches!(err, TransportError::Codec(_)));
        assert!(client.join().unwrap().is_disconnect());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn raw_wait_handshake() {
        let dir = scratch_dir("wait");
        let mut responder = Responder::bind(topic::WAIT, &dir).unwrap();

        let client_dir = dir.clone();
        let client = std::thread::spawn(move || {
            let mut requester = Requester::connect(topic::WAIT, &client_dir).unwrap();
            requester.request_raw(&77u64.to_le_bytes()).unwrap()
        });

        responder
            .serve_raw(|request| {
                assert_eq!(request.as_ref(), &77u64.to_le_bytes());
                Ok(Bytes::new())
            })
            .unwrap();
        assert!(client.join().unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
