//! Keep-newest publish/subscribe.
//!
//! Both ends hold at most one undelivered message: a publisher that outpaces
//! its sending thread replaces the queued buffer, and a subscriber that
//! outpaces nobody simply finds the newest frame when it next asks. Slow
//! consumers see fresh data instead of a growing backlog.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::Bytes;
use stereobus_msgs::{CodecConfig, Message};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use crate::stream::BusStream;
use crate::topic::Topic;
use crate::uds::UnixDomainSocket;

/// Lock a mutex whose data stays consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Applied to every subscriber connection. The write timeout bounds how
    /// long one stalled subscriber can hold up the others.
    pub frame: FrameConfig,
    pub socket_mode: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig {
                write_timeout: Some(Duration::from_secs(1)),
                ..FrameConfig::default()
            },
            socket_mode: UnixDomainSocket::DEFAULT_SOCKET_MODE,
        }
    }
}

#[derive(Default)]
struct Outbox {
    pending: Option<Bytes>,
    in_flight: bool,
}

struct PublisherShared {
    port: u16,
    running: AtomicBool,
    outbox: Mutex<Outbox>,
    wake: Condvar,
    subscribers: Mutex<Vec<FrameWriter<BusStream>>>,
    sent: AtomicU64,
    replaced: AtomicU64,
}

/// Publishes one topic to every connected subscriber.
///
/// Subscribers are accepted and served on background threads, so `send`
/// never blocks on the network. Both threads stop and are joined on drop.
pub struct Publisher {
    topic: Topic,
    path: PathBuf,
    max_payload: usize,
    shared: Arc<PublisherShared>,
    accept_thread: Option<JoinHandle<()>>,
    send_thread: Option<JoinHandle<()>>,
}

impl Publisher {
    /// Bind `topic`'s socket under `dir`.
    pub fn bind(topic: Topic, dir: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_config(topic, dir, PublisherConfig::default())
    }

    pub fn bind_with_config(
        topic: Topic,
        dir: impl AsRef<Path>,
        config: PublisherConfig,
    ) -> Result<Self> {
        let path = topic.socket_path(dir);
        let socket = UnixDomainSocket::bind_with_mode(&path, config.socket_mode)?;
        let shared = Arc::new(PublisherShared {
            port: topic.port,
            running: AtomicBool::new(true),
            outbox: Mutex::new(Outbox::default()),
            wake: Condvar::new(),
            subscribers: Mutex::new(Vec::new()),
            sent: AtomicU64::new(0),
            replaced: AtomicU64::new(0),
        });

        let accept_thread = std::thread::Builder::new()
            .name(format!("sb-accept-{}", topic.port))
            .spawn({
                let shared = Arc::clone(&shared);
                let frame = config.frame.clone();
                move || accept_loop(socket, &shared, frame)
            })?;
        let send_thread = std::thread::Builder::new()
            .name(format!("sb-send-{}", topic.port))
            .spawn({
                let shared = Arc::clone(&shared);
                move || send_loop(&shared)
            })?;

        info!(%topic, ?path, "publisher ready");
        Ok(Self {
            topic,
            path,
            max_payload: config.frame.max_payload_size,
            shared,
            accept_thread: Some(accept_thread),
            send_thread: Some(send_thread),
        })
    }

    /// Queue `payload` for every subscriber, replacing any queued payload that
    /// has not started sending yet.
    pub fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        if !self.shared.running.load(Ordering::SeqCst) {
            return Err(TransportError::Shutdown);
        }
        let payload = payload.into();
        if payload.len() > self.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            }
            .into());
        }

        let mut outbox = lock(&self.shared.outbox);
        if outbox.pending.replace(payload).is_some() {
            self.shared.replaced.fetch_add(1, Ordering::Relaxed);
            trace!(topic = self.topic.name, "replaced unsent message");
        }
        self.shared.wake.notify_all();
        Ok(())
    }

    /// Encode `message` and [`send`](Self::send) it.
    pub fn publish<M: Message>(&self, message: &M) -> Result<()> {
        self.send(message.to_bytes()?)
    }

    /// Wait until the queued payload, if any, has been written to every
    /// subscriber. Returns `false` if `timeout` elapsed first.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut outbox = lock(&self.shared.outbox);
        while outbox.pending.is_some() || outbox.in_flight {
            let now = Instant::now();
            if now >= deadline || !self.shared.running.load(Ordering::SeqCst) {
                return false;
            }
            outbox = self
                .shared
                .wake
                .wait_timeout(outbox, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.subscribers).len()
    }

    /// Payloads handed to the sending thread.
    pub fn sent(&self) -> u64 {
        self.shared.sent.load(Ordering::Relaxed)
    }

    /// Payloads dropped because a newer one arrived before they were sent.
    pub fn replaced(&self) -> u64 {
        self.shared.replaced.load(Ordering::Relaxed)
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        {
            let _outbox = lock(&self.shared.outbox);
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.send_thread.take() {
            let _ = handle.join();
        }
        lock(&self.shared.subscribers).clear();

        // the accept thread is parked in accept(); a throwaway connection
        // lets it observe the shutdown flag
        let woke = UnixDomainSocket::connect(&self.path).is_ok();
        if let Some(handle) = self.accept_thread.take() {
            if woke {
                let _ = handle.join();
            } else {
                warn!(path = ?self.path, "could not wake accept thread, detaching it");
            }
        }
        debug!(topic = self.topic.name, "publisher stopped");
    }
}

fn accept_loop(socket: UnixDomainSocket, shared: &PublisherShared, frame: FrameConfig) {
    while shared.running.load(Ordering::SeqCst) {
        let stream = match socket.accept() {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "accept failed");
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        };
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }
        match FrameWriter::for_stream(stream, frame.clone()) {
            Ok(writer) => {
                let mut subscribers = lock(&shared.subscribers);
                subscribers.push(writer);
                debug!(port = shared.port, count = subscribers.len(), "subscriber joined");
            }
            Err(err) => warn!(error = %err, "could not configure subscriber stream"),
        }
    }
}

fn send_loop(shared: &PublisherShared) {
    loop {
        let payload = {
            let mut outbox = lock(&shared.outbox);
            loop {
                if !shared.running.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(payload) = outbox.pending.take() {
                    outbox.in_flight = true;
                    break payload;
                }
                outbox = shared
                    .wake
                    .wait(outbox)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        {
            let mut subscribers = lock(&shared.subscribers);
            subscribers.retain_mut(|writer| match writer.send(shared.port, &payload) {
                Ok(()) => true,
                Err(err) => {
                    warn!(port = shared.port, error = %err, "dropping subscriber");
                    false
                }
            });
        }
        shared.sent.fetch_add(1, Ordering::Relaxed);

        let mut outbox = lock(&shared.outbox);
        outbox.in_flight = false;
        shared.wake.notify_all();
    }
}

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub frame: FrameConfig,
    /// How long to wait between attempts to reach a publisher that went
    /// away. `None` ends the subscription when the publisher disconnects.
    pub reconnect_interval: Option<Duration>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            reconnect_interval: Some(Duration::from_millis(100)),
        }
    }
}

#[derive(Default)]
struct Inbox {
    latest: Option<Bytes>,
    closed: bool,
}

struct SubscriberShared {
    topic: Topic,
    running: AtomicBool,
    inbox: Mutex<Inbox>,
    ready: Condvar,
    stream: Mutex<Option<BusStream>>,
    received: AtomicU64,
    overwritten: AtomicU64,
    rejected: AtomicU64,
}

/// Receives the newest message published on one topic.
pub struct Subscriber {
    shared: Arc<SubscriberShared>,
    codec: CodecConfig,
    reader_thread: Option<JoinHandle<()>>,
}

impl Subscriber {
    /// Connect to `topic`'s publisher under `dir`.
    ///
    /// Fails if no publisher is listening yet; once connected, a publisher
    /// restart is ridden out by reconnecting in the background.
    pub fn connect(topic: Topic, dir: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(topic, dir, SubscriberConfig::default())
    }

    pub fn connect_with_config(
        topic: Topic,
        dir: impl AsRef<Path>,
        config: SubscriberConfig,
    ) -> Result<Self> {
        let path = topic.socket_path(dir);
        let stream = UnixDomainSocket::connect(&path)?;
        let shared = Arc::new(SubscriberShared {
            topic,
            running: AtomicBool::new(true),
            inbox: Mutex::new(Inbox::default()),
            ready: Condvar::new(),
            stream: Mutex::new(Some(stream.try_clone()?)),
            received: AtomicU64::new(0),
            overwritten: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        });
        let reader = FrameReader::for_stream(stream, config.frame.clone())?;

        let reader_thread = std::thread::Builder::new()
            .name(format!("sb-recv-{}", topic.port))
            .spawn({
                let shared = Arc::clone(&shared);
                move || receive_loop(&shared, reader, &path, &config)
            })?;

        Ok(Self {
            shared,
            codec: CodecConfig::default(),
            reader_thread: Some(reader_thread),
        })
    }

    /// Decode received messages with `codec` instead of the defaults.
    pub fn with_codec_config(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    /// Block until a message arrives and return the newest one.
    pub fn recv(&self) -> Result<Bytes> {
        let mut inbox = lock(&self.shared.inbox);
        loop {
            if let Some(payload) = inbox.latest.take() {
                return Ok(payload);
            }
            self.check_open(&inbox)?;
            inbox = self
                .shared
                .ready
                .wait(inbox)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`recv`](Self::recv), giving up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Bytes>> {
        let deadline = Instant::now() + timeout;
        let mut inbox = lock(&self.shared.inbox);
        loop {
            if let Some(payload) = inbox.latest.take() {
                return Ok(Some(payload));
            }
            self.check_open(&inbox)?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            inbox = self
                .shared
                .ready
                .wait_timeout(inbox, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// The newest message, if one arrived since the last receive.
    pub fn try_recv(&self) -> Result<Option<Bytes>> {
        let mut inbox = lock(&self.shared.inbox);
        match inbox.latest.take() {
            Some(payload) => Ok(Some(payload)),
            None => self.check_open(&inbox).map(|()| None),
        }
    }

    /// Receive the newest message and decode it as `M`.
    pub fn recv_message<M: Message>(&self) -> Result<M> {
        let payload = self.recv()?;
        let (message, _) = M::decode_with(&payload, 0, &self.codec)?;
        Ok(message)
    }

    fn check_open(&self, inbox: &Inbox) -> Result<()> {
        if !self.shared.running.load(Ordering::SeqCst) {
            return Err(TransportError::Shutdown);
        }
        if inbox.closed {
            return Err(FrameError::ConnectionClosed.into());
        }
        Ok(())
    }

    pub fn topic(&self) -> Topic {
        self.shared.topic
    }

    /// Frames accepted into the inbox.
    pub fn received(&self) -> u64 {
        self.shared.received.load(Ordering::Relaxed)
    }

    /// Frames replaced by a newer one before anyone read them.
    pub fn overwritten(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }

    /// Frames discarded because they were tagged with another topic.
    pub fn rejected(&self) -> u64 {
        self.shared.rejected.load(Ordering::Relaxed)
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(stream) = lock(&self.shared.stream).take() {
            let _ = stream.shutdown();
        }
        {
            let _inbox = lock(&self.shared.inbox);
            self.shared.ready.notify_all();
        }
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
    }
}

fn receive_loop(
    shared: &SubscriberShared,
    reader: FrameReader<BusStream>,
    path: &Path,
    config: &SubscriberConfig,
) {
    let topic = shared.topic;
    let mut reader = Some(reader);
    while shared.running.load(Ordering::SeqCst) {
        let Some(current) = reader.as_mut() else {
            match config.reconnect_interval {
                Some(interval) => reader = reconnect(shared, path, interval, &config.frame),
                None => break,
            }
            continue;
        };

        match current.read_frame() {
            Ok(frame) if frame.topic != topic.port => {
                shared.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    topic = topic.name,
                    expected = topic.port,
                    found = frame.topic,
                    "dropping frame from another topic"
                );
            }
            Ok(frame) => {
                let mut inbox = lock(&shared.inbox);
                if inbox.latest.replace(frame.payload).is_some() {
                    shared.overwritten.fetch_add(1, Ordering::Relaxed);
                }
                shared.received.fetch_add(1, Ordering::Relaxed);
                shared.ready.notify_all();
            }
            Err(FrameError::Timeout) => {}
            Err(err) => {
                if shared.running.load(Ordering::SeqCst) {
                    debug!(topic = topic.name, error = %err, "lost publisher");
                }
                reader = None;
            }
        }
    }

    let mut inbox = lock(&shared.inbox);
    inbox.closed = true;
    shared.ready.notify_all();
}

fn reconnect(
    shared: &SubscriberShared,
    path: &Path,
    interval: Duration,
    frame: &FrameConfig,
) -> Option<FrameReader<BusStream>> {
    {
        // sleep on the condvar so a drop interrupts the wait
        let inbox = lock(&shared.inbox);
        let _ = shared.ready.wait_timeout(inbox, interval);
    }
    if !shared.running.load(Ordering::SeqCst) {
        return None;
    }

    let stream = UnixDomainSocket::connect(path).ok()?;
    let clone = stream.try_clone().ok()?;
    let reader = FrameReader::for_stream(stream, frame.clone()).ok()?;

    let mut current = lock(&shared.stream);
    if !shared.running.load(Ordering::SeqCst) {
        return None;
    }
    *current = Some(clone);
    info!(topic = shared.topic.name, "reconnected to publisher");
    Some(reader)
}
