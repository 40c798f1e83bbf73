use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use clap::{Args, Subcommand, ValueEnum};
use stereobus_msgs::{peek_header, AnyMessage, CodecConfig, VersionPolicy};
use stereobus_transport::{lookup_topic, Topic};

use crate::exit::{codec_error, transport_error, CliError, CliResult, USAGE};
use crate::output::{MessageSummary, OutputFormat};

pub mod inspect;
pub mod listen;
pub mod send;
pub mod topics;
pub mod version;

/// Socket directory used when neither `--dir` nor `STEREOBUS_DIR` is set.
pub const DEFAULT_DIR: &str = "/tmp/stereobus";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode message files and print a summary of each message.
    Inspect(InspectArgs),
    /// Subscribe to a topic and print every message received.
    Listen(ListenArgs),
    /// Publish a message file on a topic, or send it as a request.
    Send(SendArgs),
    /// List the well-known topics.
    Topics(TopicsArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub format: OutputFormat,
    pub codec: CodecConfig,
}

pub fn run(command: Command, ctx: Context) -> CliResult<i32> {
    match command {
        Command::Inspect(args) => inspect::run(args, ctx),
        Command::Listen(args) => listen::run(args, ctx),
        Command::Send(args) => send::run(args, ctx),
        Command::Topics(args) => topics::run(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum VersionPolicyArg {
    /// Only accept the exact protocol version.
    Exact,
    /// Accept any minor version of the current major.
    SameMajor,
}

impl From<VersionPolicyArg> for VersionPolicy {
    fn from(arg: VersionPolicyArg) -> Self {
        match arg {
            VersionPolicyArg::Exact => VersionPolicy::Exact,
            VersionPolicyArg::SameMajor => VersionPolicy::SameMajor,
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Files holding one encoded message each (or several, with --all).
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Keep decoding back-to-back messages until the end of each file.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Topic name (`nodar/disparity`, `disparity`) or port (`9804`).
    pub topic: String,
    /// Directory holding the topic sockets.
    #[arg(long, env = "STEREOBUS_DIR", default_value = DEFAULT_DIR)]
    pub dir: PathBuf,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit with TIMEOUT after this long without a message (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Topic name or port.
    pub topic: String,
    /// File holding the encoded message.
    #[arg(long, short = 'f')]
    pub file: PathBuf,
    /// Directory holding the topic sockets.
    #[arg(long, env = "STEREOBUS_DIR", default_value = DEFAULT_DIR)]
    pub dir: PathBuf,
    /// How long to wait for a subscriber to connect and for delivery.
    #[arg(long, default_value = "5s")]
    pub linger: String,
    /// Send even if the message kind does not match the topic.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Default)]
pub struct TopicsArgs {
    /// Directory used to show socket paths.
    #[arg(long, env = "STEREOBUS_DIR", default_value = DEFAULT_DIR)]
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn resolve_topic(query: &str) -> CliResult<Topic> {
    lookup_topic(query).map_err(|err| transport_error("topic lookup failed", err))
}

/// Decode the message at `offset`, returning its summary and the next offset.
pub fn decode_at(
    payload: &Bytes,
    offset: usize,
    codec: &CodecConfig,
) -> CliResult<(AnyMessage, MessageSummary, usize)> {
    let context = format!("decode failed at offset {offset}");
    let header = peek_header(payload, offset).map_err(|err| codec_error(&context, err))?;
    let (message, end) =
        AnyMessage::decode(payload, offset, codec).map_err(|err| codec_error(&context, err))?;
    let summary = MessageSummary::new(header, &message, end - offset);
    Ok((message, summary, end))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, from_unit): (&str, fn(u64) -> Duration) =
        if let Some(number) = input.strip_suffix("ms") {
            (number, Duration::from_millis)
        } else if let Some(number) = input.strip_suffix('s') {
            (number, Duration::from_secs)
        } else {
            (input, Duration::from_secs)
        };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input:?}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }
    Ok(from_unit(value))
}
