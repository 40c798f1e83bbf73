use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use stereobus_transport::{FrameConfig, Pattern, Publisher, Requester, Topic};
use tracing::info;

use crate::cmd::{decode_at, parse_duration, resolve_topic, Context, SendArgs};
use crate::exit::{
    io_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT,
};
use crate::output::{print_records, MessageSummary, Record};

pub fn run(args: SendArgs, ctx: Context) -> CliResult<i32> {
    let topic = resolve_topic(&args.topic)?;
    let linger = parse_duration(&args.linger)?;
    let source = args.file.display().to_string();
    let payload = Bytes::from(
        fs::read(&args.file).map_err(|err| io_error(&format!("failed reading {source}"), err))?,
    );
    let summary = check_payload(topic, &payload, ctx, args.force)?;

    match topic.pattern {
        Pattern::PubSub => {
            publish(topic, &args.dir, payload.clone(), linger)?;
            if let Some(summary) = summary {
                print_records(&[Record::from_file(&source, 0, summary)], &payload, ctx.format);
            }
        }
        Pattern::RequestReply => request(topic, &args.dir, &payload, linger, ctx)?,
    }
    Ok(SUCCESS)
}

/// Make sure the file holds exactly one message of the kind `topic` carries.
fn check_payload(
    topic: Topic,
    payload: &Bytes,
    ctx: Context,
    force: bool,
) -> CliResult<Option<MessageSummary>> {
    let Some(expected) = topic.kind else {
        return Ok(None);
    };
    let (message, summary, end) = decode_at(payload, 0, &ctx.codec)?;
    if end != payload.len() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{} trailing bytes after the message", payload.len() - end),
        ));
    }
    if message.kind() != expected && !force {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "file holds a {} message but {topic} carries {expected} (use --force to send anyway)",
                message.kind()
            ),
        ));
    }
    Ok(Some(summary))
}

fn publish(topic: Topic, dir: &Path, payload: Bytes, linger: Duration) -> CliResult<()> {
    fs::create_dir_all(dir)
        .map_err(|err| io_error(&format!("failed creating {}", dir.display()), err))?;
    let publisher =
        Publisher::bind(topic, dir).map_err(|err| transport_error("bind failed", err))?;

    let deadline = Instant::now() + linger;
    while publisher.subscriber_count() == 0 {
        if Instant::now() >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                format!("no subscriber connected to {topic} within {linger:?}"),
            ));
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    publisher
        .send(payload)
        .map_err(|err| transport_error("send failed", err))?;
    if !publisher.flush(deadline.saturating_duration_since(Instant::now())) {
        return Err(CliError::new(
            TIMEOUT,
            format!("message on {topic} not delivered within {linger:?}"),
        ));
    }
    info!(%topic, subscribers = publisher.subscriber_count(), "published");
    Ok(())
}

fn request(topic: Topic, dir: &Path, payload: &[u8], linger: Duration, ctx: Context) -> CliResult<()> {
    let config = FrameConfig {
        read_timeout: Some(linger),
        write_timeout: Some(linger),
        ..FrameConfig::default()
    };
    let mut requester = Requester::connect_with_config(topic, dir, config)
        .map_err(|err| transport_error("connect failed", err))?;
    let reply = requester
        .request_raw(payload)
        .map_err(|err| transport_error("request failed", err))?;

    if reply.is_empty() {
        info!(%topic, "empty reply");
        return Ok(());
    }
    let (_, summary, _) = decode_at(&reply, 0, &ctx.codec)?;
    print_records(&[Record::received(topic.name, summary)], &reply, ctx.format);
    Ok(())
}
