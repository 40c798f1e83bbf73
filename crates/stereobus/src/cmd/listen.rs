use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use stereobus_transport::{Pattern, Subscriber, Topic, TransportError};
use tracing::{debug, info, warn};

use crate::cmd::{decode_at, parse_duration, resolve_topic, Context, ListenArgs};
use crate::exit::{transport_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_records, Record};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, ctx: Context) -> CliResult<i32> {
    let topic = resolve_topic(&args.topic)?;
    if topic.pattern != Pattern::PubSub {
        return Err(CliError::new(
            USAGE,
            format!("{topic} is a request/reply topic; use `send` to talk to it"),
        ));
    }
    let idle_timeout = args.timeout.as_deref().map(parse_duration).transpose()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let Some(subscriber) = connect(topic, &args.dir, &running, idle_timeout)? else {
        return Ok(SUCCESS);
    };
    subscriber_loop(&subscriber, topic, &args, ctx, &running, idle_timeout)
}

fn subscriber_loop(
    subscriber: &Subscriber,
    topic: Topic,
    args: &ListenArgs,
    ctx: Context,
    running: &AtomicBool,
    idle_timeout: Option<Duration>,
) -> CliResult<i32> {
    let mut printed = 0usize;
    let mut last_message = Instant::now();

    while running.load(Ordering::SeqCst) {
        let payload = subscriber
            .recv_timeout(POLL_INTERVAL)
            .map_err(|err| transport_error("receive failed", err))?;

        if let Some(payload) = payload {
            last_message = Instant::now();
            match decode_at(&payload, 0, &ctx.codec) {
                Ok((message, summary, _)) => {
                    if topic.kind.is_some_and(|kind| kind != message.kind()) {
                        warn!(%topic, kind = %message.kind(), "unexpected message kind on topic");
                    }
                    print_records(&[Record::received(topic.name, summary)], &payload, ctx.format);
                    printed += 1;
                    if args.count.is_some_and(|count| printed >= count) {
                        return Ok(SUCCESS);
                    }
                }
                Err(err) => warn!(%topic, error = %err, "skipping undecodable message"),
            }
        }

        if let Some(timeout) = idle_timeout {
            if last_message.elapsed() >= timeout {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no message on {topic} within {timeout:?}"),
                ));
            }
        }
    }
    Ok(SUCCESS)
}

/// Keep trying until the publisher appears. `None` means ctrl-c came first.
fn connect(
    topic: Topic,
    dir: &Path,
    running: &AtomicBool,
    timeout: Option<Duration>,
) -> CliResult<Option<Subscriber>> {
    let started = Instant::now();
    let mut announced = false;
    while running.load(Ordering::SeqCst) {
        match Subscriber::connect(topic, dir) {
            Ok(subscriber) => {
                info!(%topic, "subscribed");
                return Ok(Some(subscriber));
            }
            Err(err @ TransportError::Connect { .. }) => {
                if let Some(limit) = timeout.filter(|limit| started.elapsed() >= *limit) {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("no publisher on {topic} within {limit:?}: {err}"),
                    ));
                }
                if !announced {
                    info!(%topic, "waiting for publisher");
                    announced = true;
                }
                debug!(error = %err, "publisher not reachable yet");
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(err) => return Err(transport_error("subscribe failed", err)),
        }
    }
    Ok(None)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
