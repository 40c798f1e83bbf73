mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use stereobus_msgs::CodecConfig;

use crate::cmd::{Command, Context, VersionPolicyArg};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "stereobus", version, about = "Stereo-camera bus message tool")]
struct Cli {
    /// Output format. Default: table on a terminal, JSON otherwise.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "STEREOBUS_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    /// Which protocol minor versions to accept when decoding.
    #[arg(long, value_name = "POLICY", default_value = "exact", global = true)]
    version_policy: VersionPolicyArg,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let ctx = Context {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        codec: CodecConfig {
            version_policy: cli.version_policy.into(),
            ..CodecConfig::default()
        },
    };

    match cmd::run(cli.command, ctx) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
