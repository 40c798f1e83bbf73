use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("stereobus {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: stereobus");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "protocol: {}.{}",
        stereobus_msgs::MAJOR_VERSION,
        stereobus_msgs::MINOR_VERSION
    );
    println!(
        "build_target: {}",
        option_env!("STEREOBUS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "frame_max_payload: {}",
        stereobus_transport::frame::DEFAULT_MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
