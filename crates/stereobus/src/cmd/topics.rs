use stereobus_transport::ALL_TOPICS;

use crate::cmd::{Context, TopicsArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::print_topics;

pub fn run(args: TopicsArgs, ctx: Context) -> CliResult<i32> {
    print_topics(&ALL_TOPICS, &args.dir, ctx.format);
    Ok(SUCCESS)
}
