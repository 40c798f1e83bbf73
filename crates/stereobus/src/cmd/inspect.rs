use std::fs;

use bytes::Bytes;
use tracing::debug;

use crate::cmd::{decode_at, Context, InspectArgs};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::{print_records, Record};

pub fn run(args: InspectArgs, ctx: Context) -> CliResult<i32> {
    for path in &args.files {
        let source = path.display().to_string();
        let payload = Bytes::from(
            fs::read(path).map_err(|err| io_error(&format!("failed reading {source}"), err))?,
        );

        let mut records = Vec::new();
        let mut offset = 0;
        loop {
            let (_, summary, end) = match decode_at(&payload, offset, &ctx.codec) {
                Ok(decoded) => decoded,
                Err(err) => {
                    // keep what decoded before the bad message
                    if !records.is_empty() {
                        print_records(&records, &payload[..offset], ctx.format);
                    }
                    return Err(err);
                }
            };
            records.push(Record::from_file(&source, offset, summary));
            offset = end;
            if !args.all || offset >= payload.len() {
                break;
            }
        }
        if offset < payload.len() {
            debug!(%source, trailing = payload.len() - offset, "ignoring bytes after the message");
        }
        print_records(&records, &payload, ctx.format);
    }
    Ok(SUCCESS)
}
