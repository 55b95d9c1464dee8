use serde::Serialize;

use crate::cmd::UnlinkArgs;
use crate::exit::{queue_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct UnlinkOutput<'a> {
    schema_id: &'a str,
    queue: &'a str,
    removed: bool,
}

pub fn run(args: UnlinkArgs, format: OutputFormat) -> CliResult<i32> {
    mqprims_queue::unlink(&args.name).map_err(|err| queue_error("unlink failed", err))?;

    match format {
        OutputFormat::Json => {
            let out = UnlinkOutput {
                schema_id: "https://schemas.3leaps.dev/mqprims/cli/v1/queue-unlinked.schema.json",
                queue: &args.name,
                removed: true,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("removed {}", args.name),
        OutputFormat::Raw => {}
    }
    Ok(SUCCESS)
}
