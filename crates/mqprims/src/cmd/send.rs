use std::fs;

use mqprims_transfer::{Context, Message, MessageQueue};

use crate::cmd::{call_context, parse_timeout, SendArgs};
use crate::exit::{io_error, transfer_error, CliResult, SUCCESS};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(args.timeout.as_deref())?;
    let message = Message::new(args.priority, resolve_payload(&args)?);

    let mq = MessageQueue::open(&args.queue.name, &args.queue.config())
        .map_err(|err| transfer_error("open failed", err))?;
    let name = mq.handle().name().to_string();

    let ctx = call_context(&Context::background(), timeout);
    let sent = mq.send_message(&ctx, &message);
    let closed = mq.close();

    sent.map_err(|err| transfer_error("send failed", err))?;
    closed.map_err(|err| transfer_error("close failed", err))?;

    tracing::debug!(queue = %name, size = message.len(), "message sent");
    print_sent(&name, message.len(), message.priority, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
