use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use mqprims_transfer::{Context, MessageQueue};

use crate::cmd::{call_context, parse_timeout, ReceiveArgs};
use crate::exit::{transfer_error, CliError, CliResult, CANCELLED, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

enum Event {
    Finished(CliResult<i32>),
    Interrupted,
}

/// Receives on a worker thread so an interrupt ends the command even while
/// the worker is parked in a kernel wait that the signal does not break.
pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }
    let timeout = parse_timeout(args.timeout.as_deref())?;

    let (events, rx) = mpsc::channel();
    install_ctrlc_handler(events.clone())?;

    let mq = MessageQueue::open(&args.queue.name, &args.queue.config())
        .map_err(|err| transfer_error("open failed", err))?;

    let base = Context::background();
    let worker_ctx = base.clone();
    thread::Builder::new()
        .name("mqprims-receive".to_string())
        .spawn(move || {
            let result = receive_loop(mq, &worker_ctx, args.count, timeout, format);
            let _ = events.send(Event::Finished(result));
        })
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start receiver: {err}")))?;

    match rx.recv() {
        Ok(Event::Finished(result)) => result,
        Ok(Event::Interrupted) => {
            base.cancel();
            Err(CliError::new(CANCELLED, "receive cancelled"))
        }
        Err(_) => Err(CliError::new(INTERNAL, "receiver exited without a result")),
    }
}

fn receive_loop(
    mq: MessageQueue,
    base: &Context,
    count: usize,
    timeout: Option<Duration>,
    format: OutputFormat,
) -> CliResult<i32> {
    let name = mq.handle().name().to_string();

    let mut result = Ok(SUCCESS);
    for _ in 0..count {
        match mq.receive(&call_context(base, timeout)) {
            Ok(msg) => print_message(&name, &msg, msg.priority(), format),
            Err(err) => {
                result = Err(transfer_error("receive failed", err));
                break;
            }
        }
    }

    let closed = mq.close();
    let code = result?;
    closed.map_err(|err| transfer_error("close failed", err))?;
    Ok(code)
}

fn install_ctrlc_handler(events: mpsc::Sender<Event>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        tracing::debug!("interrupt received, cancelling");
        let _ = events.send(Event::Interrupted);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
