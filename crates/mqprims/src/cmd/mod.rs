use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use mqprims_queue::{QueueConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_MESSAGE_SIZE};
use mqprims_transfer::Context;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod receive;
pub mod send;
pub mod unlink;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single message.
    Send(SendArgs),
    /// Receive and print messages.
    Receive(ReceiveArgs),
    /// Remove a queue name from the system namespace.
    Unlink(UnlinkArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Unlink(args) => unlink::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct QueueArgs {
    /// Queue name (with or without the leading '/').
    pub name: String,
    /// Maximum queued messages when the queue is created.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub depth: usize,
    /// Maximum message size in bytes when the queue is created.
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub msg_size: usize,
}

impl QueueArgs {
    pub fn config(&self) -> QueueConfig {
        QueueConfig::new(self.depth, self.msg_size)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub queue: QueueArgs,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Message priority (higher is delivered first).
    #[arg(long, short = 'p', default_value = "0")]
    pub priority: u32,
    /// Wait up to this long for queue space (e.g. 5s, 500ms). Without it the
    /// send fails at once when the queue is full.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    #[command(flatten)]
    pub queue: QueueArgs,
    /// Exit after receiving N messages.
    #[arg(long, default_value = "1")]
    pub count: usize,
    /// Wait up to this long for each message (e.g. 5s, 500ms). Without it
    /// the receive fails at once when the queue is empty.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct UnlinkArgs {
    /// Queue name (with or without the leading '/').
    pub name: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Context for one call: immediate without a timeout, otherwise a fresh
/// deadline sharing `base`'s cancellation.
pub fn call_context(base: &Context, timeout: Option<Duration>) -> Context {
    base.child().deadline_at(timeout.map(Context::deadline_after))
}

pub fn parse_timeout(input: Option<&str>) -> CliResult<Option<Duration>> {
    input.map(parse_duration).transpose()
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
