use std::fmt;
use std::io;

use mqprims_queue::QueueError;
use mqprims_transfer::{ErrorClass, TransferError};

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const QUEUE_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const CANCELLED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn queue_error(context: &str, err: QueueError) -> CliError {
    if err.is_configuration() {
        return CliError::new(USAGE, format!("{context}: {err}"));
    }
    match err {
        QueueError::Open { source, .. }
        | QueueError::Unlink { source, .. }
        | QueueError::Close(source)
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            io_error(context, source)
        }
        QueueError::Unlink { source, .. } if source.kind() == io::ErrorKind::NotFound => {
            io_error(context, source)
        }
        other => CliError::new(QUEUE_ERROR, format!("{context}: {other}")),
    }
}

pub fn transfer_error(context: &str, err: TransferError) -> CliError {
    match err {
        TransferError::Queue(err) => queue_error(context, err),
        TransferError::Os(source) => io_error(context, source),
        err => {
            let code = match err.class() {
                ErrorClass::Configuration => DATA_INVALID,
                ErrorClass::QueueState => FAILURE,
                ErrorClass::Timeout => TIMEOUT,
                ErrorClass::Cancellation => CANCELLED,
                ErrorClass::Resource => QUEUE_ERROR,
            };
            CliError::new(code, format!("{context}: {err}"))
        }
    }
}
