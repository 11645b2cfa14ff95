use std::fmt;

use pymrs_endpoint::{ConfigurationError, EndpointError};
use pymrs_frame::FrameError;

// Exit codes follow sysexits where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const CONFIG: i32 = 78;
pub const INTERNAL: i32 = 125;

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

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::InvalidKind(_) | FrameError::InvalidInstanceId(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::Malformed { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn configuration_error(context: &str, err: ConfigurationError) -> CliError {
    match err {
        ConfigurationError::InvalidUrl { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(CONFIG, format!("{context}: {other}")),
    }
}

pub fn endpoint_error(context: &str, err: EndpointError) -> CliError {
    match err {
        EndpointError::Configuration(err) => configuration_error(context, err),
        EndpointError::Frame(err) => frame_error(context, err),
        EndpointError::ReservedKind(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn json_error(context: &str, err: serde_json::Error) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}
