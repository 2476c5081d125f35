use thiserror::Error;

use crate::model::ConnectionDetails;

pub type Result<T> = std::result::Result<T, VclError>;

#[derive(Debug, Error)]
pub enum VclError {
    #[error("Credentials not found. Run `vcl config`.")]
    CredentialsMissing,

    #[error("session request rejected: {0}")]
    SubmissionRejected(String),

    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("{0}")]
    PollingFailed(String),

    #[error("session {0} is not ready for connections yet")]
    NotReady(String),

    #[error("the service offered no connection methods for this session")]
    NoConnectionMethods,

    #[error("Connection method '{0}' is unsupported.")]
    UnsupportedConnectionMethod(String),

    #[error("selection {selection} is out of range (expected 1-{count})")]
    InvalidSelection { selection: i64, count: usize },

    #[error("{host} did not become reachable after {attempts} attempts: {last_error}")]
    ConnectionUnavailable {
        host: String,
        attempts: u32,
        last_error: String,
    },

    #[error("authentication failed for {user}@{host}: {message}")]
    AuthenticationFailed {
        user: String,
        host: String,
        message: String,
    },

    #[error("{transport} connections aren't supported on {platform}")]
    UnsupportedPlatform {
        transport: &'static str,
        platform: String,
    },

    #[error("viewer '{0}' was not found on PATH")]
    ViewerNotFound(String),

    #[error("shell connection failed: {0}")]
    Shell(String),

    /// Automatic connection failed; `details` carries what a human needs to
    /// connect manually.
    #[error("{source}")]
    ConnectFailed {
        details: ConnectionDetails,
        #[source]
        source: Box<VclError>,
    },

    #[error("No matches found for '{0}'.")]
    NoMatchingImages(String),

    #[error("No active sessions to connect to.")]
    NoActiveSessions,

    #[error("malformed {call} response: {detail}")]
    MalformedResponse { call: &'static str, detail: String },

    #[error("{field} {value} is too large to send")]
    ValueTooLarge { field: &'static str, value: u32 },

    #[error("{method} call failed: {message}")]
    Transport {
        method: &'static str,
        message: String,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VclError {
    /// Connection details attached to a failed automatic connection, if any.
    pub fn connection_details(&self) -> Option<&ConnectionDetails> {
        match self {
            VclError::ConnectFailed { details, .. } => Some(details),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Process exit code for the outcome of a command.
pub fn exit_code<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(err) => err.exit_code(),
    }
}

impl From<dialoguer::Error> for VclError {
    fn from(err: dialoguer::Error) -> Self {
        VclError::Prompt(err.to_string())
    }
}
