use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shown in place of a password the service did not return.
pub const PASSWORD_PLACEHOLDER: &str = "(your campus password)";

/// Session states that can still be connected to.
pub const ACTIVE_STATES: &[&str] = &["reserved", "inuse"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTime {
    Now,
    /// Unix timestamp in seconds.
    At(i64),
}

impl FromStr for StartTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("now") {
            return Ok(StartTime::Now);
        }
        s.parse::<i64>()
            .map(StartTime::At)
            .map_err(|_| format!("expected 'now' or a unix timestamp, got '{}'", s))
    }
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartTime::Now => f.write_str("now"),
            StartTime::At(ts) => write!(f, "{}", ts),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub image_id: String,
    pub start: StartTime,
    pub length_minutes: u32,
    pub inactivity_timeout: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    Loading { minutes_left: Option<u32> },
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMethod {
    Ssh,
    RemoteDesktop,
    Unsupported(String),
}

impl ConnectionMethod {
    /// Maps a server-supplied method description onto a known transport.
    pub fn from_description(description: &str) -> Self {
        let lower = description.trim().to_lowercase();
        if lower.starts_with("ssh") {
            ConnectionMethod::Ssh
        } else if lower.starts_with("remote desktop") || lower.starts_with("rdp") {
            ConnectionMethod::RemoteDesktop
        } else {
            ConnectionMethod::Unsupported(description.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry {
    pub key: String,
    pub description: String,
    pub kind: ConnectionMethod,
}

impl MethodEntry {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            key: key.into(),
            kind: ConnectionMethod::from_description(&description),
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub ip_address: String,
    pub username: String,
    /// `None` means the user's own campus credential applies.
    pub password: Option<String>,
    pub methods: Vec<MethodEntry>,
}

impl ConnectionInfo {
    pub fn details(&self) -> ConnectionDetails {
        ConnectionDetails {
            ip_address: self.ip_address.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// What a human needs to connect to a session by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDetails {
    pub ip_address: String,
    pub username: String,
    pub password: Option<String>,
}

impl ConnectionDetails {
    pub fn password_display(&self) -> &str {
        self.password.as_deref().unwrap_or(PASSWORD_PLACEHOLDER)
    }
}

impl fmt::Display for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connection details:")?;
        writeln!(f, " - IP address: {}", self.ip_address)?;
        writeln!(f, " - Username: {}", self.username)?;
        write!(f, " - Password: {}", self.password_display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub image_id: String,
    pub image_name: String,
    pub state: String,
    pub os_type: String,
    pub os: String,
}

impl SessionSummary {
    pub fn is_active(&self) -> bool {
        ACTIVE_STATES.contains(&self.state.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    Accepted { session_id: String },
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionInfoResult {
    Ready(ConnectionInfo),
    NotReady,
}

/// Outcome of calls that only acknowledge, such as delete and extend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Done,
    Rejected { reason: String },
}
