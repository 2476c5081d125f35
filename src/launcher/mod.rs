//! Dispatches a chosen connection method to its transport handler.

mod profile;
mod pty;
mod rdp;
mod ssh;

use std::fmt;

pub use profile::{FsProfileStore, ProfileStore};
pub use pty::PtyShellConnector;
pub use rdp::{RemminaViewer, RemoteDesktopHandler, ViewerLauncher, remmina_profile};
pub use ssh::{ConnectError, ShellConnector, ShellTarget, SshHandler};

use crate::credentials::Credential;
use crate::error::{Result, VclError};
use crate::model::{ConnectionInfo, ConnectionMethod, MethodEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other(String),
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            other => Platform::Other(other.to_string()),
        }
    }

    pub fn has_posix_shell(&self) -> bool {
        !matches!(self, Platform::Windows)
    }

    /// Only Linux has a known viewer (Remmina).
    pub fn supports_remote_desktop(&self) -> bool {
        matches!(self, Platform::Linux)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => f.write_str("Linux"),
            Platform::MacOs => f.write_str("macOS"),
            Platform::Windows => f.write_str("Windows"),
            Platform::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Connected,
    /// The user declined a confirmation prompt.
    Declined,
}

pub struct Launcher<'a> {
    platform: Platform,
    ssh: SshHandler<'a>,
    remote_desktop: RemoteDesktopHandler<'a>,
}

impl<'a> Launcher<'a> {
    pub fn new(
        platform: Platform,
        ssh: SshHandler<'a>,
        remote_desktop: RemoteDesktopHandler<'a>,
    ) -> Self {
        Self {
            platform,
            ssh,
            remote_desktop,
        }
    }

    /// Any handler failure comes back as [`VclError::ConnectFailed`] with the
    /// session's connection details attached.
    pub fn launch(
        &self,
        session_id: &str,
        info: &ConnectionInfo,
        method: &MethodEntry,
        credential: &Credential,
    ) -> Result<LaunchOutcome> {
        let result = match &method.kind {
            ConnectionMethod::Ssh => self
                .ssh
                .connect(&self.platform, &info.ip_address, &info.username, &credential.secret),
            ConnectionMethod::RemoteDesktop => {
                self.remote_desktop
                    .launch(&self.platform, session_id, &info.details())
            }
            ConnectionMethod::Unsupported(description) => {
                Err(VclError::UnsupportedConnectionMethod(description.clone()))
            }
        };

        result.map_err(|source| VclError::ConnectFailed {
            details: info.details(),
            source: Box::new(source),
        })
    }
}
