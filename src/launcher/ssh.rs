//! Interactive SSH transport with reachability retries.

use thiserror::Error;
use tracing::{info, warn};

use super::{LaunchOutcome, Platform};
use crate::console::Console;
use crate::error::{Result, VclError};
use crate::retry::{Clock, RetryError, RetryPolicy, retry};

pub struct ShellTarget<'a> {
    pub host: &'a str,
    pub user: &'a str,
    pub secret: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Connection refused, no route to host, network unreachable. The VM's
    /// network stack may lag behind its ready status.
    #[error("{0}")]
    Unreachable(String),
    #[error("{0}")]
    AuthRejected(String),
    #[error("{0}")]
    Other(String),
}

/// Opens an interactive shell and returns once the user leaves it.
pub trait ShellConnector {
    fn open_shell(&self, target: &ShellTarget<'_>) -> std::result::Result<(), ConnectError>;
}

pub struct SshHandler<'a> {
    connector: &'a dyn ShellConnector,
    clock: &'a dyn Clock,
    console: &'a dyn Console,
    policy: RetryPolicy,
}

impl<'a> SshHandler<'a> {
    pub fn new(
        connector: &'a dyn ShellConnector,
        clock: &'a dyn Clock,
        console: &'a dyn Console,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            connector,
            clock,
            console,
            policy,
        }
    }

    /// Authenticates with the locally stored secret, never the session's
    /// returned password.
    pub fn connect(
        &self,
        platform: &Platform,
        host: &str,
        user: &str,
        secret: &str,
    ) -> Result<LaunchOutcome> {
        if !platform.has_posix_shell() {
            return Err(VclError::UnsupportedPlatform {
                transport: "SSH",
                platform: platform.to_string(),
            });
        }

        if !self.console.confirm("Ready to start SSH connection?")? {
            return Ok(LaunchOutcome::Declined);
        }

        self.console.info("Checking if the session is reachable...");
        let target = ShellTarget { host, user, secret };
        let outcome = retry(
            &self.policy,
            self.clock,
            |e| matches!(e, ConnectError::Unreachable(_)),
            |attempt| {
                info!(host, user, attempt, "opening ssh shell");
                self.connector.open_shell(&target).inspect_err(|e| {
                    warn!(host, attempt, error = %e, "ssh connection failed");
                })
            },
        );

        match outcome {
            Ok(()) => Ok(LaunchOutcome::Connected),
            Err(RetryError::Exhausted { attempts, last }) => Err(VclError::ConnectionUnavailable {
                host: host.to_string(),
                attempts,
                last_error: last.to_string(),
            }),
            Err(RetryError::Aborted(ConnectError::AuthRejected(message))) => {
                Err(VclError::AuthenticationFailed {
                    user: user.to_string(),
                    host: host.to_string(),
                    message,
                })
            }
            Err(RetryError::Aborted(e)) => Err(VclError::Shell(e.to_string())),
        }
    }
}
