use tracing::{debug, info};

use crate::console::Console;
use crate::credentials::Credential;
use crate::error::{Result, VclError};
use crate::model::SessionStatus;
use crate::retry::{Clock, RetryError, RetryPolicy, retry};
use crate::rpc::RemoteService;

/// A failed poll is reported as an error carrying the reason, so it has no
/// state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Ready,
}

enum TickError {
    StillLoading,
    Fatal(VclError),
}

fn minute_spelling(minutes: u32) -> &'static str {
    if minutes == 1 { "minute" } else { "minutes" }
}

pub(crate) fn loading_message(minutes_left: Option<u32>) -> String {
    match minutes_left {
        Some(n) => format!("Checking status... {} {} left.", n, minute_spelling(n)),
        None => "Checking status... Still loading.".to_string(),
    }
}

/// Blocks until a session is ready, reporting progress while it loads.
pub struct StatusPoller<'a> {
    service: &'a dyn RemoteService,
    console: &'a dyn Console,
    clock: &'a dyn Clock,
    policy: RetryPolicy,
}

impl<'a> StatusPoller<'a> {
    pub fn new(
        service: &'a dyn RemoteService,
        console: &'a dyn Console,
        clock: &'a dyn Clock,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            console,
            clock,
            policy,
        }
    }

    /// One status query. Returns `Polling` or `Ready`; a failure comes back
    /// as an error carrying the reason.
    pub fn tick(&self, auth: &Credential, session_id: &str) -> Result<PollState> {
        match self.service.status(auth, session_id)? {
            SessionStatus::Ready => Ok(PollState::Ready),
            SessionStatus::Loading { minutes_left } => {
                self.console.progress(&loading_message(minutes_left));
                Ok(PollState::Polling)
            }
            SessionStatus::Other(raw) => {
                Err(VclError::PollingFailed(format!("Received status '{}'.", raw)))
            }
        }
    }

    pub fn wait_until_ready(&self, auth: &Credential, session_id: &str) -> Result<PollState> {
        let outcome = retry(
            &self.policy,
            self.clock,
            |e| matches!(e, TickError::StillLoading),
            |check| {
                debug!(session_id, check, "checking session status");
                match self.tick(auth, session_id) {
                    Ok(PollState::Ready) => Ok(()),
                    Ok(_) => Err(TickError::StillLoading),
                    Err(e) => Err(TickError::Fatal(e)),
                }
            },
        );

        match outcome {
            Ok(()) => {
                info!(session_id, "session is ready");
                Ok(PollState::Ready)
            }
            Err(RetryError::Exhausted { attempts, .. }) => Err(VclError::PollingFailed(format!(
                "Session {} was still loading after {} status checks.",
                session_id, attempts
            ))),
            Err(RetryError::Aborted(TickError::Fatal(e))) => Err(e),
            Err(RetryError::Aborted(TickError::StillLoading)) => {
                unreachable!("loading ticks are always retried")
            }
        }
    }
}
