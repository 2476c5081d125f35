//! Session lifecycle: submit, wait for provisioning, connect.

use tracing::info;

use crate::console::Console;
use crate::credentials::{Credential, CredentialGate, Credentials};
use crate::error::{Result, VclError};
use crate::launcher::{LaunchOutcome, Launcher};
use crate::model::{
    ActionResult, ConnectionInfo, ConnectionInfoResult, Image, SessionRequest, SessionSummary,
    SubmitResult,
};
use crate::poller::{PollState, StatusPoller};
use crate::retry::{Clock, RetryPolicy};
use crate::rpc::{self, RemoteService};
use crate::selector::{choose_method, pick};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub endpoint: String,
    /// Address reported to the service when asking for connection data.
    /// Discovered from the route to `endpoint` when unset.
    pub caller_address: Option<String>,
    pub polling: RetryPolicy,
}

impl ControllerSettings {
    fn caller_address(&self) -> Result<String> {
        match &self.caller_address {
            Some(address) => Ok(address.clone()),
            None => rpc::caller_address(&self.endpoint),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub session_id: String,
    /// `None` when the caller skipped waiting.
    pub state: Option<PollState>,
    /// `None` when the caller skipped connecting.
    pub launch: Option<LaunchOutcome>,
}

pub struct SessionController<'a> {
    service: &'a dyn RemoteService,
    gate: CredentialGate<'a>,
    console: &'a dyn Console,
    clock: &'a dyn Clock,
    settings: ControllerSettings,
}

impl<'a> SessionController<'a> {
    pub fn new(
        service: &'a dyn RemoteService,
        credentials: &'a dyn Credentials,
        console: &'a dyn Console,
        clock: &'a dyn Clock,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            service,
            gate: CredentialGate::new(credentials),
            console,
            clock,
            settings,
        }
    }

    fn poller(&self) -> StatusPoller<'_> {
        StatusPoller::new(self.service, self.console, self.clock, self.settings.polling)
    }

    pub fn provision(&self, request: &SessionRequest) -> Result<String> {
        let auth = self.gate.require()?;
        self.submit(&auth, request)
    }

    fn submit(&self, auth: &Credential, request: &SessionRequest) -> Result<String> {
        info!(
            image_id = %request.image_id,
            start = %request.start,
            length = request.length_minutes,
            "submitting session request"
        );
        match self.service.submit(auth, request)? {
            SubmitResult::Accepted { session_id } => {
                info!(session_id = %session_id, "session request accepted");
                Ok(session_id)
            }
            SubmitResult::Rejected { reason } => Err(VclError::SubmissionRejected(reason)),
        }
    }

    pub fn wait_until_ready(&self, session_id: &str) -> Result<PollState> {
        let auth = self.gate.require()?;
        self.poller().wait_until_ready(&auth, session_id)
    }

    pub fn connection_info(&self, session_id: &str) -> Result<ConnectionInfo> {
        let auth = self.gate.require()?;
        self.fetch_connection_info(&auth, session_id)
    }

    fn fetch_connection_info(
        &self,
        auth: &Credential,
        session_id: &str,
    ) -> Result<ConnectionInfo> {
        let caller_address = self.settings.caller_address()?;
        match self
            .service
            .connection_info(auth, session_id, &caller_address)?
        {
            ConnectionInfoResult::Ready(info) => Ok(info),
            ConnectionInfoResult::NotReady => Err(VclError::NotReady(session_id.to_string())),
        }
    }

    pub fn connect(&self, session_id: &str, launcher: &Launcher<'_>) -> Result<LaunchOutcome> {
        let auth = self.gate.require()?;
        self.connect_with(&auth, session_id, launcher)
    }

    fn connect_with(
        &self,
        auth: &Credential,
        session_id: &str,
        launcher: &Launcher<'_>,
    ) -> Result<LaunchOutcome> {
        let info = self.fetch_connection_info(auth, session_id)?;
        let method =
            choose_method(&info.methods, self.console).map_err(|source| VclError::ConnectFailed {
                details: info.details(),
                source: Box::new(source),
            })?;

        self.console.info(&format!(
            "Connecting to {} via {}...",
            info.ip_address, method.description
        ));
        launcher.launch(session_id, &info, method, auth)
    }

    /// Submit, then optionally wait for provisioning and connect. Connecting
    /// requires waiting.
    pub fn request_session(
        &self,
        request: &SessionRequest,
        wait: bool,
        launcher: Option<&Launcher<'_>>,
    ) -> Result<RequestOutcome> {
        let auth = self.gate.require()?;
        let session_id = self.submit(&auth, request)?;
        self.console.success("Request is starting now.");

        let mut outcome = RequestOutcome {
            session_id,
            state: None,
            launch: None,
        };
        if !wait {
            return Ok(outcome);
        }

        outcome.state = Some(self.poller().wait_until_ready(&auth, &outcome.session_id)?);
        self.console.success("Request is ready!");

        if let Some(launcher) = launcher {
            outcome.launch = Some(self.connect_with(&auth, &outcome.session_id, launcher)?);
        }
        Ok(outcome)
    }

    pub fn delete(&self, session_id: &str) -> Result<()> {
        let auth = self.gate.require()?;
        match self.service.delete(&auth, session_id)? {
            ActionResult::Done => {
                info!(session_id, "session deleted");
                Ok(())
            }
            ActionResult::Rejected { reason } => Err(VclError::Rejected {
                operation: "delete",
                reason,
            }),
        }
    }

    pub fn extend(&self, session_id: &str, minutes: u32) -> Result<()> {
        let auth = self.gate.require()?;
        match self.service.extend(&auth, session_id, minutes)? {
            ActionResult::Done => {
                info!(session_id, minutes, "session extended");
                Ok(())
            }
            ActionResult::Rejected { reason } => Err(VclError::Rejected {
                operation: "extend",
                reason,
            }),
        }
    }

    pub fn sessions(&self) -> Result<Vec<SessionSummary>> {
        let auth = self.gate.require()?;
        self.service.list_sessions(&auth)
    }

    pub fn active_sessions(&self) -> Result<Vec<SessionSummary>> {
        let active: Vec<SessionSummary> = self
            .sessions()?
            .into_iter()
            .filter(|s| s.is_active())
            .collect();
        if active.is_empty() {
            return Err(VclError::NoActiveSessions);
        }
        Ok(active)
    }

    /// Picks the only active session, or asks which one when there are several.
    pub fn choose_active_session(&self) -> Result<String> {
        let active = self.active_sessions()?;
        if let [only] = active.as_slice() {
            return Ok(only.session_id.clone());
        }

        self.console.info("Active sessions:");
        for (idx, session) in active.iter().enumerate() {
            self.console.info(&format!(
                "  {}. {} (id: {})",
                idx + 1,
                session.image_name,
                session.session_id
            ));
        }
        let selection = self.console.prompt_int("Enter a number")?;
        Ok(pick(&active, selection)?.session_id.clone())
    }

    pub fn images(&self) -> Result<Vec<Image>> {
        let auth = self.gate.require()?;
        self.service.list_images(&auth)
    }

    pub fn validate_credentials(&self) -> Result<()> {
        let auth = self.gate.require()?;
        if self.service.ping(&auth)? {
            Ok(())
        } else {
            Err(VclError::Rejected {
                operation: "credential check",
                reason: "Endpoint did not accept credentials.".to_string(),
            })
        }
    }
}
