#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vcl_client::console::Console;
use vcl_client::credentials::{Credential, Credentials};
use vcl_client::launcher::{ConnectError, ShellConnector, ShellTarget, ViewerLauncher};
use vcl_client::model::{
    ActionResult, ConnectionInfo, ConnectionInfoResult, Image, MethodEntry, SessionRequest,
    SessionStatus, SessionSummary, SubmitResult,
};
use vcl_client::retry::{Clock, RetryPolicy};
use vcl_client::rpc::RemoteService;
use vcl_client::{ControllerSettings, Result, VclError};

pub fn credential() -> Credential {
    Credential {
        username: "jdoe".to_string(),
        secret: "hunter2".to_string(),
    }
}

pub fn settings() -> ControllerSettings {
    ControllerSettings {
        endpoint: "https://vcl.example.edu/index.php?mode=xmlrpccall".to_string(),
        caller_address: Some("192.0.2.10".to_string()),
        polling: RetryPolicy::new(Duration::from_secs(15), 240),
    }
}

pub fn ssh_info(ip: &str) -> ConnectionInfo {
    ConnectionInfo {
        ip_address: ip.to_string(),
        username: "jdoe".to_string(),
        password: None,
        methods: vec![MethodEntry::new("1", "ssh")],
    }
}

pub fn session(id: &str, name: &str, state: &str) -> SessionSummary {
    SessionSummary {
        session_id: id.to_string(),
        image_id: "7".to_string(),
        image_name: name.to_string(),
        state: state.to_string(),
        os_type: "linux".to_string(),
        os: "Ubuntu 22.04".to_string(),
    }
}

pub struct Stored(pub Option<Credential>);

impl Credentials for Stored {
    fn get(&self) -> Option<Credential> {
        self.0.clone()
    }
}

/// Every call the fake service received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Submit(SessionRequest),
    Status(String),
    ConnectionInfo { session_id: String, caller: String },
    Delete(String),
    Extend(String, u32),
    ListSessions,
    ListImages,
    Ping,
}

#[derive(Default)]
pub struct FakeService {
    pub submit: Option<SubmitResult>,
    pub statuses: RefCell<VecDeque<SessionStatus>>,
    pub info: Option<ConnectionInfo>,
    pub action: Option<ActionResult>,
    pub sessions: Vec<SessionSummary>,
    pub images: Vec<Image>,
    pub ping: bool,
    pub calls: RefCell<Vec<Call>>,
    pub seen_users: RefCell<Vec<String>>,
}

impl FakeService {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Status(_)))
            .count()
    }

    fn record(&self, auth: &Credential, call: Call) {
        self.seen_users.borrow_mut().push(auth.username.clone());
        self.calls.borrow_mut().push(call);
    }

    fn action(&self) -> ActionResult {
        self.action.clone().unwrap_or(ActionResult::Done)
    }
}

impl RemoteService for FakeService {
    fn submit(&self, auth: &Credential, request: &SessionRequest) -> Result<SubmitResult> {
        self.record(auth, Call::Submit(request.clone()));
        self.submit
            .clone()
            .ok_or_else(|| VclError::Config("no submit scripted".to_string()))
    }

    fn status(&self, auth: &Credential, session_id: &str) -> Result<SessionStatus> {
        self.record(auth, Call::Status(session_id.to_string()));
        Ok(self
            .statuses
            .borrow_mut()
            .pop_front()
            .unwrap_or(SessionStatus::Ready))
    }

    fn connection_info(
        &self,
        auth: &Credential,
        session_id: &str,
        caller_address: &str,
    ) -> Result<ConnectionInfoResult> {
        self.record(
            auth,
            Call::ConnectionInfo {
                session_id: session_id.to_string(),
                caller: caller_address.to_string(),
            },
        );
        Ok(match &self.info {
            Some(info) => ConnectionInfoResult::Ready(info.clone()),
            None => ConnectionInfoResult::NotReady,
        })
    }

    fn delete(&self, auth: &Credential, session_id: &str) -> Result<ActionResult> {
        self.record(auth, Call::Delete(session_id.to_string()));
        Ok(self.action())
    }

    fn extend(&self, auth: &Credential, session_id: &str, minutes: u32) -> Result<ActionResult> {
        self.record(auth, Call::Extend(session_id.to_string(), minutes));
        Ok(self.action())
    }

    fn list_sessions(&self, auth: &Credential) -> Result<Vec<SessionSummary>> {
        self.record(auth, Call::ListSessions);
        Ok(self.sessions.clone())
    }

    fn list_images(&self, auth: &Credential) -> Result<Vec<Image>> {
        self.record(auth, Call::ListImages);
        Ok(self.images.clone())
    }

    fn ping(&self, auth: &Credential) -> Result<bool> {
        self.record(auth, Call::Ping);
        Ok(self.ping)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Progress(String),
    Info(String),
    Success(String),
    Confirm(String),
    Prompt(String),
}

#[derive(Default)]
pub struct FakeConsole {
    pub lines: RefCell<Vec<Line>>,
    pub confirms: RefCell<VecDeque<bool>>,
    pub numbers: RefCell<VecDeque<i64>>,
}

impl FakeConsole {
    pub fn answering(numbers: &[i64], confirms: &[bool]) -> Self {
        Self {
            lines: RefCell::default(),
            confirms: RefCell::new(confirms.iter().copied().collect()),
            numbers: RefCell::new(numbers.iter().copied().collect()),
        }
    }

    pub fn lines(&self) -> Vec<Line> {
        self.lines.borrow().clone()
    }

    pub fn progress(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter_map(|l| match l {
                Line::Progress(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Console for FakeConsole {
    fn progress(&self, message: &str) {
        self.lines.borrow_mut().push(Line::Progress(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.lines.borrow_mut().push(Line::Info(message.to_string()));
    }

    fn success(&self, message: &str) {
        self.lines.borrow_mut().push(Line::Success(message.to_string()));
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.lines.borrow_mut().push(Line::Confirm(prompt.to_string()));
        Ok(self.confirms.borrow_mut().pop_front().unwrap_or(true))
    }

    fn prompt_int(&self, prompt: &str) -> Result<i64> {
        self.lines.borrow_mut().push(Line::Prompt(prompt.to_string()));
        self.numbers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| VclError::Prompt("no scripted answer".to_string()))
    }
}

#[derive(Default)]
pub struct FakeClock {
    pub sleeps: RefCell<Vec<Duration>>,
}

impl Clock for FakeClock {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub failures: RefCell<VecDeque<ConnectError>>,
    pub targets: RefCell<Vec<(String, String, String)>>,
}

impl FakeConnector {
    pub fn failing(failures: Vec<ConnectError>) -> Self {
        Self {
            failures: RefCell::new(failures.into()),
            targets: RefCell::default(),
        }
    }
}

impl ShellConnector for FakeConnector {
    fn open_shell(&self, target: &ShellTarget<'_>) -> std::result::Result<(), ConnectError> {
        self.targets.borrow_mut().push((
            target.host.to_string(),
            target.user.to_string(),
            target.secret.to_string(),
        ));
        match self.failures.borrow_mut().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeViewer {
    pub opened: RefCell<Vec<PathBuf>>,
}

impl ViewerLauncher for FakeViewer {
    fn open(&self, profile: &Path) -> Result<()> {
        self.opened.borrow_mut().push(profile.to_path_buf());
        Ok(())
    }
}
