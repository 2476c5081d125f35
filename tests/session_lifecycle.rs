mod common;

use std::cell::RefCell;
use std::time::Duration;

use tempfile::TempDir;

use common::*;
use vcl_client::error::exit_code;
use vcl_client::launcher::{
    ConnectError, FsProfileStore, LaunchOutcome, Launcher, Platform, RemoteDesktopHandler,
    SshHandler,
};
use vcl_client::model::{
    ActionResult, ConnectionInfo, MethodEntry, SessionRequest, SessionStatus, StartTime,
    SubmitResult,
};
use vcl_client::poller::PollState;
use vcl_client::retry::RetryPolicy;
use vcl_client::{ControllerSettings, SessionController, VclError};

fn request() -> SessionRequest {
    SessionRequest {
        image_id: "7".to_string(),
        start: StartTime::Now,
        length_minutes: 480,
        inactivity_timeout: true,
    }
}

fn accepted(id: &str) -> Option<SubmitResult> {
    Some(SubmitResult::Accepted {
        session_id: id.to_string(),
    })
}

fn ssh_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_secs(2), 5)
}

#[test]
fn request_polls_then_connects_over_ssh() {
    let service = FakeService {
        submit: accepted("42"),
        statuses: RefCell::new(
            vec![
                SessionStatus::Loading {
                    minutes_left: Some(3),
                },
                SessionStatus::Ready,
            ]
            .into(),
        ),
        info: Some(ssh_info("10.0.0.5")),
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let connector = FakeConnector::default();
    let viewer = FakeViewer::default();
    let temp = TempDir::new().unwrap();
    let store = FsProfileStore::new(temp.path());
    let launcher = Launcher::new(
        Platform::Linux,
        SshHandler::new(&connector, &clock, &console, ssh_policy()),
        RemoteDesktopHandler::new(&store, &viewer, &console),
    );
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    let result = controller.request_session(&request(), true, Some(&launcher));

    assert_eq!(exit_code(&result), 0);
    let outcome = result.unwrap();
    assert_eq!(outcome.session_id, "42");
    assert_eq!(outcome.state, Some(PollState::Ready));
    assert_eq!(outcome.launch, Some(LaunchOutcome::Connected));

    assert_eq!(
        *connector.targets.borrow(),
        vec![("10.0.0.5".to_string(), "jdoe".to_string(), "hunter2".to_string())]
    );
    assert_eq!(*clock.sleeps.borrow(), vec![Duration::from_secs(15)]);
    assert_eq!(console.progress(), vec!["Checking status... 3 minutes left.".to_string()]);
    assert_eq!(
        service.calls(),
        vec![
            Call::Submit(request()),
            Call::Status("42".to_string()),
            Call::Status("42".to_string()),
            Call::ConnectionInfo {
                session_id: "42".to_string(),
                caller: "192.0.2.10".to_string(),
            },
        ]
    );
    assert!(service.seen_users.borrow().iter().all(|u| u == "jdoe"));
}

#[test]
fn rejected_submission_stops_before_polling() {
    let service = FakeService {
        submit: Some(SubmitResult::Rejected {
            reason: "full".to_string(),
        }),
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    let result = controller.request_session(&request(), true, None);

    assert_eq!(exit_code(&result), 1);
    assert!(matches!(result, Err(VclError::SubmissionRejected(ref r)) if r == "full"));
    assert_eq!(service.status_calls(), 0);
    assert!(clock.sleeps.borrow().is_empty());
}

#[test]
fn missing_credentials_make_no_remote_calls() {
    let service = FakeService {
        submit: accepted("42"),
        ..Default::default()
    };
    let stored = Stored(None);
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    assert!(matches!(controller.provision(&request()), Err(VclError::CredentialsMissing)));
    assert!(matches!(controller.sessions(), Err(VclError::CredentialsMissing)));
    assert!(matches!(controller.delete("42"), Err(VclError::CredentialsMissing)));
    assert!(service.calls().is_empty());
}

#[test]
fn missing_credentials_win_over_address_discovery() {
    let service = FakeService {
        info: Some(ssh_info("10.0.0.5")),
        ..Default::default()
    };
    let stored = Stored(None);
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let unroutable = ControllerSettings {
        endpoint: "https://vcl.invalid/index.php".to_string(),
        caller_address: None,
        ..settings()
    };
    let controller = SessionController::new(&service, &stored, &console, &clock, unroutable);

    assert!(matches!(
        controller.connection_info("42"),
        Err(VclError::CredentialsMissing)
    ));
    assert!(matches!(controller.sessions(), Err(VclError::CredentialsMissing)));
    assert!(service.calls().is_empty());
}

#[test]
fn skipping_the_wait_skips_connecting() {
    let service = FakeService {
        submit: accepted("42"),
        info: Some(ssh_info("10.0.0.5")),
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let connector = FakeConnector::default();
    let viewer = FakeViewer::default();
    let temp = TempDir::new().unwrap();
    let store = FsProfileStore::new(temp.path());
    let launcher = Launcher::new(
        Platform::Linux,
        SshHandler::new(&connector, &clock, &console, ssh_policy()),
        RemoteDesktopHandler::new(&store, &viewer, &console),
    );
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    let outcome = controller.request_session(&request(), false, Some(&launcher)).unwrap();

    assert_eq!(outcome.state, None);
    assert_eq!(outcome.launch, None);
    assert_eq!(service.calls(), vec![Call::Submit(request())]);
    assert!(connector.targets.borrow().is_empty());
}

#[test]
fn unusual_status_fails_the_request() {
    let service = FakeService {
        submit: accepted("42"),
        statuses: RefCell::new(vec![SessionStatus::Other("failed".to_string())].into()),
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    let err = controller.request_session(&request(), true, None).unwrap_err();

    assert_eq!(err.to_string(), "Received status 'failed'.");
    assert_eq!(service.status_calls(), 1);
}

#[test]
fn unreachable_host_fails_with_connection_details() {
    let unreachable = || ConnectError::Unreachable("Connection refused".to_string());
    let service = FakeService {
        info: Some(ConnectionInfo {
            password: Some("s3cret".to_string()),
            ..ssh_info("10.0.0.5")
        }),
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let connector = FakeConnector::failing((0..5).map(|_| unreachable()).collect());
    let viewer = FakeViewer::default();
    let temp = TempDir::new().unwrap();
    let store = FsProfileStore::new(temp.path());
    let launcher = Launcher::new(
        Platform::Linux,
        SshHandler::new(&connector, &clock, &console, ssh_policy()),
        RemoteDesktopHandler::new(&store, &viewer, &console),
    );
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    let err = controller.connect("42", &launcher).unwrap_err();

    let details = err.connection_details().unwrap();
    assert_eq!(details.ip_address, "10.0.0.5");
    assert_eq!(details.password.as_deref(), Some("s3cret"));
    assert_eq!(connector.targets.borrow().len(), 5);
    assert_eq!(clock.sleeps.borrow().len(), 4);
}

#[test]
fn several_methods_prompt_for_a_choice() {
    let service = FakeService {
        info: Some(ConnectionInfo {
            methods: vec![MethodEntry::new("1", "ssh"), MethodEntry::new("2", "Remote Desktop")],
            ..ssh_info("10.0.0.5")
        }),
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::answering(&[2], &[true]);
    let clock = FakeClock::default();
    let connector = FakeConnector::default();
    let viewer = FakeViewer::default();
    let temp = TempDir::new().unwrap();
    let store = FsProfileStore::new(temp.path());
    let launcher = Launcher::new(
        Platform::Linux,
        SshHandler::new(&connector, &clock, &console, ssh_policy()),
        RemoteDesktopHandler::new(&store, &viewer, &console),
    );
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    let outcome = controller.connect("42", &launcher).unwrap();

    assert_eq!(outcome, LaunchOutcome::Connected);
    assert!(connector.targets.borrow().is_empty());
    assert_eq!(*viewer.opened.borrow(), vec![store.path_for("42")]);
    assert!(console.lines().contains(&Line::Prompt("Enter a number".to_string())));
}

#[test]
fn connection_info_before_ready_is_not_ready() {
    let service = FakeService::default();
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    assert!(matches!(
        controller.connection_info("42"),
        Err(VclError::NotReady(ref id)) if id == "42"
    ));
}

#[test]
fn one_active_session_is_chosen_silently() {
    let service = FakeService {
        sessions: vec![session("41", "Old", "timedout"), session("42", "Ubuntu", "inuse")],
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    assert_eq!(controller.choose_active_session().unwrap(), "42");
    assert!(console.lines().is_empty());
}

#[test]
fn several_active_sessions_are_offered() {
    let service = FakeService {
        sessions: vec![session("42", "Ubuntu", "inuse"), session("43", "Windows", "reserved")],
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::answering(&[2], &[]);
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    assert_eq!(controller.choose_active_session().unwrap(), "43");
    assert!(console.lines().contains(&Line::Info("  2. Windows (id: 43)".to_string())));
}

#[test]
fn no_active_sessions_is_an_error() {
    let service = FakeService {
        sessions: vec![session("41", "Old", "complete")],
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    assert!(matches!(controller.choose_active_session(), Err(VclError::NoActiveSessions)));
}

#[test]
fn rejected_actions_carry_the_reason() {
    let service = FakeService {
        action: Some(ActionResult::Rejected {
            reason: "session cannot be extended".to_string(),
        }),
        ..Default::default()
    };
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    match controller.extend("42", 60) {
        Err(VclError::Rejected { operation, reason }) => {
            assert_eq!(operation, "extend");
            assert_eq!(reason, "session cannot be extended");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(
        controller.delete("42"),
        Err(VclError::Rejected { operation: "delete", .. })
    ));
    assert_eq!(
        service.calls(),
        vec![Call::Extend("42".to_string(), 60), Call::Delete("42".to_string())]
    );
}

#[test]
fn ping_failure_rejects_credentials() {
    let service = FakeService::default();
    let stored = Stored(Some(credential()));
    let console = FakeConsole::default();
    let clock = FakeClock::default();
    let controller = SessionController::new(&service, &stored, &console, &clock, settings());

    assert!(controller.validate_credentials().is_err());
    assert_eq!(service.calls(), vec![Call::Ping]);
}
