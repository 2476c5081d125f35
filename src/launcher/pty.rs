//! Runs the system `ssh` client inside a pseudo-terminal and bridges it to
//! the local terminal.

use std::{
    io::{self, ErrorKind, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
    },
    thread,
    time::Duration,
};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use once_cell::sync::OnceCell;
use portable_pty::{ChildKiller, CommandBuilder, NativePtySystem, PtySize, PtySystem};
use tracing::debug;

use super::ssh::{ConnectError, ShellConnector, ShellTarget};

const TAIL_LIMIT: usize = 512;
const SSH_FAILURE_EXIT: u32 = 255;
const INPUT_POLL: Duration = Duration::from_millis(100);

const UNREACHABLE_MARKERS: &[&str] = &[
    "no route to host",
    "connection refused",
    "network is unreachable",
];

type PtyWriter = Mutex<Box<dyn Write + Send>>;

/// Reads stdin on one long-lived thread. Stdin reads can't be interrupted,
/// so every attempt borrows the same reader instead of starting its own.
struct StdinPump {
    chunks: Mutex<Receiver<Vec<u8>>>,
}

impl StdinPump {
    fn start() -> Arc<Self> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = io::stdin();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Arc::new(Self {
            chunks: Mutex::new(rx),
        })
    }
}

pub struct PtyShellConnector {
    program: String,
    port: u16,
    probe_timeout: Duration,
    stdin: OnceCell<Arc<StdinPump>>,
}

impl PtyShellConnector {
    pub fn new(program: impl Into<String>, port: u16, probe_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            port,
            probe_timeout,
            stdin: OnceCell::new(),
        }
    }

    fn stdin(&self) -> Arc<StdinPump> {
        Arc::clone(self.stdin.get_or_init(StdinPump::start))
    }

    /// TCP connect to the SSH port so an unreachable VM is detected before
    /// the terminal is handed over.
    fn probe(&self, host: &str) -> Result<(), ConnectError> {
        let addrs = (host, self.port)
            .to_socket_addrs()
            .map_err(|e| ConnectError::Other(format!("could not resolve {}: {}", host, e)))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.probe_timeout) {
                Ok(_) => return Ok(()),
                Err(e) => last_error = Some(classify_io_error(host, &e)),
            }
        }
        Err(last_error.unwrap_or_else(|| ConnectError::Other(format!("{} has no address", host))))
    }

    fn run_interactive(&self, target: &ShellTarget<'_>) -> Result<(), ConnectError> {
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let pty_system = NativePtySystem::default();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| pty_error("failed to open a pty", e))?;

        let port = self.port.to_string();
        let mut cmd = CommandBuilder::new(&self.program);
        cmd.args([
            "-o",
            "StrictHostKeyChecking=accept-new",
            "-p",
            port.as_str(),
            "-l",
            target.user,
            target.host,
        ]);

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| pty_error(&format!("failed to start {}", self.program), e))?;
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| pty_error("failed to read from pty", e))?;
        let writer: Arc<PtyWriter> = Arc::new(Mutex::new(
            pair.master
                .take_writer()
                .map_err(|e| pty_error("failed to write to pty", e))?,
        ));

        if let Err(e) = enable_raw_mode() {
            let _ = child.kill();
            return Err(pty_error("failed to enable raw mode", e));
        }

        // Cleared on the first keystroke; after that the output belongs to
        // the user's session and is no longer inspected.
        let watching = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel();

        // PTY master -> stdout, answering the password prompt on the way.
        let secret = target.secret.to_string();
        let prompt_writer = Arc::clone(&writer);
        let output_watching = Arc::clone(&watching);
        let tx_out = tx.clone();
        let output = thread::spawn(move || {
            let mut watcher = OutputWatcher::default();
            let mut buf = [0u8; 1024];
            let mut stdout = io::stdout();
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if stdout.write_all(&buf[..n]).is_err() {
                            break;
                        }
                        let _ = stdout.flush();
                        if !output_watching.load(Ordering::Relaxed) {
                            continue;
                        }
                        match watcher.feed(&buf[..n]) {
                            WatchEvent::SendSecret => {
                                if let Ok(mut w) = prompt_writer.lock() {
                                    let _ = w.write_all(secret.as_bytes());
                                    let _ = w.write_all(b"\r");
                                    let _ = w.flush();
                                }
                            }
                            WatchEvent::AuthRejected => break,
                            WatchEvent::Nothing => {}
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx_out.send(());
            watcher.into_verdict()
        });

        // stdin -> PTY master. Raw mode delivers keystrokes unbuffered.
        let pump = self.stdin();
        let input_writer = Arc::clone(&writer);
        let finished = Arc::new(AtomicBool::new(false));
        let input_finished = Arc::clone(&finished);
        let tx_in = tx;
        let input = thread::spawn(move || {
            if let Ok(chunks) = pump.chunks.lock() {
                // Keys typed between attempts belong to no session.
                while chunks.try_recv().is_ok() {}
                forward_input(&chunks, &input_finished, &watching, &input_writer);
            }
            let _ = tx_in.send(());
        });

        let _ = rx.recv();
        finished.store(true, Ordering::Relaxed);
        let _ = disable_raw_mode();
        let _ = input.join();

        let verdict = output.join().unwrap_or(None);
        if matches!(verdict, Some(ConnectError::AuthRejected(_))) {
            let _ = child.kill();
        }
        let status = child
            .wait()
            .map_err(|e| pty_error("failed to wait for ssh", e))?;
        debug!(exit_code = status.exit_code(), "ssh exited");

        let ssh_failed = !status.success() && status.exit_code() == SSH_FAILURE_EXIT;
        session_outcome(&self.program, verdict, ssh_failed)
    }
}

/// An unreachable report only counts when ssh itself gave up; any other
/// exit means the session ran.
fn session_outcome(
    program: &str,
    verdict: Option<ConnectError>,
    ssh_failed: bool,
) -> Result<(), ConnectError> {
    match verdict {
        Some(ConnectError::Unreachable(_)) if !ssh_failed => Ok(()),
        Some(err) => Err(err),
        None if ssh_failed => Err(ConnectError::Other(format!(
            "{} exited with status {}",
            program, SSH_FAILURE_EXIT
        ))),
        None => Ok(()),
    }
}

impl ShellConnector for PtyShellConnector {
    fn open_shell(&self, target: &ShellTarget<'_>) -> Result<(), ConnectError> {
        self.probe(target.host)?;
        self.run_interactive(target)
    }
}

/// Copies queued stdin chunks into the session until `finished` is set or
/// stdin closes. Chunks left queued stay with the pump for the next session.
fn forward_input(
    chunks: &Receiver<Vec<u8>>,
    finished: &AtomicBool,
    watching: &AtomicBool,
    writer: &PtyWriter,
) {
    while !finished.load(Ordering::Relaxed) {
        match chunks.recv_timeout(INPUT_POLL) {
            Ok(bytes) => {
                watching.store(false, Ordering::Relaxed);
                let Ok(mut w) = writer.lock() else { break };
                if w.write_all(&bytes).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn pty_error(what: &str, err: impl std::fmt::Display) -> ConnectError {
    ConnectError::Other(format!("{}: {}", what, err))
}

pub(crate) fn classify_io_error(host: &str, err: &io::Error) -> ConnectError {
    match err.kind() {
        ErrorKind::ConnectionRefused
        | ErrorKind::HostUnreachable
        | ErrorKind::NetworkUnreachable => ConnectError::Unreachable(format!("{}: {}", host, err)),
        _ => ConnectError::Other(format!("{}: {}", host, err)),
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum WatchEvent {
    Nothing,
    SendSecret,
    AuthRejected,
}

/// Inspects ssh output until the user takes over the terminal.
#[derive(Default)]
pub(crate) struct OutputWatcher {
    tail: String,
    secret_sent: bool,
    verdict: Option<ConnectError>,
}

impl OutputWatcher {
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> WatchEvent {
        let clean = strip_ansi_escapes::strip(chunk);
        self.tail.push_str(&String::from_utf8_lossy(&clean).to_lowercase());
        if self.tail.len() > TAIL_LIMIT {
            let mut cut = self.tail.len() - TAIL_LIMIT;
            while !self.tail.is_char_boundary(cut) {
                cut += 1;
            }
            self.tail.drain(..cut);
        }

        // Only ssh itself reports these, and only before authentication.
        if self.verdict.is_none() && !self.secret_sent {
            if let Some(marker) = UNREACHABLE_MARKERS.iter().find(|m| self.tail.contains(**m)) {
                self.verdict = Some(ConnectError::Unreachable(format!("ssh reported: {}", marker)));
            }
        }

        if !self.tail.trim_end().ends_with("password:") {
            return WatchEvent::Nothing;
        }
        self.tail.clear();
        if self.secret_sent {
            self.verdict = Some(ConnectError::AuthRejected(
                "the stored password was not accepted".to_string(),
            ));
            return WatchEvent::AuthRejected;
        }
        self.secret_sent = true;
        WatchEvent::SendSecret
    }

    pub(crate) fn into_verdict(self) -> Option<ConnectError> {
        self.verdict
    }
}
