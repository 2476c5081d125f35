use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use tracing::{debug, info};

use vcl_client::config::Config;
use vcl_client::console::{Console, TerminalConsole, print_error};
use vcl_client::credentials::{Credential, KeyringCredentials, StaticCredentials};
use vcl_client::launcher::{
    FsProfileStore, LaunchOutcome, Launcher, Platform, PtyShellConnector, RemminaViewer,
    RemoteDesktopHandler, SshHandler,
};
use vcl_client::model::{SessionRequest, StartTime};
use vcl_client::retry::SystemClock;
use vcl_client::rpc::XmlRpcService;
use vcl_client::{ControllerSettings, SessionController, VclError, catalog, logging, output};

#[derive(Parser, Debug)]
#[command(author, version, about = "Request and connect to VCL sessions", long_about = None)]
struct Args {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to $VCL_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request a new session and connect to it once it is ready
    Request {
        /// Image id, or part of an image name
        image: String,
        /// `now` or a unix timestamp
        #[arg(long, default_value = "now")]
        start: StartTime,
        /// Reservation length in minutes
        #[arg(long)]
        length: Option<u32>,
        /// Disable the inactivity timeout
        #[arg(long)]
        no_timeout: bool,
        /// Return right after submitting
        #[arg(long)]
        no_status: bool,
        /// Wait for the session but don't connect
        #[arg(long)]
        no_connect: bool,
    },
    /// Connect to an active session
    Connect {
        #[arg(long)]
        session_id: Option<String>,
        /// Only print the connection details
        #[arg(long)]
        details: bool,
    },
    /// List available images
    Images {
        #[arg(long)]
        filter: Option<String>,
        /// Fetch the catalog from the service instead of the cached copy
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        json: bool,
    },
    /// List your sessions
    List {
        #[arg(long)]
        json: bool,
    },
    /// End a session
    Delete {
        #[arg(long)]
        session_id: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Extend a session
    Extend {
        minutes: u32,
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Store credentials and endpoint
    Config {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Check that the endpoint accepts the stored credentials
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let vcl_err = err.downcast_ref::<VclError>();
            if let Some(details) = vcl_err.and_then(|e| e.connection_details()) {
                println!("{}", details);
            }
            print_error(&format!("{:#}", err));
            ExitCode::from(vcl_err.map_or(1, |e| e.exit_code()))
        }
    }
}

/// Process-wide collaborators shared by every command.
struct App {
    config: Config,
    config_path: PathBuf,
    credentials: KeyringCredentials,
    service: XmlRpcService,
    console: TerminalConsole,
    clock: SystemClock,
}

impl App {
    fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path,
            None => Config::default_path()?,
        };
        let config = Config::load_from(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        debug!(path = %config_path.display(), endpoint = %config.endpoint, "loaded config");

        Ok(Self {
            credentials: KeyringCredentials::new(config.username.clone()),
            service: XmlRpcService::new(config.endpoint.clone())?,
            console: TerminalConsole,
            clock: SystemClock,
            config,
            config_path,
        })
    }

    fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            endpoint: self.config.endpoint.clone(),
            caller_address: self.config.caller_address.clone(),
            polling: self.config.polling.policy(),
        }
    }

    fn controller(&self) -> SessionController<'_> {
        SessionController::new(
            &self.service,
            &self.credentials,
            &self.console,
            &self.clock,
            self.settings(),
        )
    }

    /// Cached catalog, fetched and saved when empty or when `refresh` is set.
    fn images(&mut self, refresh: bool) -> Result<Vec<vcl_client::model::Image>> {
        if refresh || self.config.images.is_empty() {
            let images = self.controller().images()?;
            info!(count = images.len(), "refreshed image catalog");
            self.config.images = images;
            self.config.save_to(&self.config_path)?;
        }
        Ok(self.config.images.clone())
    }
}

fn run(args: Args) -> Result<()> {
    let mut app = App::load(args.config)?;

    match args.command {
        Command::Request {
            image,
            start,
            length,
            no_timeout,
            no_status,
            no_connect,
        } => {
            let image_id = if catalog::is_image_id(&image) {
                image
            } else {
                let images = app.images(false)?;
                catalog::resolve_image(&image, &images, &app.console, |matches| {
                    println!("{}", output::images_table(matches))
                })?
            };
            let request = SessionRequest {
                image_id,
                start,
                length_minutes: length.unwrap_or(app.config.request.length_minutes),
                inactivity_timeout: !no_timeout && app.config.request.inactivity_timeout,
            };
            request_session(&app, &request, !no_status, !no_connect)
        }
        Command::Connect { session_id, details } => {
            let controller = app.controller();
            let session_id = match session_id {
                Some(id) => id,
                None => controller.choose_active_session()?,
            };
            if details {
                println!("{}", controller.connection_info(&session_id)?.details());
                return Ok(());
            }
            with_launcher(&app, |launcher| {
                if controller.connect(&session_id, launcher)? == LaunchOutcome::Declined {
                    println!("{}", controller.connection_info(&session_id)?.details());
                }
                Ok(())
            })
        }
        Command::Images { filter, refresh, json } => {
            let mut images = app.images(refresh)?;
            if let Some(term) = filter {
                images = catalog::filter_images(&images, &term)?;
            }
            if json {
                println!("{}", output::to_json(&images)?);
            } else {
                println!("{}", output::images_table(&images));
            }
            Ok(())
        }
        Command::List { json } => {
            let sessions = app.controller().sessions()?;
            if json {
                println!("{}", output::to_json(&sessions)?);
            } else if sessions.is_empty() {
                println!("No sessions.");
            } else {
                println!("{}", output::sessions_table(&sessions));
            }
            Ok(())
        }
        Command::Delete { session_id, yes } => {
            let controller = app.controller();
            let session_id = match session_id {
                Some(id) => id,
                None => controller.choose_active_session()?,
            };
            if !yes && !app.console.confirm(&format!("Delete session {}?", session_id))? {
                return Ok(());
            }
            controller.delete(&session_id)?;
            app.console.success(&format!("Session {} deleted.", session_id));
            Ok(())
        }
        Command::Extend { minutes, session_id } => {
            let controller = app.controller();
            let session_id = match session_id {
                Some(id) => id,
                None => controller.choose_active_session()?,
            };
            controller.extend(&session_id, minutes)?;
            app.console
                .success(&format!("Session {} extended by {} minutes.", session_id, minutes));
            Ok(())
        }
        Command::Config { username, endpoint } => configure(app, username, endpoint),
        Command::Ping => {
            app.controller().validate_credentials()?;
            app.console.success("Credentials accepted.");
            Ok(())
        }
    }
}

fn request_session(app: &App, request: &SessionRequest, wait: bool, connect: bool) -> Result<()> {
    let controller = app.controller();
    if !connect {
        let outcome = controller.request_session(request, wait, None)?;
        if wait {
            println!("{}", controller.connection_info(&outcome.session_id)?.details());
        } else {
            println!("Session ID: {}", outcome.session_id);
        }
        return Ok(());
    }

    with_launcher(app, |launcher| {
        let outcome = controller.request_session(request, wait, Some(launcher))?;
        match outcome.launch {
            Some(LaunchOutcome::Connected) => {}
            Some(LaunchOutcome::Declined) => {
                println!("{}", controller.connection_info(&outcome.session_id)?.details())
            }
            None => println!("Session ID: {}", outcome.session_id),
        }
        Ok(())
    })
}

/// Builds the launcher from config and hands it to `f`.
fn with_launcher<T>(app: &App, f: impl FnOnce(&Launcher<'_>) -> Result<T>) -> Result<T> {
    let ssh = &app.config.ssh;
    let connector = PtyShellConnector::new(
        ssh.program.clone(),
        ssh.port,
        Duration::from_secs(ssh.probe_timeout_secs),
    );
    let store = FsProfileStore::new(app.config.remote_desktop.resolved_profile_dir()?);
    let viewer = RemminaViewer::new(app.config.remote_desktop.viewer.clone());

    let launcher = Launcher::new(
        Platform::current(),
        SshHandler::new(&connector, &app.clock, &app.console, ssh.policy()),
        RemoteDesktopHandler::new(&store, &viewer, &app.console),
    );
    f(&launcher)
}

fn configure(mut app: App, username: Option<String>, endpoint: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => {
            let mut input = Input::<String>::new().with_prompt("Username");
            if let Some(current) = &app.config.username {
                input = input.default(current.clone());
            }
            input.interact_text().map_err(VclError::from)?
        }
    };
    let endpoint = match endpoint {
        Some(e) => e,
        None => Input::<String>::new()
            .with_prompt("Endpoint")
            .default(app.config.endpoint.clone())
            .interact_text()
            .map_err(VclError::from)?,
    };
    let secret = Password::new()
        .with_prompt("Password")
        .interact()
        .map_err(VclError::from)?;

    app.config.endpoint = endpoint;
    let candidate = StaticCredentials(Credential {
        username: username.clone(),
        secret,
    });
    let service = XmlRpcService::new(app.config.endpoint.clone())?;
    let settings = app.settings();
    SessionController::new(&service, &candidate, &app.console, &app.clock, settings)
        .validate_credentials()
        .context("credentials were not accepted")?;

    KeyringCredentials::store(&username, &candidate.0.secret)?;
    app.config.username = Some(username);
    app.config.save_to(&app.config_path)?;
    app.console
        .success(&format!("Saved settings to {}.", app.config_path.display()));
    Ok(())
}
