//! Remote desktop transport through a Remmina profile.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use super::profile::ProfileStore;
use super::{LaunchOutcome, Platform};
use crate::console::Console;
use crate::error::{Result, VclError};
use crate::model::ConnectionDetails;

/// Renders a Remmina RDP profile. Remmina only reads encrypted passwords
/// from profiles, so the password field stays empty and the password is
/// shown to the user instead.
pub fn remmina_profile(details: &ConnectionDetails) -> String {
    format!(
        "[remmina]\n\
         name=VCL\n\
         protocol=RDP\n\
         server={server}\n\
         username={user}\n\
         password=\n\
         domain=\n\
         colordepth=32\n\
         quality=0\n\
         sound=off\n\
         cert_ignore=0\n\
         console=0\n\
         disableclipboard=0\n\
         disablepasswordstoring=0\n\
         sharesmartcard=0\n\
         shareprinter=0\n\
         ssh_enabled=0\n\
         window_maximize=1\n\
         viewmode=1\n",
        server = details.ip_address,
        user = details.username,
    )
}

pub trait ViewerLauncher {
    fn open(&self, profile: &Path) -> Result<()>;
}

/// Spawns `<viewer> -c <profile>` detached from the terminal.
pub struct RemminaViewer {
    program: String,
}

impl RemminaViewer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ViewerLauncher for RemminaViewer {
    fn open(&self, profile: &Path) -> Result<()> {
        let path = which::which(&self.program)
            .map_err(|_| VclError::ViewerNotFound(self.program.clone()))?;

        let mut cmd = Command::new(&path);
        cmd.arg("-c")
            .arg(profile)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

        cmd.spawn()?;
        info!(
            viewer = %path.display(),
            profile = %profile.display(),
            "started remote desktop viewer"
        );
        Ok(())
    }
}

pub struct RemoteDesktopHandler<'a> {
    store: &'a dyn ProfileStore,
    viewer: &'a dyn ViewerLauncher,
    console: &'a dyn Console,
}

impl<'a> RemoteDesktopHandler<'a> {
    pub fn new(
        store: &'a dyn ProfileStore,
        viewer: &'a dyn ViewerLauncher,
        console: &'a dyn Console,
    ) -> Self {
        Self { store, viewer, console }
    }

    /// Writes a fresh profile for the session, then starts the viewer once
    /// the user confirms.
    pub fn launch(
        &self,
        platform: &Platform,
        session_id: &str,
        details: &ConnectionDetails,
    ) -> Result<LaunchOutcome> {
        if !platform.supports_remote_desktop() {
            return Err(VclError::UnsupportedPlatform {
                transport: "Remote desktop",
                platform: platform.to_string(),
            });
        }

        self.store.clear(session_id)?;
        let path = self.store.write(session_id, &remmina_profile(details))?;

        let prompt = format!(
            "Login password is: {}  Ready to start the remote desktop connection?",
            details.password_display()
        );
        if !self.console.confirm(&prompt)? {
            return Ok(LaunchOutcome::Declined);
        }

        self.viewer.open(&path)?;
        Ok(LaunchOutcome::Connected)
    }
}
