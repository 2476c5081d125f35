use tracing::{debug, warn};

use crate::error::{Result, VclError};

const KEYRING_SERVICE: &str = "vcl-client";

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub secret: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

pub trait Credentials {
    fn get(&self) -> Option<Credential>;
}

/// Precondition check run before every authenticated call.
pub struct CredentialGate<'a> {
    credentials: &'a dyn Credentials,
}

impl<'a> CredentialGate<'a> {
    pub fn new(credentials: &'a dyn Credentials) -> Self {
        Self { credentials }
    }

    pub fn require(&self) -> Result<Credential> {
        match self.credentials.get() {
            Some(c) if !c.username.is_empty() && !c.secret.is_empty() => Ok(c),
            _ => Err(VclError::CredentialsMissing),
        }
    }
}

/// Username from config, secret from the OS keyring.
pub struct KeyringCredentials {
    username: Option<String>,
}

impl KeyringCredentials {
    pub fn new(username: Option<String>) -> Self {
        Self { username }
    }

    pub fn store(username: &str, secret: &str) -> Result<()> {
        keyring::Entry::new(KEYRING_SERVICE, username)
            .and_then(|entry| entry.set_password(secret))
            .map_err(|e| VclError::Keyring(e.to_string()))
    }
}

impl Credentials for KeyringCredentials {
    fn get(&self) -> Option<Credential> {
        let username = self.username.as_deref()?;
        let entry = match keyring::Entry::new(KEYRING_SERVICE, username) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "could not open keyring entry");
                return None;
            }
        };
        match entry.get_password() {
            Ok(secret) => Some(Credential {
                username: username.to_string(),
                secret,
            }),
            Err(keyring::Error::NoEntry) => {
                debug!(username, "no secret stored in keyring");
                None
            }
            Err(e) => {
                warn!(error = %e, "could not read secret from keyring");
                None
            }
        }
    }
}

/// Fixed credential, used while validating new settings.
pub struct StaticCredentials(pub Credential);

impl Credentials for StaticCredentials {
    fn get(&self) -> Option<Credential> {
        Some(self.0.clone())
    }
}
