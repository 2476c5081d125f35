//! The remote session service and its XML-RPC binding.

mod decode;
mod http;

use std::net::UdpSocket;

use url::Url;

pub use http::XmlRpcService;

use crate::credentials::Credential;
use crate::error::{Result, VclError};
use crate::model::{
    ActionResult, ConnectionInfoResult, Image, SessionRequest, SessionStatus, SessionSummary,
    SubmitResult,
};

/// Provisioning API. Every call is a single request/response.
pub trait RemoteService {
    fn submit(&self, auth: &Credential, request: &SessionRequest) -> Result<SubmitResult>;
    fn status(&self, auth: &Credential, session_id: &str) -> Result<SessionStatus>;
    fn connection_info(
        &self,
        auth: &Credential,
        session_id: &str,
        caller_address: &str,
    ) -> Result<ConnectionInfoResult>;
    fn delete(&self, auth: &Credential, session_id: &str) -> Result<ActionResult>;
    fn extend(&self, auth: &Credential, session_id: &str, minutes: u32) -> Result<ActionResult>;
    fn list_sessions(&self, auth: &Credential) -> Result<Vec<SessionSummary>>;
    fn list_images(&self, auth: &Credential) -> Result<Vec<Image>>;
    fn ping(&self, auth: &Credential) -> Result<bool>;
}

/// Local address of the interface that routes toward `endpoint`. No packet is
/// sent; connecting a UDP socket only selects a route.
pub fn caller_address(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint)
        .map_err(|e| VclError::Config(format!("invalid endpoint: {}", e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| VclError::Config(format!("endpoint has no host: {}", endpoint)))?;
    let port = url.port_or_known_default().unwrap_or(443);

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect((host, port))?;
    Ok(socket.local_addr()?.ip().to_string())
}
