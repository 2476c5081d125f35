use std::error::Error;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use xmlrpc::{Request, Transport, Value};

use super::{RemoteService, decode};
use crate::credentials::Credential;
use crate::error::{Result, VclError};
use crate::model::{
    ActionResult, ConnectionInfoResult, Image, SessionRequest, SessionStatus, SessionSummary,
    StartTime, SubmitResult,
};

const API_VERSION: &str = "2";

const ADD_REQUEST: &str = "XMLRPCaddRequest";
const REQUEST_STATUS: &str = "XMLRPCgetRequestStatus";
const CONNECT_DATA: &str = "XMLRPCgetRequestConnectData";
const END_REQUEST: &str = "XMLRPCendRequest";
const EXTEND_REQUEST: &str = "XMLRPCextendRequest";
const REQUEST_IDS: &str = "XMLRPCgetRequestIds";
const GET_IMAGES: &str = "XMLRPCgetImages";
const TEST: &str = "XMLRPCtest";

/// VCL XML-RPC endpoint over HTTPS.
pub struct XmlRpcService {
    endpoint: String,
    client: Client,
}

impl XmlRpcService {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VclError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    fn call(&self, auth: &Credential, method: &'static str, args: Vec<Value>) -> Result<Value> {
        debug!(method, endpoint = %self.endpoint, "calling remote service");
        let mut request = Request::new(method);
        for arg in args {
            request = request.arg(arg);
        }
        let transport = AuthenticatedTransport {
            client: &self.client,
            endpoint: &self.endpoint,
            auth,
        };
        request.call(transport).map_err(|e| VclError::Transport {
            method,
            message: e.to_string(),
        })
    }
}

/// Sends the request with the credential headers the service expects.
struct AuthenticatedTransport<'a> {
    client: &'a Client,
    endpoint: &'a str,
    auth: &'a Credential,
}

impl Transport for AuthenticatedTransport<'_> {
    type Stream = Response;

    fn transmit(
        self,
        request: &Request<'_>,
    ) -> std::result::Result<Response, Box<dyn Error + Send + Sync>> {
        let mut body = Vec::new();
        request.write_as_xml(&mut body)?;

        let response = self
            .client
            .post(self.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .header("X-User", self.auth.username.as_str())
            .header("X-Pass", self.auth.secret.as_str())
            .header("X-APIVERSION", API_VERSION)
            .body(body)
            .send()?
            .error_for_status()?;
        Ok(response)
    }
}

/// Numeric ids go over the wire as integers.
fn id_value(id: &str) -> Value {
    match id.parse::<i32>() {
        Ok(n) => Value::Int(n),
        Err(_) => Value::String(id.to_string()),
    }
}

/// XML-RPC integers are 32-bit.
fn int_value(field: &'static str, value: u32) -> Result<Value> {
    i32::try_from(value)
        .map(Value::Int)
        .map_err(|_| VclError::ValueTooLarge { field, value })
}

fn start_value(start: StartTime) -> Value {
    match start {
        StartTime::Now => Value::String("now".to_string()),
        StartTime::At(ts) => Value::Int64(ts),
    }
}

impl RemoteService for XmlRpcService {
    fn submit(&self, auth: &Credential, request: &SessionRequest) -> Result<SubmitResult> {
        let no_user_check = if request.inactivity_timeout { 0 } else { 1 };
        let args = vec![
            id_value(&request.image_id),
            start_value(request.start),
            int_value("length", request.length_minutes)?,
            Value::Int(no_user_check),
        ];
        decode::submit(&self.call(auth, ADD_REQUEST, args)?)
    }

    fn status(&self, auth: &Credential, session_id: &str) -> Result<SessionStatus> {
        decode::session_status(&self.call(auth, REQUEST_STATUS, vec![id_value(session_id)])?)
    }

    fn connection_info(
        &self,
        auth: &Credential,
        session_id: &str,
        caller_address: &str,
    ) -> Result<ConnectionInfoResult> {
        let args = vec![id_value(session_id), Value::String(caller_address.to_string())];
        decode::connection_info(&self.call(auth, CONNECT_DATA, args)?)
    }

    fn delete(&self, auth: &Credential, session_id: &str) -> Result<ActionResult> {
        decode::action("delete", &self.call(auth, END_REQUEST, vec![id_value(session_id)])?)
    }

    fn extend(&self, auth: &Credential, session_id: &str, minutes: u32) -> Result<ActionResult> {
        let args = vec![id_value(session_id), int_value("minutes", minutes)?];
        decode::action("extend", &self.call(auth, EXTEND_REQUEST, args)?)
    }

    fn list_sessions(&self, auth: &Credential) -> Result<Vec<SessionSummary>> {
        decode::sessions(&self.call(auth, REQUEST_IDS, Vec::new())?)
    }

    fn list_images(&self, auth: &Credential) -> Result<Vec<Image>> {
        decode::images(&self.call(auth, GET_IMAGES, Vec::new())?)
    }

    fn ping(&self, auth: &Credential) -> Result<bool> {
        decode::ping(&self.call(auth, TEST, vec![Value::String("ping".to_string())])?)
    }
}
