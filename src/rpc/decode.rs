//! Turns loosely-typed XML-RPC responses into tagged results.

use std::collections::BTreeMap;

use xmlrpc::Value;

use crate::error::{Result, VclError};
use crate::model::{
    ActionResult, ConnectionInfo, ConnectionInfoResult, Image, MethodEntry, SessionStatus,
    SessionSummary, SubmitResult,
};

fn fields<'a>(call: &'static str, value: &'a Value) -> Result<&'a BTreeMap<String, Value>> {
    match value {
        Value::Struct(map) => Ok(map),
        other => Err(malformed(call, format!("expected a struct, got {:?}", other))),
    }
}

fn malformed(call: &'static str, detail: impl Into<String>) -> VclError {
    VclError::MalformedResponse {
        call,
        detail: detail.into(),
    }
}

/// Strings and integers both render as text; ids arrive either way.
fn text(map: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Int64(i) => Some(i.to_string()),
        _ => None,
    }
}

fn required_text(call: &'static str, map: &BTreeMap<String, Value>, key: &str) -> Result<String> {
    text(map, key).ok_or_else(|| malformed(call, format!("missing field '{}'", key)))
}

fn status(call: &'static str, map: &BTreeMap<String, Value>) -> Result<String> {
    required_text(call, map, "status")
}

/// Server error text, verbatim when the service provides one.
fn reason(map: &BTreeMap<String, Value>, status: String) -> String {
    text(map, "errormsg").filter(|m| !m.is_empty()).unwrap_or(status)
}

pub(crate) fn submit(value: &Value) -> Result<SubmitResult> {
    const CALL: &str = "submit";
    let map = fields(CALL, value)?;
    let status = status(CALL, map)?;
    if status == "success" {
        Ok(SubmitResult::Accepted {
            session_id: required_text(CALL, map, "requestid")?,
        })
    } else {
        Ok(SubmitResult::Rejected {
            reason: reason(map, status),
        })
    }
}

pub(crate) fn session_status(value: &Value) -> Result<SessionStatus> {
    const CALL: &str = "status";
    let map = fields(CALL, value)?;
    let status = status(CALL, map)?;
    Ok(match status.as_str() {
        "ready" => SessionStatus::Ready,
        "loading" => SessionStatus::Loading {
            minutes_left: text(map, "time").and_then(|t| t.trim().parse().ok()),
        },
        _ => SessionStatus::Other(status),
    })
}

pub(crate) fn connection_info(value: &Value) -> Result<ConnectionInfoResult> {
    const CALL: &str = "connection info";
    let map = fields(CALL, value)?;
    let status = status(CALL, map)?;
    match status.as_str() {
        "ready" => {}
        "notready" => return Ok(ConnectionInfoResult::NotReady),
        _ => {
            return Err(VclError::Rejected {
                operation: "connection info",
                reason: reason(map, status),
            });
        }
    }

    let methods = match map.get("connectMethods") {
        Some(methods) => connect_methods(methods)?,
        None => Vec::new(),
    };

    Ok(ConnectionInfoResult::Ready(ConnectionInfo {
        ip_address: required_text(CALL, map, "serverIP")?,
        username: required_text(CALL, map, "user")?,
        password: text(map, "password").filter(|p| !p.is_empty()),
        methods,
    }))
}

/// Methods arrive either as a list or as a struct keyed by method number.
fn connect_methods(value: &Value) -> Result<Vec<MethodEntry>> {
    const CALL: &str = "connection info";
    let entries: Vec<(String, &Value)> = match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| ((idx + 1).to_string(), item))
            .collect(),
        Value::Struct(map) => {
            let mut keyed: Vec<(String, &Value)> =
                map.iter().map(|(k, v)| (k.clone(), v)).collect();
            keyed.sort_by_key(|(k, _)| (k.parse::<u64>().unwrap_or(u64::MAX), k.clone()));
            keyed
        }
        other => return Err(malformed(CALL, format!("unexpected connectMethods {:?}", other))),
    };

    entries
        .into_iter()
        .map(|(key, item)| {
            let method = fields(CALL, item)?;
            Ok(MethodEntry::new(key, required_text(CALL, method, "description")?))
        })
        .collect()
}

pub(crate) fn action(call: &'static str, value: &Value) -> Result<ActionResult> {
    let map = fields(call, value)?;
    let status = status(call, map)?;
    if status == "success" {
        Ok(ActionResult::Done)
    } else {
        Ok(ActionResult::Rejected {
            reason: reason(map, status),
        })
    }
}

pub(crate) fn sessions(value: &Value) -> Result<Vec<SessionSummary>> {
    const CALL: &str = "list sessions";
    let map = fields(CALL, value)?;
    let status = status(CALL, map)?;
    if status != "success" {
        return Err(VclError::Rejected {
            operation: "list sessions",
            reason: reason(map, status),
        });
    }

    let requests = match map.get("requests") {
        Some(Value::Array(items)) => items,
        None => return Ok(Vec::new()),
        Some(other) => return Err(malformed(CALL, format!("unexpected requests {:?}", other))),
    };

    requests
        .iter()
        .map(|item| {
            let r = fields(CALL, item)?;
            Ok(SessionSummary {
                session_id: required_text(CALL, r, "requestid")?,
                image_id: text(r, "imageid").unwrap_or_default(),
                image_name: text(r, "imagename").unwrap_or_default(),
                state: text(r, "state").unwrap_or_default(),
                os_type: text(r, "ostype").unwrap_or_default(),
                os: text(r, "OS").unwrap_or_default(),
            })
        })
        .collect()
}

pub(crate) fn images(value: &Value) -> Result<Vec<Image>> {
    const CALL: &str = "list images";
    let items = match value {
        Value::Array(items) => items,
        other => return Err(malformed(CALL, format!("expected an array, got {:?}", other))),
    };

    items
        .iter()
        .map(|item| {
            let map = fields(CALL, item)?;
            Ok(Image {
                id: required_text(CALL, map, "id")?,
                name: required_text(CALL, map, "name")?,
            })
        })
        .collect()
}

pub(crate) fn ping(value: &Value) -> Result<bool> {
    let map = fields("ping", value)?;
    Ok(status("ping", map)? == "success")
}
