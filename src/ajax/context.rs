//! Request-scoped inputs to dispatch.

use std::net::SocketAddr;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::http::request::Request;

/// Addresses of the connection a request arrived on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionInfo {
    pub peer: Option<SocketAddr>,
    pub local: Option<SocketAddr>,
}

/// Snapshot of the inbound request. Built once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub accept: String,
    pub host: String,
    pub remote_ip: String,
    pub content_type: String,
    /// Lowercased HTTP method.
    pub verb: String,
    /// Path-info after the script path, or the raw target when there is none.
    pub uri: String,
    pub token: String,
    pub nonce: String,
    pub signature: String,
    pub user_agent: String,
    pub server_name: String,
    pub server_port: String,
    /// Raw request target, query string included.
    pub request: String,
    pub raw_body: Bytes,
}

impl RequestContext {
    /// Extraction never fails; absent headers become empty strings.
    pub fn from_request(req: &Request, conn: &ConnectionInfo, script_path: &str) -> Self {
        let header = |name: &str| req.header(name).unwrap_or_default().to_string();

        let host = header("Host");
        let server_name = match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
            _ if !host.is_empty() => host.clone(),
            _ => conn.local.map(|a| a.ip().to_string()).unwrap_or_default(),
        };

        let uri = path_info(req.path_only(), script_path)
            .map(str::to_string)
            .unwrap_or_else(|| req.path.clone());

        Self {
            accept: header("Accept"),
            host,
            remote_ip: conn.peer.map(|a| a.ip().to_string()).unwrap_or_default(),
            content_type: header("Content-Type"),
            verb: req.method.as_str().to_ascii_lowercase(),
            uri,
            token: header("Token"),
            nonce: header("Nonce"),
            signature: header("Signature"),
            user_agent: header("User-Agent"),
            server_name,
            server_port: conn.local.map(|a| a.port().to_string()).unwrap_or_default(),
            request: req.path.clone(),
            raw_body: Bytes::copy_from_slice(&req.body),
        }
    }

    /// Host plus raw target, or empty when the client sent no Host.
    pub fn url(&self) -> String {
        if self.host.is_empty() {
            return String::new();
        }
        format!("{}{}", self.host, self.request)
    }

    /// The listener only speaks plaintext HTTP.
    pub fn protocol(&self) -> &'static str {
        "http"
    }

    pub fn body(&self) -> &[u8] {
        &self.raw_body
    }
}

fn path_info<'a>(path: &'a str, script_path: &str) -> Option<&'a str> {
    if script_path.is_empty() {
        return None;
    }
    path.strip_prefix(script_path).filter(|rest| rest.starts_with('/'))
}

/// Where a request is routed: a module and command, or the poll fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchRequest {
    pub module: Option<String>,
    pub command: Option<String>,
    pub is_poll: bool,
}

impl DispatchRequest {
    /// Later parameters win, so body fields override the query string.
    pub fn from_params(params: &[(String, String)]) -> Self {
        let last = |key: &str| {
            params
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
        };

        let module = last("module");
        let command = last("command");
        let is_poll = command.as_deref() == Some("poll");

        if is_poll {
            return Self {
                module: None,
                command: None,
                is_poll,
            };
        }

        Self {
            module,
            command,
            is_poll,
        }
    }

    /// Module and command, if both were supplied.
    pub fn target(&self) -> Option<(&str, &str)> {
        Some((self.module.as_deref()?, self.command.as_deref()?))
    }
}

/// What a module sees of the request it is serving.
#[derive(Debug, Clone)]
pub struct ModuleRequest {
    pub module: String,
    pub command: String,
    pub context: RequestContext,
    pub params: Vec<(String, String)>,
}

impl ModuleRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The `data` payload handed to every poll hook.
///
/// A JSON body's `data` member wins; otherwise `data` is read from the
/// parameters (JSON-decoded when it parses) or assembled from `data[key]`
/// fields. Defaults to an empty object.
pub fn poll_data(params: &[(String, String)], context: &RequestContext) -> Value {
    if context.content_type.starts_with("application/json") {
        if let Ok(Value::Object(mut body)) = serde_json::from_slice::<Value>(context.body()) {
            if let Some(data) = body.remove("data") {
                return data;
            }
        }
    }

    let mut fields = Map::new();
    let mut plain = None;
    for (key, value) in params {
        if key == "data" {
            plain = Some(value);
        } else if let Some(field) = key.strip_prefix("data[").and_then(|k| k.strip_suffix(']')) {
            fields.insert(field.to_string(), Value::String(value.clone()));
        }
    }

    match plain {
        Some(raw) if !raw.is_empty() => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        }
        _ => Value::Object(fields),
    }
}
