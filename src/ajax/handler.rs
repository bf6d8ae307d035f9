//! The contract a module implements to take part in dispatch.
//!
//! Every hook has a default. The defaults for [`ModuleHandler::accept`] and
//! [`ModuleHandler::handle`] report [`HookError::Unsupported`], which the
//! dispatcher turns into a 501. The custom handler defaults to "not handled"
//! and polling is opt-in through [`ModuleHandler::polls`].

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::ajax::context::ModuleRequest;
use crate::ajax::error::DispatchError;
use crate::config::AjaxSettings;
use crate::http::response::{Response, StatusCode};

/// A named operation of the handler protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Admission,
    Handler,
    Poll,
}

impl Hook {
    /// Name used on the wire when the hook is missing.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Hook::Admission => "ajaxRequest",
            Hook::Handler => "ajaxHandler",
            Hook::Poll => "poll",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    /// The module does not implement this hook.
    #[error("{0} not found")]
    Unsupported(Hook),
    /// The hook ran and failed. Details are logged, never sent to the client.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// What a custom handler decided.
#[derive(Debug)]
pub enum CustomOutcome {
    /// The module produced the complete response itself.
    Handled(Response),
    /// Fall through to [`ModuleHandler::handle`].
    Continue,
}

/// Body of a successful handler call, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Map(Map<String, Value>),
    Text(String),
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    Success(Payload),
    /// Module-chosen failure, answered with `status` and an error envelope.
    Failure { status: StatusCode, message: String },
}

impl HandlerResult {
    pub fn map(map: Map<String, Value>) -> Self {
        HandlerResult::Success(Payload::Map(map))
    }

    pub fn text(message: impl Into<String>) -> Self {
        HandlerResult::Success(Payload::Text(message.into()))
    }

    pub fn flag(ok: bool) -> Self {
        HandlerResult::Success(Payload::Flag(ok))
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        HandlerResult::Failure {
            status,
            message: message.into(),
        }
    }

    /// Converts a handler's answer into the body that gets serialized.
    ///
    /// `Flag(false)` is an unspecified failure. `Flag(true)` and bare text are
    /// wrapped into `{status, message}`.
    pub fn into_body(self) -> Result<Value, DispatchError> {
        match self {
            HandlerResult::Success(Payload::Map(map)) => Ok(Value::Object(map)),
            HandlerResult::Success(Payload::Text(message)) => {
                Ok(json!({ "status": true, "message": message }))
            }
            HandlerResult::Success(Payload::Flag(true)) => {
                Ok(json!({ "status": true, "message": "unknown" }))
            }
            HandlerResult::Success(Payload::Flag(false)) => Err(DispatchError::GenericFailure),
            HandlerResult::Failure { status, message } => {
                Err(DispatchError::Rejected { status, message })
            }
        }
    }
}

/// A business or core module as seen by the dispatcher.
///
/// Calls happen in a fixed order: [`accept`](Self::accept), then
/// [`custom_handle`](Self::custom_handle), then [`handle`](Self::handle).
/// [`poll`](Self::poll) is only used by poll aggregation.
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    /// Admission check for `command`. Returning `Ok(false)` yields a 403.
    fn accept(&self, _command: &str, _settings: &AjaxSettings) -> Result<bool, HookError> {
        Err(HookError::Unsupported(Hook::Admission))
    }

    /// Escape hatch for modules that write their own response. A
    /// [`CustomOutcome::Handled`] response is sent untouched: no content
    /// negotiation, no header accumulation, no CORS headers.
    async fn custom_handle(&self, _request: &ModuleRequest) -> Result<CustomOutcome, HookError> {
        Ok(CustomOutcome::Continue)
    }

    async fn handle(&self, _request: &ModuleRequest) -> Result<HandlerResult, HookError> {
        Err(HookError::Unsupported(Hook::Handler))
    }

    /// Whether the module takes part in poll aggregation.
    fn polls(&self) -> bool {
        false
    }

    async fn poll(&self, _data: &Value) -> Result<Value, HookError> {
        Err(HookError::Unsupported(Hook::Poll))
    }
}
