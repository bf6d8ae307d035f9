//! Scripted module doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use ucp_ajax::ajax::{
    ConnectionInfo, CustomOutcome, Dispatcher, HandlerResult, HookError, ModuleHandler,
    ModuleRequest,
};
use ucp_ajax::config::{AjaxSettings, Config};
use ucp_ajax::http::request::{Method, Request, RequestBuilder};
use ucp_ajax::http::response::{Response, ResponseBuilder, StatusCode};
use ucp_ajax::modules::StaticRegistry;
use ucp_ajax::panel::PanelContext;

#[derive(Debug, Default)]
pub struct Calls {
    pub accept: AtomicUsize,
    pub custom: AtomicUsize,
    pub handle: AtomicUsize,
    pub poll: AtomicUsize,
}

impl Calls {
    pub fn accept(&self) -> usize {
        self.accept.load(Ordering::SeqCst)
    }

    pub fn custom(&self) -> usize {
        self.custom.load(Ordering::SeqCst)
    }

    pub fn handle(&self) -> usize {
        self.handle.load(Ordering::SeqCst)
    }

    pub fn poll(&self) -> usize {
        self.poll.load(Ordering::SeqCst)
    }
}

/// A module whose every hook is scripted. `None` leaves the hook unimplemented.
#[derive(Clone, Default)]
pub struct ScriptedModule {
    pub calls: Arc<Calls>,
    admission: Option<bool>,
    custom: Option<&'static str>,
    handler: Option<HandlerResult>,
    handler_error: bool,
    poll: Option<Value>,
    poll_delay: Duration,
    poll_error: bool,
}

impl ScriptedModule {
    /// Admits every command and answers with `result`.
    pub fn answering(result: HandlerResult) -> Self {
        Self {
            admission: Some(true),
            handler: Some(result),
            ..Self::default()
        }
    }

    pub fn without_admission() -> Self {
        Self {
            handler: Some(HandlerResult::text("unreachable")),
            ..Self::default()
        }
    }

    pub fn admission(mut self, admitted: bool) -> Self {
        self.admission = Some(admitted);
        self
    }

    pub fn without_handler(mut self) -> Self {
        self.handler = None;
        self
    }

    /// The custom handler takes over and writes `body` as a raw response.
    pub fn custom(mut self, body: &'static str) -> Self {
        self.custom = Some(body);
        self
    }

    pub fn failing_handler(mut self) -> Self {
        self.handler_error = true;
        self
    }

    pub fn polling(mut self, value: Value) -> Self {
        self.poll = Some(value);
        self
    }

    pub fn poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn failing_poll(mut self) -> Self {
        self.poll_error = true;
        self
    }

    pub fn factory(&self) -> impl Fn() -> Arc<dyn ModuleHandler> + Send + Sync + 'static {
        let module = self.clone();
        move || Arc::new(module.clone())
    }
}

#[async_trait]
impl ModuleHandler for ScriptedModule {
    fn accept(&self, _command: &str, _settings: &AjaxSettings) -> Result<bool, HookError> {
        self.calls.accept.fetch_add(1, Ordering::SeqCst);
        self.admission
            .ok_or(HookError::Unsupported(ucp_ajax::ajax::Hook::Admission))
    }

    async fn custom_handle(&self, _request: &ModuleRequest) -> Result<CustomOutcome, HookError> {
        self.calls.custom.fetch_add(1, Ordering::SeqCst);
        match self.custom {
            Some(body) => Ok(CustomOutcome::Handled(
                ResponseBuilder::new(StatusCode::Accepted)
                    .header("Content-Type", "application/octet-stream")
                    .body(body.as_bytes().to_vec())
                    .build(),
            )),
            None => Ok(CustomOutcome::Continue),
        }
    }

    async fn handle(&self, _request: &ModuleRequest) -> Result<HandlerResult, HookError> {
        self.calls.handle.fetch_add(1, Ordering::SeqCst);
        if self.handler_error {
            return Err(anyhow::anyhow!("database is on fire").into());
        }
        self.handler
            .clone()
            .ok_or(HookError::Unsupported(ucp_ajax::ajax::Hook::Handler))
    }

    fn polls(&self) -> bool {
        self.poll.is_some() || self.poll_error
    }

    async fn poll(&self, data: &Value) -> Result<Value, HookError> {
        self.calls.poll.fetch_add(1, Ordering::SeqCst);
        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }
        if self.poll_error {
            return Err(anyhow::anyhow!("poll backend unavailable").into());
        }
        match &self.poll {
            Some(Value::String(s)) if s == "echo" => Ok(data.clone()),
            Some(value) => Ok(value.clone()),
            None => Err(HookError::Unsupported(ucp_ajax::ajax::Hook::Poll)),
        }
    }
}

pub fn panel(registry: StaticRegistry) -> PanelContext {
    PanelContext::new(Config::default(), Arc::new(registry))
}

pub fn dispatcher(panel: PanelContext) -> Dispatcher {
    Dispatcher::new(Arc::new(panel))
}

pub fn get(target: &str, accept: &str) -> Request {
    RequestBuilder::new()
        .method(Method::GET)
        .path(target)
        .header("Host", "pbx.example.com")
        .header("Accept", accept)
        .build()
        .unwrap()
}

pub fn conn() -> ConnectionInfo {
    ConnectionInfo {
        peer: Some("10.0.0.7:51000".parse().unwrap()),
        local: Some("10.0.0.1:8080".parse().unwrap()),
    }
}

pub fn json_body(response: &Response) -> Value {
    serde_json::from_slice(&response.body).unwrap()
}
