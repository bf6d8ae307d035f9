//! Request dispatch.
//!
//! ```text
//!   request ──► RequestContext ──► poll? ──yes──► PollAggregator ─────────┐
//!                                    │                                   │
//!                                    no                                  │
//!                                    ▼                                   ▼
//!                             ModuleResolver ──► accept ──► custom ──► handle
//!                                                   │          │         │
//!                                                403/501   Handled    normalize
//!                                                   │          │         │
//!                                                   ▼          ▼         ▼
//!                                          error envelope   raw resp   serialize
//! ```
//!
//! Every failure ends the request with an `{"error": ...}` envelope. The only
//! path that skips serialization is a custom handler returning
//! [`CustomOutcome::Handled`].

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

use crate::ajax::context::{
    ConnectionInfo, DispatchRequest, ModuleRequest, RequestContext, poll_data,
};
use crate::ajax::error::DispatchError;
use crate::ajax::handler::{CustomOutcome, HookError};
use crate::ajax::headers::ResponseHeaderSet;
use crate::ajax::poll::PollAggregator;
use crate::ajax::resolver::{ModuleHandle, ModuleResolver};
use crate::ajax::serializer::{Format, generate_response, render};
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::panel::PanelContext;

enum Outcome {
    Body(Value),
    Raw(Response),
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    panel: Arc<PanelContext>,
}

impl Dispatcher {
    pub fn new(panel: Arc<PanelContext>) -> Self {
        Self { panel }
    }

    pub fn panel(&self) -> &PanelContext {
        &self.panel
    }

    pub fn context_for(&self, request: &Request, conn: &ConnectionInfo) -> RequestContext {
        RequestContext::from_request(request, conn, &self.panel.config().server.script_path)
    }

    /// Entry point used by the transport.
    pub async fn handle(&self, request: &Request, conn: &ConnectionInfo) -> Response {
        let context = self.context_for(request, conn);
        let params = request.params();
        let route = DispatchRequest::from_params(&params);
        self.dispatch(context, route, params).await
    }

    pub async fn dispatch(
        &self,
        context: RequestContext,
        route: DispatchRequest,
        params: Vec<(String, String)>,
    ) -> Response {
        let mut headers = ResponseHeaderSet::new();

        let outcome = if route.is_poll {
            let data = poll_data(&params, &context);
            PollAggregator::new(self.panel.registry().as_ref())
                .poll(data)
                .await
                .map(Outcome::Body)
        } else {
            self.dispatch_module(&context, &route, params).await
        };

        match outcome {
            Ok(Outcome::Raw(response)) => {
                debug!(module = ?route.module, "Custom handler produced the response");
                response
            }
            Ok(Outcome::Body(body)) => {
                headers.set_status(StatusCode::Ok);
                info!(
                    module = ?route.module,
                    command = ?route.command,
                    poll = route.is_poll,
                    status = 200,
                    "Request dispatched"
                );
                self.respond(&context, &mut headers, body)
            }
            Err(err) => {
                warn!(
                    module = ?route.module,
                    command = ?route.command,
                    status = err.status().as_u16(),
                    error = %err,
                    "Request failed"
                );
                self.error_response(&context, &mut headers, &err)
            }
        }
    }

    /// Answer for a request the transport gave up on.
    pub fn timed_out(&self, request: &Request, conn: &ConnectionInfo) -> Response {
        let context = self.context_for(request, conn);
        warn!(uri = %context.uri, "Request timed out");
        self.error_response(&context, &mut ResponseHeaderSet::new(), &DispatchError::TimedOut)
    }

    /// Error envelope for `err`, sent through the normal header and
    /// negotiation path.
    pub fn error_response(
        &self,
        context: &RequestContext,
        headers: &mut ResponseHeaderSet,
        err: &DispatchError,
    ) -> Response {
        headers.set_status(err.status());
        self.respond(context, headers, json!({ "error": err.to_string() }))
    }

    async fn dispatch_module(
        &self,
        context: &RequestContext,
        route: &DispatchRequest,
        params: Vec<(String, String)>,
    ) -> Result<Outcome, DispatchError> {
        let (module, command) = route.target().ok_or(DispatchError::MissingRoute)?;

        let mut resolver = ModuleResolver::new(&self.panel);
        let handle = resolver.resolve(module)?;

        let request = ModuleRequest {
            module: handle.name.clone(),
            command: command.to_string(),
            context: context.clone(),
            params,
        };
        self.invoke(&handle, &request).await
    }

    /// Runs the handler protocol: admission, optional custom short-circuit,
    /// then standard handling.
    async fn invoke(&self, handle: &ModuleHandle, request: &ModuleRequest) -> Result<Outcome, DispatchError> {
        let handler = &handle.handler;

        let admitted = handler
            .accept(&request.command, self.panel.settings())
            .map_err(|e| hook_failure(&handle.name, e))?;
        if !admitted {
            return Err(DispatchError::Forbidden);
        }

        match handler.custom_handle(request).await {
            Ok(CustomOutcome::Handled(response)) => return Ok(Outcome::Raw(response)),
            Ok(CustomOutcome::Continue) | Err(HookError::Unsupported(_)) => {}
            Err(e) => return Err(hook_failure(&handle.name, e)),
        }

        let result = handler
            .handle(request)
            .await
            .map_err(|e| hook_failure(&handle.name, e))?;
        result.into_body().map(Outcome::Body)
    }

    fn respond(&self, context: &RequestContext, headers: &mut ResponseHeaderSet, body: Value) -> Response {
        let bytes = match generate_response(body, &context.accept, headers) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "Response serialization failed");
                headers.set_status(StatusCode::InternalServerError);
                headers.add_header("Content-Type", Format::Json.content_type());
                let mut envelope = Map::new();
                envelope.insert(
                    "error".to_string(),
                    Value::String(DispatchError::GenericFailure.to_string()),
                );
                render(&envelope, Format::Json).unwrap_or_default()
            }
        };

        let mut response = headers
            .send(&context.verb, ResponseBuilder::new(StatusCode::Ok))
            .body(bytes)
            .build();
        // HEAD keeps the Content-Length of the body it would have sent
        if context.verb == "head" {
            response.body.clear();
        }
        response
    }
}

fn hook_failure(module: &str, err: HookError) -> DispatchError {
    match err {
        HookError::Unsupported(hook) => DispatchError::NotImplemented(hook),
        HookError::Failed(e) => {
            error!(module, error = %e, "Module hook failed");
            DispatchError::GenericFailure
        }
    }
}
