//! Dispatcher core: routes a request to a module (or the poll fan-out), runs
//! the handler protocol and serializes the result.
//!
//! - **`context`**: request snapshot, routing parameters, poll payload
//! - **`resolver`**: module name to handler, with the identity checks
//! - **`handler`**: the `ModuleHandler` trait and result normalization
//! - **`poll`**: concurrent poll aggregation
//! - **`headers`**: status line and header accumulation, CORS
//! - **`serializer`**: Accept negotiation, JSON and XML bodies
//! - **`dispatcher`**: ties the above together
//! - **`error`**: failure taxonomy and status mapping

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod headers;
pub mod poll;
pub mod resolver;
pub mod serializer;

pub use context::{ConnectionInfo, DispatchRequest, ModuleRequest, RequestContext};
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use handler::{CustomOutcome, HandlerResult, Hook, HookError, ModuleHandler, Payload};
pub use headers::ResponseHeaderSet;
pub use resolver::{ModuleHandle, ModuleResolver};

/// Upper-cases the first character and leaves the rest alone.
pub(crate) fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
