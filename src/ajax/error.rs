use thiserror::Error;

use crate::ajax::handler::Hook;
use crate::http::response::StatusCode;

/// Every way a dispatch can end without a successful payload.
///
/// `Display` is the message put in the `{"error": ...}` envelope, so it must
/// never carry internal detail.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Module or Command were null. Check your code.")]
    MissingRoute,

    #[error("The class {0} already existed. Ajax MUST load it, for security reasons")]
    ModuleAlreadyLoaded(String),

    #[error("Module requested invalid")]
    InvalidModule(String),

    #[error("Module {0} not found")]
    ModuleNotFound(String),

    #[error("{0} not found")]
    NotImplemented(Hook),

    #[error("ajaxRequest declined")]
    Forbidden,

    #[error("Unknown Error")]
    GenericFailure,

    /// A module ended the request with its own status and message.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Request timed out")]
    TimedOut,
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotImplemented(_) => StatusCode::NotImplemented,
            DispatchError::Forbidden => StatusCode::Forbidden,
            DispatchError::Rejected { status, .. } => *status,
            DispatchError::TimedOut => StatusCode::ServiceUnavailable,
            DispatchError::MissingRoute
            | DispatchError::ModuleAlreadyLoaded(_)
            | DispatchError::InvalidModule(_)
            | DispatchError::ModuleNotFound(_)
            | DispatchError::GenericFailure => StatusCode::InternalServerError,
        }
    }
}
