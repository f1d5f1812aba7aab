use hangar_auth::AuthError;
use hangar_types::FailureClass;
use thiserror::Error;

/// Result of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// HTTP 200, with the raw response body
    Success(String),
    /// No token could be obtained; no request was sent to the target
    AuthRejected(AuthError),
    /// The registry answered with a non-200 status
    ServerError { status: u16, message: String },
    /// Connect, timeout or IO failure
    TransportFailure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Convert into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<String, DispatchError> {
        match self {
            Outcome::Success(body) => Ok(body),
            Outcome::AuthRejected(err) => Err(DispatchError::Auth(err)),
            Outcome::ServerError { status, message } => {
                Err(DispatchError::Server { status, message })
            }
            Outcome::TransportFailure(cause) => Err(DispatchError::Transport(cause)),
        }
    }
}

/// Error form of a failed [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("authentication failed: {0}")]
    Auth(#[source] AuthError),
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl DispatchError {
    pub fn class(&self) -> FailureClass {
        match self {
            DispatchError::Auth(_) => FailureClass::Auth,
            DispatchError::Server { .. } => FailureClass::Server,
            DispatchError::Transport(_) => FailureClass::Transport,
        }
    }
}
