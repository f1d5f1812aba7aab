//! Authenticated request dispatch for the Hangar API.
//!
//! [`Dispatcher::execute`] performs exactly one request against
//! `endpoint + relative_path`: it obtains a token from the shared
//! [`TokenStore`], attaches it as the raw `Authorization` header, sends an
//! optional JSON or multipart body and classifies the response into an
//! [`Outcome`]. Failures are logged and returned, never retried.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hangar_auth::{HttpAuthenticator, TokenStore};
//! use hangar_client::{Dispatcher, Method, RequestBody};
//!
//! let tokens = Arc::new(TokenStore::new(HttpAuthenticator::new()?));
//! let dispatcher = Dispatcher::new(tokens)?;
//! let body = RequestBody::json(&serde_json::json!({"path": "", "content": "# Hello"}))?;
//! let outcome = dispatcher.execute(
//!     Method::PATCH,
//!     "https://hangar.papermc.io/api/v1/",
//!     "pages/edit/my-plugin",
//!     "api-key",
//!     Some(body),
//! );
//! println!("{outcome:?}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hangar_auth::{AuthError, CredentialKey, TokenStore, USER_AGENT};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

mod error_body;
mod outcome;

pub use error_body::parse_error_message;
pub use outcome::{DispatchError, Outcome};
pub use reqwest::Method;

/// Default timeout for API requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Body of a dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent as `application/json`
    Json(Value),
    /// Sent as `multipart/form-data`
    Multipart(MultipartBody),
}

impl RequestBody {
    pub fn json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(RequestBody::Json(serde_json::to_value(value)?))
    }
}

/// A JSON part followed by zero or more file parts.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartBody {
    pub json_part: String,
    pub json: Value,
    pub files: Vec<FilePart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub part_name: String,
    pub path: PathBuf,
}

impl MultipartBody {
    fn into_form(self) -> Result<Form> {
        let json = serde_json::to_string(&self.json).context("failed to serialize JSON part")?;
        let part = Part::text(json)
            .mime_str("application/json")
            .context("invalid JSON part mime type")?;
        let mut form = Form::new().part(self.json_part, part);
        for file in self.files {
            let part = Part::file(&file.path)
                .with_context(|| format!("failed to read {}", file.path.display()))?
                .mime_str("application/octet-stream")
                .context("invalid file part mime type")?;
            form = form.part(file.part_name, part);
        }
        Ok(form)
    }
}

/// Blocking client with the request timeout and user agent used for every
/// Hangar call.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}

/// Executes authenticated requests against Hangar.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    tokens: Arc<TokenStore>,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with the default timeout.
    pub fn new(tokens: Arc<TokenStore>) -> Result<Self> {
        Self::with_timeout(tokens, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a dispatcher whose requests time out after `timeout`.
    pub fn with_timeout(tokens: Arc<TokenStore>, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(http_client(timeout)?, tokens, timeout))
    }

    /// Use an existing client, e.g. one shared with an [`HttpAuthenticator`].
    ///
    /// [`HttpAuthenticator`]: hangar_auth::HttpAuthenticator
    pub fn with_client(client: Client, tokens: Arc<TokenStore>, timeout: Duration) -> Self {
        Self {
            client,
            tokens,
            timeout,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform one authenticated request.
    ///
    /// The body is prepared before a token is requested, so an unreadable
    /// file part never triggers authentication. When no token can be
    /// obtained nothing is sent to the target.
    pub fn execute(
        &self,
        method: Method,
        endpoint: &str,
        relative_path: &str,
        api_key: &str,
        body: Option<RequestBody>,
    ) -> Outcome {
        let url = format!("{endpoint}{relative_path}");

        let prepared = match body {
            None => PreparedBody::None,
            Some(RequestBody::Json(value)) => PreparedBody::Json(value),
            Some(RequestBody::Multipart(multipart)) => match multipart.into_form() {
                Ok(form) => PreparedBody::Form(form),
                Err(e) => {
                    let cause = format!("{e:#}");
                    error!(%endpoint, path = relative_path, error = %cause, "failed to build request body");
                    return Outcome::TransportFailure(cause);
                }
            },
        };

        let key = CredentialKey::new(endpoint, api_key);
        let token = match self.tokens.get_token(&key) {
            Ok(token) => token,
            Err(AuthError::Transport(cause)) => {
                debug!(%endpoint, error = %cause, "could not reach authentication endpoint");
                return Outcome::TransportFailure(cause);
            }
            Err(err) => {
                debug!(%endpoint, path = relative_path, error = %err, "authentication failed");
                return Outcome::AuthRejected(err);
            }
        };

        let request = self
            .client
            .request(method.clone(), url.as_str())
            .header(AUTHORIZATION, token.value());
        let request = match prepared {
            PreparedBody::None => request,
            PreparedBody::Json(value) => request.json(&value),
            PreparedBody::Form(form) => request.multipart(form),
        };

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => {
                error!(%method, %endpoint, path = relative_path, error = %e, "request failed");
                return Outcome::TransportFailure(e.to_string());
            }
        };

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("Unknown Status");
        let text = match response.text() {
            Ok(text) => text,
            Err(e) if status == StatusCode::OK => {
                error!(%method, %endpoint, path = relative_path, error = %e, "failed to read response");
                return Outcome::TransportFailure(format!("failed to read response: {e}"));
            }
            Err(e) => {
                debug!(%method, %endpoint, path = relative_path, error = %e, "failed to read error body");
                String::new()
            }
        };

        if status == StatusCode::OK {
            debug!(%method, %endpoint, path = relative_path, "request succeeded");
            return Outcome::Success(text);
        }

        let message = parse_error_message(&text, reason);
        error!(
            %method,
            %endpoint,
            path = relative_path,
            status = status.as_u16(),
            %message,
            "registry rejected request"
        );
        Outcome::ServerError {
            status: status.as_u16(),
            message,
        }
    }
}

enum PreparedBody {
    None,
    Json(Value),
    Form(Form),
}
