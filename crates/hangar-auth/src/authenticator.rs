use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

use crate::token::{Clock, CredentialKey, SystemClock, Token};

/// Default timeout for the authentication request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("hangar-publish/", env!("CARGO_PKG_VERSION"));

/// Why a token could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("bad api key (HTTP 400); is the API key correct?")]
    BadApiKey,
    #[error("unexpected status {status}: {reason}")]
    UnexpectedStatus { status: u16, reason: String },
    #[error("malformed auth response: {0}")]
    Malformed(String),
    #[error("authentication request failed: {0}")]
    Transport(String),
}

/// Exchanges a credential key for a fresh token.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, key: &CredentialKey) -> Result<Token, AuthError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    expires_in: i64,
}

/// Authenticator speaking Hangar's `authenticate?apiKey=` protocol.
#[derive(Clone)]
pub struct HttpAuthenticator {
    client: Client,
    clock: Arc<dyn Clock>,
}

impl HttpAuthenticator {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(client))
    }

    /// Reuse an existing client, e.g. the dispatcher's.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to compute expiry times.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Authenticator for HttpAuthenticator {
    fn authenticate(&self, key: &CredentialKey) -> Result<Token, AuthError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}authenticate", key.endpoint),
            &[("apiKey", key.api_key.as_str())],
        )
        .map_err(|e| AuthError::Transport(format!("invalid endpoint '{}': {e}", key.endpoint)))?;

        let response = self.client.post(url).send().map_err(|e| {
            error!(endpoint = %key.endpoint, error = %e, "authentication request failed");
            AuthError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            error!(endpoint = %key.endpoint, "bad JWT request (400); is the API key correct?");
            return Err(AuthError::BadApiKey);
        }
        if status != StatusCode::OK {
            let reason = status.canonical_reason().unwrap_or("unknown").to_string();
            error!(endpoint = %key.endpoint, status = status.as_u16(), %reason, "error requesting JWT");
            return Err(AuthError::UnexpectedStatus {
                status: status.as_u16(),
                reason,
            });
        }

        let body = response
            .text()
            .map_err(|e| AuthError::Transport(format!("failed to read auth response: {e}")))?;
        parse_auth_response(&body, self.clock.now())
    }
}

fn parse_auth_response(body: &str, now: chrono::DateTime<chrono::Utc>) -> Result<Token, AuthError> {
    let parsed: AuthResponse =
        serde_json::from_str(body).map_err(|e| AuthError::Malformed(e.to_string()))?;
    Ok(Token::expiring_in(parsed.token, parsed.expires_in, now))
}
