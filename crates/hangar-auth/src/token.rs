use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::authenticator::{AuthError, Authenticator};
use crate::mask_key;

/// Tokens are renewed this many milliseconds before they expire.
pub const RENEWAL_SKEW_MS: i64 = 3_000;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cache key: the endpoint a token was issued by and the API key it was
/// issued for.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CredentialKey {
    pub endpoint: String,
    pub api_key: String,
}

impl CredentialKey {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialKey")
            .field("endpoint", &self.endpoint)
            .field("api_key", &mask_key(&self.api_key))
            .finish()
    }
}

/// A short-lived bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Token that expires `expires_in_ms` milliseconds after `now`.
    pub fn expiring_in(value: impl Into<String>, expires_in_ms: i64, now: DateTime<Utc>) -> Self {
        let expires_at = TimeDelta::try_milliseconds(expires_in_ms)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(if expires_in_ms < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            });
        Self::new(value, expires_at)
    }

    /// Raw value sent in the `Authorization` header.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once `now` reaches the renewal threshold
    /// (`expires_at - RENEWAL_SKEW_MS`).
    pub fn should_renew_at(&self, now: DateTime<Utc>) -> bool {
        let threshold = self
            .expires_at
            .checked_sub_signed(TimeDelta::milliseconds(RENEWAL_SKEW_MS))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        now >= threshold
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &mask_key(&self.value))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

type Slot = Arc<Mutex<Option<Token>>>;

/// Process-wide token cache.
///
/// Each credential key owns a slot with its own lock. A caller holds the
/// slot lock while it checks and, if needed, renews the token, so
/// concurrent first use of a key results in one authentication call and
/// the other callers reuse its result. Different keys never wait on each
/// other's network calls.
pub struct TokenStore {
    authenticator: Arc<dyn Authenticator>,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<CredentialKey, Slot>>,
}

impl TokenStore {
    pub fn new(authenticator: impl Authenticator + 'static) -> Self {
        Self::from_arc(Arc::new(authenticator))
    }

    pub fn from_arc(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            clock: Arc::new(SystemClock),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the clock used for renewal decisions.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Return a valid token for `key`, authenticating if none is cached or
    /// the cached one is due for renewal.
    ///
    /// A failed authentication leaves the previous entry in place.
    pub fn get_token(&self, key: &CredentialKey) -> Result<Token, AuthError> {
        let slot = self.slot(key);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(token) = entry.as_ref()
            && !self.should_renew(token)
        {
            debug!(endpoint = %key.endpoint, "reusing cached token");
            return Ok(token.clone());
        }

        debug!(endpoint = %key.endpoint, renewing = entry.is_some(), "requesting token");
        let token = self.authenticator.authenticate(key)?;
        *entry = Some(token.clone());
        Ok(token)
    }

    pub fn should_renew(&self, token: &Token) -> bool {
        token.should_renew_at(self.clock.now())
    }

    /// Currently cached token for `key`, valid or not.
    pub fn cached(&self, key: &CredentialKey) -> Option<Token> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.get(key)?)
        };
        let entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        entry.clone()
    }

    fn slot(&self, key: &CredentialKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("TokenStore")
            .field("keys", &slots.len())
            .finish()
    }
}
