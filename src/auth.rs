// Device-code polling. The user finishes the login in a browser while the
// CLI polls the token endpoint until it gets a token or a terminal error.

use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::api::{ApiClient, TokenResponse};
use crate::error::{ApiError, ApiResult};

pub const MAX_POLLS: u32 = 120;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
/// "Invalid device code" this early is usually the backend not having
/// registered the code yet.
const INVALID_CODE_GRACE: u32 = 3;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization was denied")]
    Denied,

    #[error(
        "device code not found after multiple attempts. Please make sure:\n   \
         1. You've opened the verification URL in your browser\n   \
         2. You've logged in successfully\n   \
         3. The device code hasn't expired (10 minutes)\n   \
         4. Try running 'flux-relay login' again"
    )]
    UnknownCode,

    #[error("device code expired. Please run 'flux-relay login' again to get a new code")]
    Expired,

    #[error("authentication timed out after {0} attempts. Please try again")]
    TimedOut(u32),

    /// The request never left the machine; retrying cannot help.
    #[error("{0}")]
    Rejected(String),
}

/// One poll of the token endpoint.
pub trait TokenPoller {
    fn poll_token(&self, device_code: &str) -> ApiResult<TokenResponse>;
}

impl TokenPoller for ApiClient {
    fn poll_token(&self, device_code: &str) -> ApiResult<TokenResponse> {
        self.get_token(device_code)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    /// Use the server-supplied interval (seconds), falling back to the default.
    pub fn from_server_interval(seconds: u64) -> Self {
        let interval = if seconds == 0 {
            DEFAULT_INTERVAL
        } else {
            Duration::from_secs(seconds)
        };
        PollPolicy {
            max_attempts: MAX_POLLS,
            interval,
        }
    }
}

/// Poll until a token arrives. The first poll is immediate; `on_attempt` is
/// called after every unsuccessful poll with the attempt number.
pub fn poll_for_token<P: TokenPoller>(
    poller: &P,
    device_code: &str,
    policy: PollPolicy,
    mut on_attempt: impl FnMut(u32),
) -> Result<TokenResponse, AuthError> {
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 && !policy.interval.is_zero() {
            thread::sleep(policy.interval);
        }

        let err = match poller.poll_token(device_code) {
            Ok(token) => return Ok(token),
            Err(err) => err,
        };
        debug!(attempt, error = %err, "token not ready");

        match classify(&err) {
            PollError::Pending => {}
            PollError::Denied => return Err(AuthError::Denied),
            PollError::Expired => return Err(AuthError::Expired),
            PollError::Local => return Err(AuthError::Rejected(err.to_string())),
            PollError::UnknownCode if attempt > INVALID_CODE_GRACE => {
                return Err(AuthError::UnknownCode)
            }
            PollError::UnknownCode | PollError::Transient => {}
        }
        on_attempt(attempt);
    }
    Err(AuthError::TimedOut(policy.max_attempts))
}

enum PollError {
    Pending,
    Denied,
    Expired,
    UnknownCode,
    Local,
    Transient,
}

fn classify(err: &ApiError) -> PollError {
    if matches!(err, ApiError::InvalidInput(_)) {
        PollError::Local
    } else if err.is_code(&["authorization_pending"]) {
        PollError::Pending
    } else if err.is_code(&["access_denied"]) {
        PollError::Denied
    } else if err.is_code(&["device_code_expired", "Device code expired"]) {
        PollError::Expired
    } else if err.is_code(&["invalid_device_code", "Invalid device code"]) {
        PollError::UnknownCode
    } else {
        PollError::Transient
    }
}
