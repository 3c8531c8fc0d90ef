// Error types for talking to the platform API.
//
// Commands use `anyhow::Result` at their boundary (same as the rest of the
// CLI). The API layer keeps a typed error so callers can branch on the
// remote error code, e.g. `authorization_pending` while polling for a token.

use serde::Deserialize;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a structured `{error, error_description}` body.
    #[error("{}", format_remote(.code, .description))]
    Remote {
        code: String,
        description: Option<String>,
    },

    /// Non-success status with a body we could not interpret.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Rejected locally before any request was sent.
    #[error("{0}")]
    InvalidInput(String),
}

fn format_remote(code: &str, description: &Option<String>) -> String {
    match description.as_deref() {
        Some(d) if !d.is_empty() => format!("{}: {}", code, d),
        _ => code.to_string(),
    }
}

/// Wire shape of an error body.
#[derive(Debug, Deserialize)]
pub(crate) struct RemoteErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ApiError {
    /// Build an error from a non-success response body.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<RemoteErrorBody>(body) {
            Ok(parsed) => ApiError::Remote {
                code: parsed.error,
                description: parsed.error_description,
            },
            Err(_) => ApiError::Status {
                status,
                body: body.to_string(),
            },
        }
    }

    /// The remote error code, if the backend supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Remote { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Remote { code, .. } => code.eq_ignore_ascii_case("unauthorized"),
            ApiError::Status { status, .. } => *status == 401,
            _ => false,
        }
    }

    pub fn is_code(&self, candidates: &[&str]) -> bool {
        self.code()
            .map(|c| candidates.iter().any(|k| c.eq_ignore_ascii_case(k)))
            .unwrap_or(false)
    }

    /// Text shown to the user. Expired or revoked tokens get a re-login hint
    /// instead of the raw code.
    pub fn user_message(&self) -> String {
        if self.is_unauthorized() {
            "authentication failed. Please run 'flux-relay login' again".to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_asks_for_login() {
        let err = ApiError::from_body(401, r#"{"error":"Unauthorized"}"#);
        assert!(err.is_unauthorized());
        assert!(err.user_message().contains("flux-relay login"));

        let err = ApiError::from_body(401, "nope");
        assert!(err.is_unauthorized());

        let err = ApiError::InvalidInput("bad id".into());
        assert_eq!(err.user_message(), "bad id");
    }

    #[test]
    fn test_structured_body_becomes_remote() {
        let err = ApiError::from_body(
            400,
            r#"{"error":"access_denied","error_description":"user said no"}"#,
        );
        assert_eq!(err.code(), Some("access_denied"));
        assert_eq!(err.to_string(), "access_denied: user said no");
    }

    #[test]
    fn test_remote_without_description() {
        let err = ApiError::from_body(404, r#"{"error":"Project not found"}"#);
        assert_eq!(err.to_string(), "Project not found");
        assert!(err.is_code(&["project not found"]));
    }

    #[test]
    fn test_unstructured_body_keeps_status() {
        let err = ApiError::from_body(502, "Bad Gateway");
        assert!(err.code().is_none());
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_unauthorized_detection() {
        assert!(ApiError::from_body(401, r#"{"error":"Unauthorized"}"#).is_unauthorized());
        assert!(ApiError::from_body(401, "nope").is_unauthorized());
        assert!(!ApiError::from_body(500, "boom").is_unauthorized());
    }
}
