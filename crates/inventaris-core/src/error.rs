use serde::Deserialize;

/// A failure reported by the hosted backend (auth, table or object store).
///
/// `status` is `None` when the request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub status: Option<u16>,
    pub message: String,
}

/// Error body shapes the backend services return. Auth uses `msg` or
/// `error_description`, tables use `message`, storage uses `error`.
#[derive(Deserialize, Default)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl BackendError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Build from a non-success response body, falling back to the raw text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .msg
            .or(parsed.message)
            .or(parsed.error_description)
            .or(parsed.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                let raw = body.trim();
                if raw.is_empty() {
                    format!("request failed with status {status}")
                } else {
                    raw.to_owned()
                }
            });
        Self::new(Some(status), message)
    }

    /// The request did not complete (connect, timeout, decode).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    pub fn kind(&self) -> &'static str {
        match self.status {
            None => "TRANSPORT",
            Some(400) | Some(422) => "BAD_REQUEST",
            Some(401) => "UNAUTHORIZED",
            Some(403) => "FORBIDDEN",
            Some(404) => "NOT_FOUND",
            Some(409) => "CONFLICT",
            Some(413) => "PAYLOAD_TOO_LARGE",
            Some(429) => "RATE_LIMITED",
            Some(_) => "BACKEND",
        }
    }
}
