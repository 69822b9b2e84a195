use labstore_api::ErrorBody;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx status; the body is whatever structured error the server sent.
    #[error("{}", describe_rejection(.status, .body))]
    Rejected { status: u16, body: ErrorBody },
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

fn describe_rejection(status: &u16, body: &ErrorBody) -> String {
    body.summary()
        .unwrap_or_else(|| format!("Request failed (status: {status})"))
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            BackendError::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// Convenience for building a rejection from a bare message.
    pub fn rejected(status: u16, error: impl Into<String>) -> Self {
        BackendError::Rejected {
            status,
            body: ErrorBody {
                error: Some(error.into()),
                ..Default::default()
            },
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}
