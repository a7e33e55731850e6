use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transient network failure: {0}")]
    TransientNetworkFailure(String),

    #[error("Remote error {status}: {body}")]
    RemoteError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No network access in offline mode (requested {0})")]
    Offline(String),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::TransientNetworkFailure(_) => true,
            FetchError::RemoteError { status, .. } => *status == 429 || *status >= 500,
            FetchError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// True for a 404 from the service.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::RemoteError { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::TransientNetworkFailure("reset".into()).is_transient());
        assert!(
            FetchError::RemoteError {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            FetchError::RemoteError {
                status: 429,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !FetchError::RemoteError {
                status: 401,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!FetchError::InvalidUrl("x".into()).is_transient());
        assert!(!FetchError::Offline("x".into()).is_transient());
    }

    #[test]
    fn test_not_found() {
        let err = FetchError::RemoteError {
            status: 404,
            body: "missing".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Remote error 404: missing");
    }
}
