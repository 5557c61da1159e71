#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("auth token not set")]
    MissingToken,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Whether the backend rejected our credentials (as opposed to the
    /// request itself failing).
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::MissingToken | Self::Status { status: 401 | 403, .. }
        )
    }

    /// Server-side failures worth retrying. Client errors are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            status: code,
            message: String::new(),
        }
    }

    #[test]
    fn five_hundreds_are_retryable() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(422).is_retryable());
        assert!(!ApiError::MissingToken.is_retryable());
    }

    #[test]
    fn auth_rejections_are_recognized() {
        assert!(status(401).is_auth());
        assert!(status(403).is_auth());
        assert!(ApiError::MissingToken.is_auth());
        assert!(!status(500).is_auth());
    }
}
