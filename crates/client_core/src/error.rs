use shared::error::{ApiError, ApiException, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No session token is held; nothing was sent.
    #[error("not signed in")]
    NotAuthenticated,
    #[error("authentication rejected: {0}")]
    Unauthenticated(String),
    #[error("not permitted: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Api(#[from] ApiException),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("token storage failure: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn storage(err: anyhow::Error) -> Self {
        ClientError::Storage(format!("{err:#}"))
    }

    /// Text shown to the user. Server-provided messages are returned verbatim.
    pub fn message(&self) -> String {
        match self {
            ClientError::Unauthenticated(message) | ClientError::Forbidden(message) => {
                message.clone()
            }
            ClientError::Api(err) => err.message.clone(),
            other => other.to_string(),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, ClientError::Unauthenticated(_))
    }
}

impl From<ApiError> for ClientError {
    fn from(value: ApiError) -> Self {
        match value.code {
            ErrorCode::Unauthenticated => ClientError::Unauthenticated(value.message),
            ErrorCode::Forbidden => ClientError::Forbidden(value.message),
            _ => ClientError::Api(value.into()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ClientError::Decode(value.to_string())
        } else if value.is_timeout() {
            ClientError::Transport(format!("request timed out: {value}"))
        } else {
            ClientError::Transport(value.to_string())
        }
    }
}
