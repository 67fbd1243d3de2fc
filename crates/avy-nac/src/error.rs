//! Avalanche API error types.

use avy_core::{AppError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NacError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Unparsable {product} from {url}: {message}")]
    Decode {
        product: String,
        url: String,
        message: String,
    },
}

impl From<reqwest::Error> for NacError {
    fn from(err: reqwest::Error) -> Self {
        NacError::Network(err.into_network_error())
    }
}

impl NacError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(e) => e.user_message(),
            Self::Decode { .. } => "The avalanche center returned data we could not read.",
        }
    }

    /// Whether this error is worth retrying later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(NetworkError::Timeout)
                | Self::Network(NetworkError::ConnectionFailed(_))
                | Self::Network(NetworkError::ServerError { status: 500..=599, .. })
        )
    }
}

impl From<NacError> for AppError {
    fn from(e: NacError) -> Self {
        match e {
            NacError::Network(e) => AppError::Network(e),
            other => AppError::Service {
                user_message: other.user_message(),
                detail: other.to_string(),
            },
        }
    }
}
