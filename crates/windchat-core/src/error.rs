//! Error types for the chat core.

use thiserror::Error;

use crate::state::ConversationId;

/// Failures surfaced by a [`SyncGateway`](crate::gateway::SyncGateway).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Network, timeout, unexpected status, or body parse failure
    #[error("{0}")]
    Transport(String),

    /// The backend rejected the credential
    #[error("authentication rejected: {0}")]
    Auth(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Transport("timeout".to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Errors returned by [`SessionController`](crate::controller::SessionController) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Input rejected before any state was touched
    #[error("invalid input: {0}")]
    Validation(&'static str),

    /// Another send is already in flight
    #[error("a request is already in flight")]
    ConcurrencyViolation,

    #[error("conversation '{0}' not found")]
    NotFound(ConversationId),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type SessionResult<T> = Result<T, SessionError>;
