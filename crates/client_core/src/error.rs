use thiserror::Error;

use crate::action::ActionKind;

pub const BOOTSTRAP_FAILURE_MESSAGE: &str = "Failed to create a new session. Please reload.";

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("simulator unreachable: {0}")]
    Network(String),
    #[error("simulator responded with status {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },
    #[error("malformed simulator response: {0}")]
    Decode(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(": {detail}"))
        .unwrap_or_default()
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PlaygroundError {
    #[error("session not ready")]
    SessionNotReady,
    #[error("another action is in progress: {active}")]
    Busy { active: ActionKind },
    #[error("{}", BOOTSTRAP_FAILURE_MESSAGE)]
    Bootstrap(#[source] TransportError),
    #[error("{action} failed: {source}")]
    Action {
        action: ActionKind,
        #[source]
        source: TransportError,
    },
    #[error("state refresh failed: {0}")]
    Refresh(#[source] TransportError),
}

impl PlaygroundError {
    /// Banner text for failures reported by the simulator. Local refusals
    /// carry no message of their own.
    pub fn banner_message(&self) -> Option<&'static str> {
        match self {
            PlaygroundError::Action { action, .. } => Some(action.failure_message()),
            PlaygroundError::Bootstrap(_) => Some(BOOTSTRAP_FAILURE_MESSAGE),
            PlaygroundError::SessionNotReady
            | PlaygroundError::Busy { .. }
            | PlaygroundError::Refresh(_) => None,
        }
    }
}
