/// Errors raised while running a chat turn.
///
/// None of these escape `AgentClient::chat`; they are converted into an
/// error-shaped `Summary` at the end of the turn.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The request exceeded the configured ceiling.
    #[error("Request took longer than {seconds} seconds")]
    Timeout { seconds: u64 },
    /// The endpoint answered with a non-success status.
    #[error("Request error: HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Connection or body read failure.
    #[error("Request error: {0}")]
    Transport(String),
    /// The token provider could not supply a bearer token.
    #[error("Unexpected error: {0}")]
    Credentials(String),
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// The caller's input was rejected before any request was sent.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl ChatError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Short title used for the error notification.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "Request timeout",
            Self::Http { .. } | Self::Transport(_) => "Request failed",
            Self::Credentials(_) | Self::Config(_) => "Unexpected error",
            Self::Validation(_) => "Invalid request",
        }
    }

    /// HTTP status captured for diagnostics, if the endpoint answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure reported by a `NotificationSink`.
///
/// Always absorbed by the notifier; only logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The surface rejected the call (stale handle, missing channel, etc.).
    #[error("notification rejected: {0}")]
    Rejected(String),
    /// The surface could not be reached.
    #[error("notification surface unavailable: {0}")]
    Unavailable(String),
    /// The call did not finish within the notifier's time bound.
    #[error("notification timed out after {0:?}")]
    TimedOut(std::time::Duration),
}
