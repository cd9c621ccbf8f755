use std::time::Duration;

use crate::credentials::TokenType;
use crate::errors::ChatError;

/// Default ceiling for one request, body read included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Default bound on a single notification sink call.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for `AgentClient`.
#[derive(Clone)]
pub struct AgentClientConfig {
    /// Full URL of the agent run endpoint.
    pub agent_url: String,
    /// Bearer token (personal access token, JWT or OAuth token).
    pub token: String,
    /// Value of the token-type header.
    pub token_type: TokenType,
    /// Request timeout.
    pub timeout: Duration,
    /// Time bound for each notification sink call.
    pub notify_timeout: Duration,
}

impl std::fmt::Debug for AgentClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClientConfig")
            .field("agent_url", &self.agent_url)
            .field("token", &"***")
            .field("token_type", &self.token_type)
            .field("timeout", &self.timeout)
            .field("notify_timeout", &self.notify_timeout)
            .finish()
    }
}

impl AgentClientConfig {
    /// Creates a config with default timeouts and token type.
    pub fn new(agent_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            agent_url: agent_url.into(),
            token: token.into(),
            token_type: TokenType::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Builds a config from the process environment.
    ///
    /// - `CORTEX_AGENT_URL` (required)
    /// - `CORTEX_AGENT_TOKEN` (required)
    /// - `CORTEX_AGENT_TOKEN_TYPE` (optional, default `PROGRAMMATIC_ACCESS_TOKEN`)
    /// - `CORTEX_AGENT_TIMEOUT_SECS` (optional, default 120)
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ChatError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ChatError::Config(format!("missing {key}")))
        };
        let mut config = Self::new(required("CORTEX_AGENT_URL")?, required("CORTEX_AGENT_TOKEN")?);
        if let Some(raw) = lookup("CORTEX_AGENT_TOKEN_TYPE").filter(|v| !v.trim().is_empty()) {
            config.token_type = raw.parse()?;
        }
        if let Some(raw) = lookup("CORTEX_AGENT_TIMEOUT_SECS").filter(|v| !v.trim().is_empty()) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ChatError::Config(format!("CORTEX_AGENT_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the token type header value.
    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    /// Overrides the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the per-call notification bound.
    pub fn notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ChatError> {
        let url = self.agent_url.trim();
        if url.is_empty() {
            return Err(ChatError::Config("agent_url must not be empty".into()));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ChatError::Config(format!(
                "agent_url must be an http(s) URL: {url}"
            )));
        }
        if self.timeout.is_zero() {
            return Err(ChatError::Config("timeout must be greater than 0".into()));
        }
        Ok(())
    }
}
