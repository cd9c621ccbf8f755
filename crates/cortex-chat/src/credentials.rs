use std::fmt;
use std::str::FromStr;

use crate::errors::ChatError;

/// Value sent in the token-type header next to the bearer token.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Personal access token.
    #[default]
    ProgrammaticAccessToken,
    /// Key-pair signed JWT.
    KeypairJwt,
    /// OAuth access token.
    Oauth,
}

impl TokenType {
    /// Returns the header value for this token type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProgrammaticAccessToken => "PROGRAMMATIC_ACCESS_TOKEN",
            Self::KeypairJwt => "KEYPAIR_JWT",
            Self::Oauth => "OAUTH",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROGRAMMATIC_ACCESS_TOKEN" | "PAT" => Ok(Self::ProgrammaticAccessToken),
            "KEYPAIR_JWT" | "JWT" => Ok(Self::KeypairJwt),
            "OAUTH" => Ok(Self::Oauth),
            other => Err(ChatError::Config(format!("unknown token type: {other}"))),
        }
    }
}

/// Supplies the bearer token right before a request is built.
pub trait TokenProvider: Send + Sync {
    /// Returns the token to send as `Authorization: Bearer <token>`.
    fn bearer_token(&self) -> Result<String, ChatError>;
}

/// Token provider backed by a fixed string.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Result<String, ChatError> {
        if self.0.trim().is_empty() {
            return Err(ChatError::Credentials("bearer token is empty".into()));
        }
        Ok(self.0.clone())
    }
}
