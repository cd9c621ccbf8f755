use std::pin::Pin;
use std::time::Duration;

use crate::credentials::TokenType;
use crate::errors::ChatError;

/// Response body as a sequence of text lines, without line terminators.
pub type LineStream =
    Pin<Box<dyn futures::Stream<Item = Result<String, ChatError>> + Send + 'static>>;

/// Everything needed to issue one agent request.
#[derive(Clone)]
pub struct AgentRequest {
    pub turn_id: uuid::Uuid,
    pub url: String,
    pub bearer_token: String,
    pub token_type: TokenType,
    pub timeout: Duration,
    pub body: serde_json::Value,
}

impl std::fmt::Debug for AgentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRequest")
            .field("turn_id", &self.turn_id)
            .field("url", &self.url)
            .field("token_type", &self.token_type)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Opens the response body for a request.
///
/// Implementations report timeouts as `ChatError::Timeout`, non-success
/// statuses as `ChatError::Http` and everything else as
/// `ChatError::Transport`, both when opening and while streaming lines.
#[async_trait::async_trait]
pub trait AgentTransport: Send + Sync {
    async fn open(&self, request: &AgentRequest) -> Result<LineStream, ChatError>;
}

/// Request body for a single user message with automatic tool choice.
pub fn build_request_body(query: &str) -> serde_json::Value {
    serde_json::json!({
        "messages": [{
            "role": "user",
            "content": [{"type": "text", "text": query}],
        }],
        "tool_choice": {"type": "auto"},
        "stream": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_has_single_user_text_message_and_streaming() {
        let body = build_request_body("How many tickets?");
        assert_eq!(body["stream"], true);
        assert_eq!(body["tool_choice"]["type"], "auto");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["text"], "How many tickets?");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn debug_output_omits_token() {
        let request = AgentRequest {
            turn_id: uuid::Uuid::nil(),
            url: "https://example.test".into(),
            bearer_token: "secret".into(),
            token_type: TokenType::default(),
            timeout: Duration::from_secs(1),
            body: build_request_body("q"),
        };
        assert!(!format!("{request:?}").contains("secret"));
    }
}
