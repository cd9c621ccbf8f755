use std::sync::Arc;

use futures::StreamExt as _;
use tracing::{debug, info, warn};

use crate::accumulator::AccumulatorState;
use crate::classify::classify;
use crate::config::AgentClientConfig;
use crate::credentials::{StaticToken, TokenProvider};
use crate::errors::ChatError;
use crate::frame::{FrameItem, FrameReader};
use crate::http::HttpTransport;
use crate::notifier::{NotificationSink, ProgressNotifier};
use crate::summary::{self, Summary};
use crate::transport::{AgentRequest, AgentTransport, build_request_body};

/// Client for one agent endpoint.
///
/// Cheap to clone. Every `chat` call is an independent turn with its own
/// accumulator and notification state.
#[derive(Clone)]
pub struct AgentClient {
    config: AgentClientConfig,
    transport: Arc<dyn AgentTransport>,
    tokens: Arc<dyn TokenProvider>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl AgentClient {
    /// Creates a client that talks HTTP to `config.agent_url`.
    pub fn new(config: AgentClientConfig) -> Result<Self, ChatError> {
        let transport = HttpTransport::new(config.timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client with `AgentClientConfig::from_env`.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::new(AgentClientConfig::from_env()?)
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(
        config: AgentClientConfig,
        transport: Arc<dyn AgentTransport>,
    ) -> Result<Self, ChatError> {
        config.validate()?;
        Ok(Self {
            tokens: Arc::new(StaticToken::new(config.token.clone())),
            config,
            transport,
            sink: None,
        })
    }

    /// Replaces the static token from the config with a provider.
    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Enables progress notifications.
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &AgentClientConfig {
        &self.config
    }

    /// Runs one turn and returns its summary.
    ///
    /// Never fails: transport and credential errors come back as a summary
    /// whose text starts with `Error:`, after one error notification.
    pub async fn chat(&self, query: &str) -> Summary {
        let turn_id = uuid::Uuid::new_v4();
        let mut notifier = ProgressNotifier::new(self.sink.clone(), self.config.notify_timeout);
        match self.run_turn(turn_id, query, &mut notifier).await {
            Ok(summary) => {
                info!(
                    %turn_id,
                    steps = summary.planning_steps.len(),
                    sql_queries = summary.sql_queries.len(),
                    citations = summary.citations.len(),
                    verified = summary.verified_query_used,
                    "chat turn completed"
                );
                summary
            }
            Err(err) => {
                warn!(%turn_id, error = %err, status = ?err.status_code(), "chat turn failed");
                notifier.error(&err).await;
                Summary::from_error(&err)
            }
        }
    }

    async fn run_turn(
        &self,
        turn_id: uuid::Uuid,
        query: &str,
        notifier: &mut ProgressNotifier,
    ) -> Result<Summary, ChatError> {
        if query.trim().is_empty() {
            return Err(ChatError::Validation("query must not be empty".into()));
        }
        let request = AgentRequest {
            turn_id,
            url: self.config.agent_url.clone(),
            bearer_token: self.tokens.bearer_token()?,
            token_type: self.config.token_type,
            timeout: self.config.timeout,
            body: build_request_body(query),
        };
        debug!(%turn_id, url = %request.url, "starting chat turn");

        let mut lines = self.transport.open(&request).await?;
        let mut reader = FrameReader::new();
        let mut state = AccumulatorState::new();
        let mut raw_lines: Vec<String> = Vec::new();

        while let Some(line) = lines.next().await {
            let line = line?;
            let item = reader.push_line(&line);
            if !line.trim().is_empty() {
                raw_lines.push(line);
            }
            let frame = match item {
                Some(FrameItem::Frame(frame)) => frame,
                Some(FrameItem::Done) => {
                    debug!(%turn_id, "stream finished with [DONE]");
                    break;
                }
                None => continue,
            };
            let event = classify(&frame);
            for step in state.apply(&event) {
                debug!(
                    %turn_id,
                    channel = ?step.channel,
                    step_count = step.step_count,
                    step = state.latest_step().unwrap_or_default(),
                    "planning step"
                );
                notifier.on_step(step, &state.planning_steps).await;
            }
        }

        debug!(
            %turn_id,
            lines = raw_lines.len(),
            preview = state.thinking_preview(),
            "stream drained"
        );
        let mut summary = if reader.saw_data() {
            summary::from_sse_lines(&raw_lines)
        } else {
            summary::from_json_document(&raw_lines.join("\n"))
        };
        summary.merge_state(state);
        notifier.finish(&summary).await;
        Ok(summary)
    }
}
