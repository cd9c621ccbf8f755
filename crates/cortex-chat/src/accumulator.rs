use serde_json::{Map, Value};

use crate::classify::{ClassifiedEvent, ContentItem};
use crate::tool_result;

/// Number of leading characters of streamed text shown as live "thinking".
pub const THINKING_PREVIEW_CHARS: usize = 200;

/// Status code emitted when the reasoning loop stops; never shown as a step.
const REASONING_STOP: &str = "REASONING_AGENT_STOP";

/// Where a planning step came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepChannel {
    /// `response.status` events.
    Primary,
    /// Bare `status`/`status_message` objects.
    Secondary,
    /// Synthesized `Using <tool>` steps.
    Tool,
}

/// A planning step appended by one fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepAdded {
    pub channel: StepChannel,
    /// Total step count after the append.
    pub step_count: usize,
}

/// Running state of one chat turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatorState {
    pub planning_steps: Vec<String>,
    pub tools_used: Vec<String>,
    pub current_text: String,
    pub sql_queries: Vec<String>,
    pub verification_info: Map<String, Value>,
    pub verified_query_used: bool,
}

impl AccumulatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event and returns the updated state.
    pub fn fold(mut self, event: &ClassifiedEvent) -> Self {
        self.apply(event);
        self
    }

    /// Folds one event in place. Returns the planning steps it appended.
    pub fn apply(&mut self, event: &ClassifiedEvent) -> Vec<StepAdded> {
        let mut added = Vec::new();
        match event {
            ClassifiedEvent::Status { message } => {
                added.push(self.push_step(message.clone(), StepChannel::Primary));
            }
            ClassifiedEvent::AgentStatus {
                status,
                status_message,
            } => {
                if status.is_empty() || status == REASONING_STOP {
                    return added;
                }
                if let Some(message) = status_message.as_ref().filter(|m| !m.is_empty()) {
                    added.push(self.push_step(message.clone(), StepChannel::Secondary));
                }
            }
            ClassifiedEvent::MessageDelta { content_items } => {
                for item in content_items {
                    match item {
                        ContentItem::Text { delta } => self.current_text.push_str(delta),
                        ContentItem::ToolUse { name, .. } => added.extend(self.record_tool(name)),
                        ContentItem::ToolResult { payload } => self.record_tool_result(payload),
                    }
                }
            }
            ClassifiedEvent::ToolUse { name, .. } => added.extend(self.record_tool(name)),
            ClassifiedEvent::ToolResult { payload } => self.record_tool_result(payload),
            ClassifiedEvent::TerminalResponse { .. } | ClassifiedEvent::Unknown => {}
        }
        added
    }

    /// First characters of the streamed text, for live display only.
    pub fn thinking_preview(&self) -> &str {
        match self.current_text.char_indices().nth(THINKING_PREVIEW_CHARS) {
            Some((idx, _)) => &self.current_text[..idx],
            None => &self.current_text,
        }
    }

    pub fn step_count(&self) -> usize {
        self.planning_steps.len()
    }

    pub fn latest_step(&self) -> Option<&str> {
        self.planning_steps.last().map(String::as_str)
    }

    fn push_step(&mut self, step: String, channel: StepChannel) -> StepAdded {
        self.planning_steps.push(step);
        StepAdded {
            channel,
            step_count: self.planning_steps.len(),
        }
    }

    fn record_tool(&mut self, name: &str) -> Option<StepAdded> {
        if self.tools_used.iter().any(|t| t == name) {
            return None;
        }
        self.tools_used.push(name.to_string());
        Some(self.push_step(format!("Using {name}"), StepChannel::Tool))
    }

    fn record_tool_result(&mut self, payload: &Value) {
        if tool_result::merge_verification(payload, &mut self.verification_info) {
            self.verified_query_used = true;
        }
        for sql in tool_result::sql_statements(payload) {
            if !self.sql_queries.contains(&sql) {
                self.sql_queries.push(sql);
            }
        }
    }
}
