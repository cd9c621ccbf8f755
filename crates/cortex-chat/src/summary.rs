//! Terminal summary of a chat turn.
//!
//! The extractor re-reads the retained response lines once the stream has
//! ended. A body with at least one `data:` line is treated as an SSE stream;
//! anything else is parsed as a single JSON document.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::accumulator::AccumulatorState;
use crate::classify::{self, ClassifiedEvent, ContentItem};
use crate::errors::ChatError;
use crate::frame::{self, FrameItem};
use crate::tool_result;

static FENCED_SQL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```sql[ \t]*\r?\n?(.*?)```").expect("fenced SQL pattern is valid")
});

/// A search result the answer was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Citation {
    pub source_id: Option<i64>,
    pub doc_id: Option<String>,
    pub title: Option<String>,
    pub text: String,
}

/// Result of one chat turn. Always well formed, also on failure.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Summary {
    pub text: String,
    pub sql_queries: Vec<String>,
    pub citations: Vec<Citation>,
    pub verification_info: Map<String, Value>,
    pub verified_query_used: bool,
    /// Planning steps in the order they were shown.
    pub planning_steps: Vec<String>,
    /// Tools in first-use order.
    pub tools_used: Vec<String>,
}

impl Summary {
    /// Error-shaped summary: `text` carries the message, sequences are empty.
    pub fn from_error(err: &ChatError) -> Self {
        Self {
            text: format!("Error: {err}"),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.text.starts_with("Error:")
    }

    /// True if any verification metadata was found.
    pub fn has_verification(&self) -> bool {
        self.verified_query_used || !self.verification_info.is_empty()
    }

    /// Folds the turn's streaming state into the extracted summary.
    pub fn merge_state(&mut self, state: AccumulatorState) {
        if self.text.is_empty() {
            self.text = state.current_text;
        }
        for sql in state.sql_queries {
            if !self.sql_queries.contains(&sql) {
                self.sql_queries.push(sql);
            }
        }
        for (key, value) in state.verification_info {
            self.verification_info.entry(key).or_insert(value);
        }
        self.verified_query_used |= state.verified_query_used;
        self.planning_steps = state.planning_steps;
        self.tools_used = state.tools_used;
    }
}

/// Builds a summary from the raw response lines, dispatching on shape.
pub fn extract<S: AsRef<str>>(lines: &[S]) -> Summary {
    if frame::has_data_lines(lines) {
        from_sse_lines(lines)
    } else {
        let body = lines
            .iter()
            .map(|l| l.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        from_json_document(&body)
    }
}

/// Summary of an SSE body.
pub fn from_sse_lines<S: AsRef<str>>(lines: &[S]) -> Summary {
    let mut collector = Collector::default();
    let mut terminal: Option<Value> = None;
    for item in frame::frames(lines) {
        let FrameItem::Frame(frame) = item else {
            break;
        };
        match classify::classify(&frame) {
            ClassifiedEvent::MessageDelta { content_items } => {
                for content in &content_items {
                    collector.content_item(content);
                }
            }
            ClassifiedEvent::ToolResult { payload } => collector.tool_result(&payload),
            ClassifiedEvent::TerminalResponse { payload } => terminal = Some(payload),
            _ => {}
        }
    }

    if let Some(payload) = terminal {
        let streamed_text = !collector.text.is_empty();
        for content in message_items(&payload) {
            match content {
                ContentItem::Text { .. } if streamed_text => {}
                other => collector.content_item(&other),
            }
        }
    }
    collector.finish()
}

/// Summary of a single non-streamed JSON document.
pub fn from_json_document(body: &str) -> Summary {
    let value: Value = match serde_json::from_str(body.trim()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "response body is neither SSE nor JSON");
            return Summary::default();
        }
    };

    let mut candidates: Vec<&Value> = Vec::new();
    match &value {
        Value::Array(items) => candidates.extend(items.iter()),
        Value::Object(object) => match object.get("choices").and_then(Value::as_array) {
            Some(choices) => candidates.extend(choices.iter()),
            None => candidates.push(&value),
        },
        _ => {}
    }

    let mut collector = Collector::default();
    for candidate in candidates {
        for content in message_items(candidate) {
            collector.content_item(&content);
        }
    }
    collector.finish()
}

/// Content items of a message, wrapped message or delta.
fn message_items(value: &Value) -> Vec<ContentItem> {
    let content = value
        .get("content")
        .or_else(|| value.get("message").and_then(|m| m.get("content")))
        .or_else(|| value.get("delta").and_then(|d| d.get("content")));
    match content {
        Some(Value::String(text)) => vec![ContentItem::Text {
            delta: text.clone(),
        }],
        Some(content) => classify::content_items(content),
        None => Vec::new(),
    }
}

#[derive(Default)]
struct Collector {
    text: String,
    sql_queries: Vec<String>,
    citations: Vec<Citation>,
    verification_info: Map<String, Value>,
    verified_query_used: bool,
}

impl Collector {
    fn content_item(&mut self, item: &ContentItem) {
        match item {
            ContentItem::Text { delta } => self.text.push_str(delta),
            ContentItem::ToolResult { payload } => self.tool_result(payload),
            ContentItem::ToolUse { .. } => {}
        }
    }

    fn tool_result(&mut self, payload: &Value) {
        for sql in tool_result::sql_statements(payload) {
            self.push_sql(sql);
        }
        for citation in tool_result::citations(payload) {
            if !self.citations.contains(&citation) {
                self.citations.push(citation);
            }
        }
        self.verified_query_used |=
            tool_result::merge_verification(payload, &mut self.verification_info);
    }

    fn push_sql(&mut self, sql: String) {
        if !self.sql_queries.contains(&sql) {
            self.sql_queries.push(sql);
        }
    }

    fn finish(mut self) -> Summary {
        let fenced: Vec<String> = FENCED_SQL
            .captures_iter(&self.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|sql| !sql.is_empty())
            .collect();
        for sql in fenced {
            self.push_sql(sql);
        }
        Summary {
            text: self.text,
            sql_queries: self.sql_queries,
            citations: self.citations,
            verification_info: self.verification_info,
            verified_query_used: self.verified_query_used,
            planning_steps: Vec::new(),
            tools_used: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> String {
        format!("data: {value}")
    }

    fn delta(items: Value) -> String {
        data(json!({"object": "message.delta", "delta": {"content": items}}))
    }

    #[test]
    fn sse_text_sql_and_citations() {
        let lines = vec![
            "event: message.delta".to_string(),
            delta(json!([{"type": "text", "text": "Revenue grew. "}])),
            delta(json!([{"type": "tool_results", "tool_results": {"content": [
                {"type": "json", "json": {"sql": "SELECT SUM(x) FROM t", "verified_query_used": {"name": "rev"}}},
                {"type": "json", "json": {"searchResults": [{"source_id": 1, "doc_id": "d1", "text": "alpha"}]}}
            ]}}])),
            delta(json!([{"type": "text", "text": "Done."}])),
            "data: [DONE]".to_string(),
            delta(json!([{"type": "text", "text": "ignored"}])),
        ];
        let summary = extract(&lines);
        assert_eq!(summary.text, "Revenue grew. Done.");
        assert_eq!(summary.sql_queries, vec!["SELECT SUM(x) FROM t"]);
        assert_eq!(summary.citations.len(), 1);
        assert!(summary.verified_query_used);
        assert!(summary.has_verification());
    }

    #[test]
    fn terminal_response_text_used_only_when_nothing_streamed() {
        let terminal = |text: &str| {
            vec![
                "event: response".to_string(),
                data(json!({"role": "assistant", "content": [{"type": "text", "text": text}]})),
            ]
        };
        assert_eq!(extract(&terminal("final answer")).text, "final answer");

        let mut lines = vec![delta(json!([{"type": "text", "text": "streamed"}]))];
        lines.extend(terminal("streamed"));
        assert_eq!(extract(&lines).text, "streamed");
    }

    #[test]
    fn fenced_sql_in_text_is_extracted_once() {
        let text = "Here you go:\n```sql\nSELECT 1\n```\nand again\n```SQL\nSELECT 1\n```";
        let lines = vec![delta(json!([{"type": "text", "text": text}]))];
        assert_eq!(extract(&lines).sql_queries, vec!["SELECT 1"]);
    }

    #[test]
    fn json_document_has_same_shape_as_stream() {
        let body = json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Answer"},
                {"type": "tool_results", "tool_results": {"content": [{"type": "json", "json": {"sql": "select 2"}}]}}
            ]
        })
        .to_string();
        let lines: Vec<&str> = body.lines().collect();
        let summary = extract(&lines);
        assert_eq!(summary.text, "Answer");
        assert_eq!(summary.sql_queries, vec!["select 2"]);
        assert!(summary.citations.is_empty());
        assert!(summary.verification_info.is_empty());
        assert!(!summary.verified_query_used);
    }

    #[test]
    fn json_document_variants() {
        let wrapped = json!({"message": {"content": "plain"}}).to_string();
        assert_eq!(from_json_document(&wrapped).text, "plain");
        let choices = json!({"choices": [{"delta": {"content": [{"type": "text", "text": "a"}]}}, {"message": {"content": "b"}}]}).to_string();
        assert_eq!(from_json_document(&choices).text, "ab");
    }

    #[test]
    fn garbage_yields_empty_summary() {
        assert_eq!(extract(&["<html>oops</html>"]), Summary::default());
        assert_eq!(extract::<&str>(&[]), Summary::default());
        assert_eq!(from_json_document("42"), Summary::default());
    }

    #[test]
    fn error_summary_is_well_formed() {
        let summary = Summary::from_error(&ChatError::Timeout { seconds: 120 });
        assert!(summary.text.starts_with("Error:"));
        assert!(summary.is_error());
        assert!(summary.sql_queries.is_empty() && summary.citations.is_empty());
    }

    #[test]
    fn merge_state_keeps_extracted_fields_and_adds_steps() {
        let mut summary = Summary {
            text: "extracted".into(),
            sql_queries: vec!["a".into()],
            ..Summary::default()
        };
        let state = AccumulatorState {
            planning_steps: vec!["Using analyst".into()],
            tools_used: vec!["analyst".into()],
            current_text: "streamed".into(),
            sql_queries: vec!["a".into(), "b".into()],
            verified_query_used: true,
            ..AccumulatorState::default()
        };
        summary.merge_state(state);
        assert_eq!(summary.text, "extracted");
        assert_eq!(summary.sql_queries, vec!["a", "b"]);
        assert!(summary.verified_query_used);
        assert_eq!(summary.tools_used, vec!["analyst"]);
    }
}
