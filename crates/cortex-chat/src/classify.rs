use serde_json::{Map, Value};
use tracing::trace;

use crate::frame::Frame;

const STATUS_EVENT: &str = "response.status";
const RESPONSE_EVENT: &str = "response";
const TOOL_USE_EVENT: &str = "response.tool_use";
const TOOL_RESULT_EVENT: &str = "response.tool_result";
const MESSAGE_DELTA_OBJECT: &str = "message.delta";

/// One entry of a `message.delta` content list.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text { delta: String },
    ToolUse { name: String, input: Value },
    ToolResult { payload: Value },
}

/// Semantic category of a frame, resolved once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedEvent {
    /// `response.status` event carrying a planning message.
    Status { message: String },
    /// Bare object with a `status` field and no `object` discriminator.
    AgentStatus {
        status: String,
        status_message: Option<String>,
    },
    MessageDelta { content_items: Vec<ContentItem> },
    ToolUse { name: String, input: Value },
    ToolResult { payload: Value },
    /// Final response payload (`event: response`).
    TerminalResponse { payload: Value },
    Unknown,
}

impl ClassifiedEvent {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Classifies a frame. Malformed payloads become `Unknown`.
pub fn classify(frame: &Frame) -> ClassifiedEvent {
    let value: Value = match serde_json::from_str(&frame.raw_payload) {
        Ok(value) => value,
        Err(e) => {
            trace!(event_type = ?frame.event_type, error = %e, "dropping undecodable frame");
            return ClassifiedEvent::Unknown;
        }
    };
    classify_value(frame.event_type(), value)
}

/// Classifies an already decoded payload.
pub fn classify_value(event_type: Option<&str>, value: Value) -> ClassifiedEvent {
    let Value::Object(object) = value else {
        return ClassifiedEvent::Unknown;
    };

    // Event-type context wins over object shape.
    match event_type {
        Some(STATUS_EVENT) => {
            return match object.get("message") {
                Some(message) => ClassifiedEvent::Status {
                    message: value_to_text(message),
                },
                None => ClassifiedEvent::Unknown,
            };
        }
        Some(RESPONSE_EVENT) => {
            return ClassifiedEvent::TerminalResponse {
                payload: Value::Object(object),
            };
        }
        Some(TOOL_USE_EVENT) => {
            let (name, input) = tool_use_fields(&object);
            return ClassifiedEvent::ToolUse { name, input };
        }
        Some(TOOL_RESULT_EVENT) => {
            return ClassifiedEvent::ToolResult {
                payload: Value::Object(object),
            };
        }
        _ => {}
    }

    match object.get("object") {
        Some(Value::String(kind)) if kind == MESSAGE_DELTA_OBJECT => ClassifiedEvent::MessageDelta {
            content_items: object
                .get("delta")
                .and_then(|d| d.get("content"))
                .map(content_items)
                .unwrap_or_default(),
        },
        None | Some(Value::Null) => match object.get("status") {
            Some(status) => ClassifiedEvent::AgentStatus {
                status: value_to_text(status),
                status_message: object
                    .get("status_message")
                    .map(value_to_text)
                    .filter(|m| !m.is_empty()),
            },
            None => ClassifiedEvent::Unknown,
        },
        Some(_) => ClassifiedEvent::Unknown,
    }
}

/// Parses a `content` array into typed items, skipping unknown entries.
pub fn content_items(content: &Value) -> Vec<ContentItem> {
    let Some(entries) = content.as_array() else {
        return Vec::new();
    };
    entries.iter().filter_map(content_item).collect()
}

fn content_item(entry: &Value) -> Option<ContentItem> {
    let kind = entry.get("type").and_then(Value::as_str)?;
    match kind {
        "text" => Some(ContentItem::Text {
            delta: entry
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        "tool_use" => {
            let empty = Map::new();
            let tool = entry
                .get("tool_use")
                .and_then(Value::as_object)
                .unwrap_or(&empty);
            let (name, input) = tool_use_fields(tool);
            Some(ContentItem::ToolUse { name, input })
        }
        "tool_result" | "tool_results" => Some(ContentItem::ToolResult {
            payload: entry.get(kind).cloned().unwrap_or(Value::Null),
        }),
        _ => None,
    }
}

fn tool_use_fields(tool: &Map<String, Value>) -> (String, Value) {
    let name = tool
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or("unknown")
        .to_string();
    let input = tool
        .get("input")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    (name, input)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(event: Option<&str>, payload: &str) -> Frame {
        Frame::new(event, payload)
    }

    #[test]
    fn malformed_json_is_unknown() {
        assert!(classify(&frame(None, "{not json")).is_unknown());
        assert!(classify(&frame(Some(STATUS_EVENT), "")).is_unknown());
        assert!(classify(&frame(None, "[1,2]")).is_unknown());
    }

    #[test]
    fn status_event_with_message() {
        let event = classify(&frame(Some(STATUS_EVENT), r#"{"message":"Searching"}"#));
        assert_eq!(
            event,
            ClassifiedEvent::Status {
                message: "Searching".into()
            }
        );
    }

    #[test]
    fn status_event_never_falls_back_to_shape_rules() {
        let event = classify(&frame(
            Some(STATUS_EVENT),
            r#"{"status":"PLANNING","status_message":"Planning"}"#,
        ));
        assert!(event.is_unknown());
    }

    #[test]
    fn response_event_is_terminal_even_for_delta_shapes() {
        let event = classify(&frame(Some(RESPONSE_EVENT), r#"{"object":"message.delta"}"#));
        assert!(matches!(event, ClassifiedEvent::TerminalResponse { .. }));
    }

    #[test]
    fn message_delta_items_are_typed_in_order() {
        let payload = json!({
            "object": "message.delta",
            "delta": {"content": [
                {"type": "text", "text": "Hello"},
                {"type": "tool_use", "tool_use": {"name": "cortex_search", "input": {"query": "q"}}},
                {"type": "tool_results", "tool_results": {"content": [{"type": "json", "json": {"sql": "select 1"}}]}},
                {"type": "chart", "chart": {}}
            ]}
        });
        let event = classify_value(None, payload);
        let ClassifiedEvent::MessageDelta { content_items } = event else {
            panic!("expected delta");
        };
        assert_eq!(content_items.len(), 3);
        assert_eq!(
            content_items[0],
            ContentItem::Text {
                delta: "Hello".into()
            }
        );
        assert_eq!(
            content_items[1],
            ContentItem::ToolUse {
                name: "cortex_search".into(),
                input: json!({"query": "q"})
            }
        );
        assert!(matches!(&content_items[2], ContentItem::ToolResult { payload } if payload.get("content").is_some()));
    }

    #[test]
    fn tool_use_without_name_defaults_to_unknown() {
        let items = content_items(&json!([{"type": "tool_use", "tool_use": {}}]));
        assert_eq!(
            items,
            vec![ContentItem::ToolUse {
                name: "unknown".into(),
                input: json!({})
            }]
        );
    }

    #[test]
    fn bare_status_object_is_agent_status() {
        let event = classify_value(
            None,
            json!({"status": "EXECUTING_TOOL", "status_message": "Running SQL"}),
        );
        assert_eq!(
            event,
            ClassifiedEvent::AgentStatus {
                status: "EXECUTING_TOOL".into(),
                status_message: Some("Running SQL".into())
            }
        );
        let without_message = classify_value(None, json!({"status": "REASONING_AGENT_STOP"}));
        assert!(matches!(
            without_message,
            ClassifiedEvent::AgentStatus { status_message: None, .. }
        ));
    }

    #[test]
    fn other_objects_are_unknown() {
        assert!(classify_value(None, json!({"object": "message", "status": "x"})).is_unknown());
        assert!(classify_value(None, json!({"tool_metadata": {}})).is_unknown());
    }

    #[test]
    fn named_tool_events_map_to_top_level_variants() {
        let used = classify_value(Some(TOOL_USE_EVENT), json!({"name": "analyst", "input": {}}));
        assert!(matches!(used, ClassifiedEvent::ToolUse { name, .. } if name == "analyst"));
        let result = classify_value(Some(TOOL_RESULT_EVENT), json!({"json": {"sql": "x"}}));
        assert!(matches!(result, ClassifiedEvent::ToolResult { .. }));
    }
}
