use std::sync::{Arc, Mutex};

use cortex_chat::prelude::*;
use cortex_chat::{AgentRequest, AgentTransport, LineStream};
use futures::stream;
use serde_json::{Value, json};

struct ScriptedTransport {
    lines: Vec<String>,
}

#[async_trait::async_trait]
impl AgentTransport for ScriptedTransport {
    async fn open(&self, _request: &AgentRequest) -> Result<LineStream, ChatError> {
        let lines: Vec<Result<String, ChatError>> = self.lines.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(lines)))
    }
}

#[derive(Default)]
struct MemorySink {
    posts: Mutex<Vec<String>>,
    updates: Mutex<Vec<(MessageHandle, String)>>,
}

#[async_trait::async_trait]
impl NotificationSink for MemorySink {
    async fn post(&self, text: &str, _blocks: &[Value]) -> Result<MessageHandle, NotifyError> {
        let mut posts = self.posts.lock().expect("lock");
        posts.push(text.to_string());
        Ok(MessageHandle::new(Some("C042".into()), format!("ts-{}", posts.len())))
    }

    async fn update(
        &self,
        handle: &MessageHandle,
        _text: &str,
        blocks: &[Value],
    ) -> Result<(), NotifyError> {
        let section = blocks
            .first()
            .and_then(|b| b["text"]["text"].as_str())
            .unwrap_or_default()
            .to_string();
        self.updates
            .lock()
            .expect("lock")
            .push((handle.clone(), section));
        Ok(())
    }
}

fn client(lines: Vec<String>) -> AgentClient {
    AgentClient::with_transport(
        AgentClientConfig::new("https://example.test/api/v2/agents/sales:run", "pat"),
        Arc::new(ScriptedTransport { lines }),
    )
    .expect("client")
}

fn data(value: Value) -> String {
    format!("data: {value}")
}

fn delta(content: Value) -> String {
    data(json!({"id": "msg_1", "object": "message.delta", "delta": {"content": content}}))
}

fn analyst_stream() -> Vec<String> {
    vec![
        "event: response.status".into(),
        data(json!({"message": "Planning the next steps", "status": "planning"})),
        "".into(),
        "event: message.delta".into(),
        delta(json!([{"type": "tool_use", "tool_use": {
            "tool_use_id": "t1", "name": "supply_chain", "input": {"query": "tickets by service"}
        }}])),
        delta(json!([{"type": "tool_results", "tool_results": {
            "tool_use_id": "t1",
            "content": [{"type": "json", "json": {
                "sql": "SELECT service_type, COUNT(*) FROM tickets GROUP BY 1",
                "text": "This is our interpretation of your question",
                "verified_query_used": {"name": "tickets_by_service", "verified_by": "owner"}
            }}]
        }}])),
        "event: response.status".into(),
        data(json!({"message": "Reviewing the results"})),
        "event: message.delta".into(),
        delta(json!([{"type": "text", "text": "Cellular has 120 tickets"}])),
        delta(json!([{"type": "text", "text": ", business internet 80."}])),
        "data: not-json".into(),
        "data: [DONE]".into(),
        data(json!({"message": "after done"})),
    ]
}

#[tokio::test]
async fn full_turn_produces_summary_and_progress() {
    let sink = Arc::new(MemorySink::default());
    let summary = client(analyst_stream())
        .notification_sink(sink.clone())
        .chat("Breakdown of support tickets by service type")
        .await;

    assert_eq!(summary.text, "Cellular has 120 tickets, business internet 80.");
    assert_eq!(
        summary.sql_queries,
        vec!["SELECT service_type, COUNT(*) FROM tickets GROUP BY 1"]
    );
    assert!(summary.verified_query_used);
    assert!(summary.verification_info.contains_key("verified_query_used"));
    assert_eq!(summary.tools_used, vec!["supply_chain"]);
    assert_eq!(
        summary.planning_steps,
        vec![
            "Planning the next steps",
            "Using supply_chain",
            "Reviewing the results"
        ]
    );

    let posts = sink.posts.lock().expect("lock").clone();
    assert_eq!(posts, vec!["🤔 Thinking..."]);
    let updates = sink.updates.lock().expect("lock").clone();
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().all(|(h, _)| h.id == "ts-1"));
    assert!(updates[0].1.contains("(3 steps)"));
    assert!(updates[0].1.contains("_Latest: Reviewing the results_"));
    assert!(updates[1].1.contains("Finished 3 steps"));
    assert!(updates[1].1.contains(":verified:"));
}

#[tokio::test]
async fn non_streamed_json_body_has_the_same_summary_shape() {
    let body = json!({
        "role": "assistant",
        "content": [
            {"type": "text", "text": "See the "},
            {"type": "text", "text": "manual."},
            {"type": "tool_results", "tool_results": {"content": [{"type": "json", "json": {
                "searchResults": [{"source_id": 3, "doc_id": "manual.pdf", "text": "Reset the router"}]
            }}]}}
        ]
    });
    let pretty = serde_json::to_string_pretty(&body).expect("json");
    let summary = client(pretty.lines().map(String::from).collect())
        .chat("How do I reset?")
        .await;

    assert_eq!(summary.text, "See the manual.");
    assert!(summary.sql_queries.is_empty());
    assert_eq!(summary.citations.len(), 1);
    assert_eq!(summary.citations[0].doc_id.as_deref(), Some("manual.pdf"));
    assert!(summary.verification_info.is_empty());
    assert!(!summary.verified_query_used);
    assert!(summary.planning_steps.is_empty());
}

#[tokio::test]
async fn summary_serializes_with_all_fields() {
    let summary = client(vec!["data: [DONE]".into()]).chat("hi").await;
    let value = serde_json::to_value(&summary).expect("serialize");
    for key in [
        "text",
        "sql_queries",
        "citations",
        "verification_info",
        "verified_query_used",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
}
