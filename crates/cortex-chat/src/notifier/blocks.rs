//! Block-kit payloads for the progress message.

use serde_json::{Value, json};

use crate::summary::Summary;

const THINKING: &str = "🤔 Thinking...";
const PLANNING: &str = "🤔 Planning the next steps...";
const VERIFIED_BADGE: &str = ":verified: answer accuracy verified by agent owner";
const FALLBACK_STEPS: usize = 3;

/// Fallback text plus structured blocks for one post or update.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub text: String,
    pub blocks: Vec<Value>,
}

impl Notification {
    fn new(text: impl Into<String>, blocks: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            blocks,
        }
    }
}

fn mrkdwn(text: impl Into<String>) -> Value {
    json!({"type": "section", "text": {"type": "mrkdwn", "text": text.into()}})
}

fn details_button() -> Value {
    json!({
        "type": "actions",
        "elements": [{
            "type": "button",
            "text": {"type": "plain_text", "text": "📋 Show Details"},
            "action_id": "show_planning_details",
            "value": "show"
        }]
    })
}

fn bullets<S: AsRef<str>>(steps: &[S]) -> String {
    steps
        .iter()
        .map(|s| format!("• {}", s.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn thinking() -> Notification {
    Notification::new(THINKING, vec![mrkdwn(format!("*{THINKING}*"))])
}

/// Refresh for the primary status channel.
pub fn thinking_progress(step_count: usize, latest: &str) -> Notification {
    Notification::new(
        THINKING,
        vec![mrkdwn(format!(
            "*{THINKING}* ({step_count} steps)\n\n_Latest: {latest}_"
        ))],
    )
}

/// Refresh for the secondary status channel.
pub fn planning_progress(step_count: usize, latest: &str) -> Notification {
    Notification::new(
        PLANNING,
        vec![
            mrkdwn(format!(
                "*{PLANNING}* ({step_count} steps)\n\n_Latest: {latest}_"
            )),
            details_button(),
        ],
    )
}

/// New message used when refreshing the existing one failed.
pub fn progress_fallback<S: AsRef<str>>(steps: &[S]) -> Notification {
    let start = steps.len().saturating_sub(FALLBACK_STEPS);
    Notification::new(
        "🔄 Agent working...",
        vec![mrkdwn(format!(
            "*🔄 Progress Update:*\n{}",
            bullets(&steps[start..])
        ))],
    )
}

/// `Finished N steps • Includes ...` line for the completed state.
pub fn completion_line(step_count: usize, summary: &Summary) -> String {
    let mut line = format!("_Finished {step_count} steps");
    if summary.has_verification() {
        line.push_str(&format!(" • Includes {VERIFIED_BADGE}"));
    } else if !summary.sql_queries.is_empty() {
        let count = summary.sql_queries.len();
        let noun = if count == 1 { "query" } else { "queries" };
        line.push_str(&format!(" • Includes {count} SQL {noun}"));
    }
    line.push('_');
    line
}

pub fn completed(step_count: usize, summary: &Summary) -> Notification {
    Notification::new(
        "✅ Thinking completed!",
        vec![
            mrkdwn(format!(
                "*{THINKING}* ✅ *Completed!*\n\n{}",
                completion_line(step_count, summary)
            )),
            details_button(),
        ],
    )
}

/// Completion posted as a new message after the update failed.
pub fn completed_fallback<S: AsRef<str>>(steps: &[S]) -> Notification {
    Notification::new(
        "✅ Thinking completed!",
        vec![mrkdwn(format!(
            "*{THINKING}* ✅ *Completed!*\n\n{}",
            bullets(steps)
        ))],
    )
}

/// Completion posted when no progress message exists.
pub fn completed_new(step_count: usize) -> Notification {
    Notification::new(
        "✅ Thinking completed!",
        vec![mrkdwn(format!(
            "*{THINKING}* ✅ *Completed!*\n\nFinished {step_count} steps"
        ))],
    )
}

pub fn error(title: &str, message: &str) -> Notification {
    Notification::new(
        format!("❌ {title}"),
        vec![json!({"type": "section", "text": {"type": "plain_text", "text": format!("❌ {message}")}})],
    )
}
