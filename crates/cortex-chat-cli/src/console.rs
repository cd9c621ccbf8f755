use std::io::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use cortex_chat::{MessageHandle, NotificationSink, NotifyError};
use serde_json::Value;

/// Renders progress messages on stderr.
///
/// Posts print a new line; updates reprint the message with its id so the
/// progress is readable in a plain terminal log.
#[derive(Default)]
pub struct ConsoleSink {
    next_id: AtomicU64,
}

fn render(text: &str, blocks: &[Value]) -> String {
    let sections: Vec<&str> = blocks
        .iter()
        .filter_map(|b| b.get("text").and_then(|t| t.get("text")).and_then(Value::as_str))
        .collect();
    if sections.is_empty() {
        text.to_string()
    } else {
        sections.join("\n")
    }
}

fn write_stderr(line: &str) -> Result<(), NotifyError> {
    let mut stderr = std::io::stderr().lock();
    writeln!(stderr, "{line}").map_err(|e| NotifyError::Unavailable(e.to_string()))
}

#[async_trait::async_trait]
impl NotificationSink for ConsoleSink {
    async fn post(&self, text: &str, blocks: &[Value]) -> Result<MessageHandle, NotifyError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        write_stderr(&format!("[{id}] {}", render(text, blocks)))?;
        Ok(MessageHandle::new(None, id.to_string()))
    }

    async fn update(
        &self,
        handle: &MessageHandle,
        text: &str,
        blocks: &[Value],
    ) -> Result<(), NotifyError> {
        write_stderr(&format!("[{}~] {}", handle.id, render(text, blocks)))
    }
}
