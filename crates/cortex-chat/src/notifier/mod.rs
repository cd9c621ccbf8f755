//! Progress reporting to an external message surface.
//!
//! The notifier turns planning steps into at most one live message per turn:
//! created on the first status step, refreshed as steps arrive and switched
//! to a completed state at the end. Every sink failure is absorbed here.
pub mod blocks;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::accumulator::{StepAdded, StepChannel};
use crate::config::DEFAULT_NOTIFY_TIMEOUT;
use crate::errors::{ChatError, NotifyError};
use crate::summary::Summary;

pub use blocks::Notification;

/// Opaque reference to a posted message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageHandle {
    /// Channel the message lives in, when the surface needs it for updates.
    pub channel: Option<String>,
    /// Surface-specific message id (for example a Slack `ts`).
    pub id: String,
}

impl MessageHandle {
    pub fn new(channel: Option<String>, id: impl Into<String>) -> Self {
        Self {
            channel,
            id: id.into(),
        }
    }
}

/// Chat surface the notifier writes to.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Posts a new message.
    async fn post(&self, text: &str, blocks: &[Value]) -> Result<MessageHandle, NotifyError>;

    /// Replaces the content of an existing message.
    async fn update(
        &self,
        handle: &MessageHandle,
        text: &str,
        blocks: &[Value],
    ) -> Result<(), NotifyError>;
}

/// Per-turn notification bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationState {
    pub message: Option<MessageHandle>,
    pub last_step_count_shown: usize,
    pub started: bool,
    pub completed: bool,
}

/// Drives throttled, best-effort updates for one turn.
pub struct ProgressNotifier {
    sink: Option<Arc<dyn NotificationSink>>,
    call_timeout: Duration,
    state: NotificationState,
}

impl ProgressNotifier {
    pub fn new(sink: Option<Arc<dyn NotificationSink>>, call_timeout: Duration) -> Self {
        Self {
            sink,
            call_timeout,
            state: NotificationState::default(),
        }
    }

    /// Notifier without a sink; every operation is a no-op.
    pub fn disabled() -> Self {
        Self::new(None, DEFAULT_NOTIFY_TIMEOUT)
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    /// Reacts to a planning step appended by the accumulator.
    ///
    /// The first status step creates the message. Later primary steps always
    /// refresh it; secondary steps refresh only at even step counts. Tool
    /// steps never touch the surface.
    pub async fn on_step<S: AsRef<str>>(&mut self, step: StepAdded, steps: &[S]) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        if step.channel == StepChannel::Tool || self.state.completed {
            return;
        }
        if !self.state.started {
            self.state.started = true;
            let thinking = blocks::thinking();
            match self.bounded(sink.post(&thinking.text, &thinking.blocks)).await {
                Ok(handle) => {
                    debug!(message_id = %handle.id, "posted progress message");
                    self.state.message = Some(handle);
                }
                Err(e) => warn!(error = %e, "failed to post progress message"),
            }
            return;
        }

        let latest = steps
            .last()
            .map(|s| s.as_ref())
            .unwrap_or("Processing...");
        let refresh = match step.channel {
            StepChannel::Primary => blocks::thinking_progress(step.step_count, latest),
            StepChannel::Secondary if step.step_count % 2 == 0 => {
                blocks::planning_progress(step.step_count, latest)
            }
            _ => return,
        };
        let Some(handle) = self.state.message.clone() else {
            return;
        };
        match self
            .bounded(sink.update(&handle, &refresh.text, &refresh.blocks))
            .await
        {
            Ok(()) => {
                self.state.last_step_count_shown = step.step_count;
                debug!(step_count = step.step_count, "refreshed progress message");
            }
            Err(e) => {
                warn!(error = %e, step_count = step.step_count, "progress refresh failed, posting fallback");
                let fallback = blocks::progress_fallback(steps);
                if let Err(e) = self.bounded(sink.post(&fallback.text, &fallback.blocks)).await {
                    warn!(error = %e, "progress fallback failed");
                }
            }
        }
    }

    /// Switches the message to its completed state. Runs at most once and
    /// only if the turn produced planning steps.
    pub async fn finish(&mut self, summary: &Summary) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let steps = &summary.planning_steps;
        if self.state.completed || steps.is_empty() {
            return;
        }
        self.state.completed = true;
        let step_count = steps.len();

        let Some(handle) = self.state.message.clone() else {
            let done = blocks::completed_new(step_count);
            if let Err(e) = self.bounded(sink.post(&done.text, &done.blocks)).await {
                warn!(error = %e, "failed to post completion message");
            }
            return;
        };

        let done = blocks::completed(step_count, summary);
        match self
            .bounded(sink.update(&handle, &done.text, &done.blocks))
            .await
        {
            Ok(()) => {
                self.state.last_step_count_shown = step_count;
                debug!(step_count, "marked progress message completed");
            }
            Err(e) => {
                warn!(error = %e, "completion update failed, posting fallback");
                let fallback = blocks::completed_fallback(steps);
                if let Err(e) = self.bounded(sink.post(&fallback.text, &fallback.blocks)).await {
                    warn!(error = %e, "completion fallback failed");
                }
            }
        }
    }

    /// Posts one error message for a failed turn.
    pub async fn error(&mut self, err: &ChatError) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        self.state.completed = true;
        let message = blocks::error(err.title(), &err.to_string());
        if let Err(e) = self.bounded(sink.post(&message.text, &message.blocks)).await {
            warn!(error = %e, "failed to post error message");
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, NotifyError>>,
    ) -> Result<T, NotifyError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::TimedOut(self.call_timeout)),
        }
    }
}
