//! Streaming client for hosted conversational-agent endpoints.
//!
//! One `AgentClient::chat` call posts a question, reads the server-sent event
//! stream line by line, folds the events into turn state and returns a
//! `Summary`. When a `NotificationSink` is attached, planning progress is
//! mirrored into a single live chat message.
//!
//! ```no_run
//! use cortex_chat::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let client = AgentClient::new(AgentClientConfig::new(
//!     "https://account.snowflakecomputing.com/api/v2/databases/db/schemas/s/agents/a:run",
//!     std::env::var("CORTEX_AGENT_TOKEN").unwrap_or_default(),
//! ))?;
//!
//! let summary = client.chat("How many tickets were opened last week?").await;
//! println!("{}", summary.text);
//! for sql in &summary.sql_queries {
//!     println!("{sql}");
//! }
//! # Ok(())
//! # }
//! ```

/// Planning-step and fact accumulation for one turn.
pub mod accumulator;
/// Typed classification of frames.
pub mod classify;
/// Turn driver.
pub mod client;
/// Client configuration.
pub mod config;
/// Bearer token sources and token types.
pub mod credentials;
/// Public error types.
pub mod errors;
/// Line-oriented SSE framing.
pub mod frame;
/// `reqwest` transport.
pub mod http;
/// Progress notifications.
pub mod notifier;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports.
pub mod prelude;
/// Terminal summary and its extraction.
pub mod summary;
/// Tool-result field extraction.
pub mod tool_result;
/// Transport contract and request body.
pub mod transport;

pub use accumulator::{AccumulatorState, StepAdded, StepChannel};
pub use classify::{ClassifiedEvent, ContentItem, classify};
pub use client::AgentClient;
pub use config::AgentClientConfig;
pub use credentials::{StaticToken, TokenProvider, TokenType};
pub use errors::{ChatError, NotifyError};
pub use frame::{Frame, FrameItem, FrameReader, frames};
pub use http::HttpTransport;
pub use notifier::{MessageHandle, NotificationSink, NotificationState, ProgressNotifier};
pub use summary::{Citation, Summary};
pub use transport::{AgentRequest, AgentTransport, LineStream};
