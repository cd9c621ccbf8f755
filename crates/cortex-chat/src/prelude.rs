//! Common imports for typical client usage.
pub use crate::{
    AgentClient, AgentClientConfig, ChatError, Citation, MessageHandle, NotificationSink,
    NotifyError, StaticToken, Summary, TokenProvider, TokenType,
};
