use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt as _;
use futures::stream;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::errors::ChatError;
use crate::transport::{AgentRequest, AgentTransport, LineStream};

const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// `AgentTransport` over `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport that gives up when connecting, or any single read,
    /// takes longer than `timeout`. A stream that keeps producing lines is
    /// never cut.
    pub fn new(timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl AgentTransport for HttpTransport {
    async fn open(&self, request: &AgentRequest) -> Result<LineStream, ChatError> {
        debug!(turn_id = %request.turn_id, url = %request.url, "posting agent request");
        let timeout = request.timeout;
        let response = self
            .client
            .post(&request.url)
            .bearer_auth(&request.bearer_token)
            .header(TOKEN_TYPE_HEADER, request.token_type.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&request.body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            debug!(turn_id = %request.turn_id, status = status.as_u16(), body = %body, "agent request rejected");
            return Err(ChatError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(line_stream(bytes_stream, timeout)))
    }
}

fn map_reqwest_error(err: &reqwest::Error, timeout: Duration) -> ChatError {
    if err.is_timeout() || timed_out_io(err) {
        ChatError::Timeout {
            seconds: timeout.as_secs(),
        }
    } else {
        ChatError::transport(err.to_string())
    }
}

fn timed_out_io(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// Splits a byte stream into lines across chunk boundaries.
#[derive(Default)]
pub(crate) struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=idx).collect();
            lines.push(decode_line(&line[..idx]));
        }
        lines
    }

    /// Returns the trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn line_stream(
    bytes_stream: ByteStream,
    timeout: Duration,
) -> impl futures::Stream<Item = Result<String, ChatError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: LineDecoder,
        pending: VecDeque<String>,
        timeout: Duration,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: LineDecoder::default(),
            pending: VecDeque::new(),
            timeout,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(line) = state.pending.pop_front() {
                    return Ok(Some((line, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.decoder.push_chunk(&chunk));
                    }
                    Some(Err(e)) => return Err(map_reqwest_error(&e, state.timeout)),
                    None => {
                        state.pending.extend(state.decoder.finish());
                        state.done = true;
                    }
                }
            }
        },
    )
}
