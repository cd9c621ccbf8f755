//! Ask an agent endpoint one question and print the summary as JSON.

mod console;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cortex_chat::observability::init_observability;
use cortex_chat::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "cortex-chat", about = "Run one chat turn against an agent endpoint")]
struct Args {
    /// Question to send.
    query: String,
    /// Endpoint URL (defaults to CORTEX_AGENT_URL).
    #[arg(long)]
    url: Option<String>,
    /// Token type header value (defaults to CORTEX_AGENT_TOKEN_TYPE).
    #[arg(long)]
    token_type: Option<TokenType>,
    /// Request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Do not render progress on stderr.
    #[arg(long)]
    quiet: bool,
}

fn build_config(args: &Args) -> Result<AgentClientConfig, ChatError> {
    let mut config = AgentClientConfig::from_lookup(|key| match (key, &args.url) {
        ("CORTEX_AGENT_URL", Some(url)) => Some(url.clone()),
        _ => std::env::var(key).ok(),
    })?;
    if let Some(token_type) = args.token_type {
        config = config.token_type(token_type);
    }
    if let Some(secs) = args.timeout_secs {
        config = config.timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_observability();
    let args = Args::parse();

    let client = match build_config(&args).and_then(AgentClient::new) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };
    let client = if args.quiet {
        client
    } else {
        client.notification_sink(Arc::new(console::ConsoleSink::default()))
    };

    let summary = client.chat(&args.query).await;
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "failed to render summary");
            return ExitCode::FAILURE;
        }
    }
    if summary.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
