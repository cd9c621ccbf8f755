//! Process-wide `tracing` setup for binaries embedding the client.
//!
//! Library code only emits events; nothing is installed unless the host
//! calls [`init_observability`] or [`init_with`].
use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const DEFAULT_LOG_FILE: &str = "cortex-chat.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log events are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Compact human-readable lines on stderr. Stdout stays free for results.
    Stderr,
    /// JSON lines appended to `dir/file_name`.
    JsonFile { dir: PathBuf, file_name: String },
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilitySettings {
    pub enabled: bool,
    /// Filter directive such as `info` or `cortex_chat=debug`.
    pub filter: Option<String>,
    pub output: LogOutput,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: None,
            output: LogOutput::Stderr,
        }
    }
}

impl ObservabilitySettings {
    /// Reads `CORTEX_CHAT_OBSERVABILITY`, `CORTEX_CHAT_LOG_LEVEL` and
    /// `CORTEX_CHAT_JSON_LOG_PATH`. `RUST_LOG` is the filter fallback.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("CORTEX_CHAT_OBSERVABILITY")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        let filter = lookup("CORTEX_CHAT_LOG_LEVEL")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|v| !v.trim().is_empty());
        let output = match lookup("CORTEX_CHAT_JSON_LOG_PATH").filter(|v| !v.trim().is_empty()) {
            Some(raw) => json_output(PathBuf::from(raw.trim())),
            None => LogOutput::Stderr,
        };
        Self {
            enabled,
            filter,
            output,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        self.filter
            .as_deref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn json_output(path: PathBuf) -> LogOutput {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    LogOutput::JsonFile { dir, file_name }
}

/// Installs the global subscriber from the environment, once per process.
pub fn init_observability() {
    init_with(ObservabilitySettings::from_env());
}

/// Installs the global subscriber from explicit settings. Later calls, and
/// calls after another subscriber was installed, are no-ops.
pub fn init_with(settings: ObservabilitySettings) {
    INIT.get_or_init(|| {
        if !settings.enabled {
            return;
        }
        let env_filter = settings.env_filter();
        match &settings.output {
            LogOutput::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .try_init();
            }
            LogOutput::Stderr => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> ObservabilitySettings {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ObservabilitySettings::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_to_enabled_stderr_output() {
        assert_eq!(settings(&[]), ObservabilitySettings::default());
    }

    #[test]
    fn level_override_wins_over_rust_log() {
        let s = settings(&[
            ("CORTEX_CHAT_LOG_LEVEL", "cortex_chat=debug"),
            ("RUST_LOG", "warn"),
        ]);
        assert_eq!(s.filter.as_deref(), Some("cortex_chat=debug"));
        assert_eq!(settings(&[("RUST_LOG", "warn")]).filter.as_deref(), Some("warn"));
    }

    #[test]
    fn flag_accepts_common_spellings() {
        assert!(!settings(&[("CORTEX_CHAT_OBSERVABILITY", " Off ")]).enabled);
        assert!(settings(&[("CORTEX_CHAT_OBSERVABILITY", "maybe")]).enabled);
    }

    #[test]
    fn json_path_splits_into_dir_and_file() {
        let s = settings(&[("CORTEX_CHAT_JSON_LOG_PATH", "logs/turns.jsonl")]);
        assert_eq!(
            s.output,
            LogOutput::JsonFile {
                dir: PathBuf::from("logs"),
                file_name: "turns.jsonl".into()
            }
        );
        let bare = settings(&[("CORTEX_CHAT_JSON_LOG_PATH", "turns.jsonl")]);
        assert!(matches!(bare.output, LogOutput::JsonFile { dir, .. } if dir == PathBuf::from(".")));
    }

    #[test]
    fn init_is_idempotent() {
        init_with(ObservabilitySettings {
            enabled: false,
            ..ObservabilitySettings::default()
        });
        init_observability();
    }
}
