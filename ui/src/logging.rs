use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use tracing::Subscriber;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Layer, Registry};

use printdash_core::targets;

pub const DEFAULT_LOG_CAPACITY: usize = 2000;

/// Crates that are chatty at debug level and irrelevant to the dashboard.
const QUIET_DIRECTIVES: [&str; 5] = [
    "wgpu_core=warn",
    "wgpu_hal=warn",
    "naga=warn",
    "cosmic_text=warn",
    "hyper_util=info",
];

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: tracing::Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {:<5} {:<18} {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level.as_str(),
            self.target,
            self.message
        )
    }
}

#[derive(Debug, Clone)]
pub struct LogStore {
    inner: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, entry: LogEntry) {
        if let Ok(mut guard) = self.inner.lock() {
            if guard.len() >= self.capacity {
                guard.pop_front();
            }
            guard.push_back(entry);
        }
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        if let Ok(guard) = self.inner.lock() {
            return guard.iter().cloned().collect();
        }
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Unset or unparsable values fall back to `Info`.
    pub fn from_env_value(value: Option<&str>) -> Self {
        value
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => f.write_str("Error"),
            LogLevel::Warn => f.write_str("Warn"),
            LogLevel::Info => f.write_str("Info"),
            LogLevel::Debug => f.write_str("Debug"),
            LogLevel::Trace => f.write_str("Trace"),
        }
    }
}

pub type ReloadHandle = reload::Handle<EnvFilter, Registry>;

fn build_filter(level: LogLevel) -> EnvFilter {
    QUIET_DIRECTIVES
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(
            EnvFilter::default().add_directive(level.to_level_filter().into()),
            EnvFilter::add_directive,
        )
}

pub fn init_logging(store: LogStore, level: LogLevel) -> ReloadHandle {
    let (reload_layer, handle) = reload::Layer::new(build_filter(level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false);

    let subscriber = Registry::default()
        .with(reload_layer)
        .with(LogCaptureLayer::new(store))
        .with(fmt_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);

    handle
}

pub fn apply_log_level(handle: &ReloadHandle, level: LogLevel) {
    let new_filter = build_filter(level);
    if let Err(error) = handle.modify(|filter| {
        *filter = new_filter;
    }) {
        tracing::warn!(target: targets::UI, %error, "Log level change failed");
    }
}

struct LogCaptureLayer {
    store: LogStore,
}

impl LogCaptureLayer {
    fn new(store: LogStore) -> Self {
        Self { store }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.store.push(LogEntry {
            timestamp: Local::now(),
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.into_message(),
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl FieldVisitor {
    /// Message first, structured fields appended as `key=value`.
    fn into_message(self) -> String {
        match (self.message, self.fields.is_empty()) {
            (Some(message), true) => message,
            (Some(message), false) => format!("{message} {}", self.fields.join(" ")),
            (None, _) => self.fields.join(" "),
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        let value = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(value.trim_matches('"').to_string());
        } else {
            self.fields
                .push(format!("{}={}", field.name(), value.trim_matches('"')));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use printdash_core::{
        ClientConfig, ConnectClient, HttpConnectClient, PrinterId, SessionToken,
    };

    fn entry(target: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Local::now(),
            level: tracing::Level::INFO,
            target: target.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn store_drops_oldest_past_capacity() {
        let store = LogStore::new(2);
        store.push(entry(targets::API, "one"));
        store.push(entry(targets::POLLING, "two"));
        store.push(entry(targets::UI, "three"));

        let messages: Vec<String> = store
            .snapshot()
            .into_iter()
            .map(|entry| entry.message)
            .collect();
        assert_eq!(messages, vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn level_parses_from_env_value() {
        assert_eq!(LogLevel::from_env_value(Some("DEBUG")), LogLevel::Debug);
        assert_eq!(LogLevel::from_env_value(Some(" warning ")), LogLevel::Warn);
        assert_eq!(LogLevel::from_env_value(Some("loud")), LogLevel::Info);
        assert_eq!(LogLevel::from_env_value(None), LogLevel::Info);
    }

    #[test]
    fn visitor_appends_fields_to_message() {
        let visitor = FieldVisitor {
            message: Some("Snapshot applied".to_string()),
            fields: vec!["request=3".to_string(), "changes=1".to_string()],
        };
        assert_eq!(visitor.into_message(), "Snapshot applied request=3 changes=1");
    }

    #[test]
    fn format_line_includes_target() {
        let line = entry(targets::POLLING, "Tick skipped").format_line();
        assert!(line.contains("printdash::polling"));
        assert!(line.ends_with("Tick skipped"));
    }

    #[test]
    fn trace_level_fetch_keeps_printer_secrets_out_of_logs() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/printers/abc-123-secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"uuid":"abc-123-secret","printer_state":"IDLE","sn":"SN-SECRET"}"#,
            )
            .create();

        let config = ClientConfig {
            base_url: server.url(),
            timeout: Duration::from_secs(5),
        };
        let client =
            HttpConnectClient::new(&config, &SessionToken::new("session")).expect("client");
        let printer = PrinterId::new("abc-123-secret");

        let store = LogStore::new(64);
        let subscriber = Registry::default().with(LogCaptureLayer::new(store.clone()));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        let snapshot = tracing::subscriber::with_default(subscriber, || {
            runtime.block_on(client.fetch_printer(&printer))
        })
        .expect("snapshot");
        assert_eq!(snapshot.printer_state, "IDLE");

        let lines: Vec<String> = store
            .snapshot()
            .iter()
            .map(LogEntry::format_line)
            .collect();
        assert!(lines.iter().any(|line| line.contains("GET ok")));
        for line in &lines {
            assert!(!line.contains("abc-123-secret"), "leaked uuid: {line}");
            assert!(!line.contains("SN-SECRET"), "leaked serial: {line}");
        }
    }
}
