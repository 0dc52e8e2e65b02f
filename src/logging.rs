//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console and a JSON log file.

use crate::backend::BackendKind;
use crate::config::detect_environment;
use crate::state_machine::{BootstrapEvent, BootstrapState};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Runs at most once per process. If another global subscriber is already
/// installed it is left in place. When the `log/` directory cannot be created
/// only the console layer is installed.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let log_level = get_log_level(&environment);

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(env_filter(log_level));

        let log_dir = PathBuf::from("log");
        if let Err(e) = fs::create_dir_all(&log_dir) {
            if tracing_subscriber::registry().with(console).try_init().is_ok() {
                tracing::warn!(error = %e, "Log directory unavailable - console logging only");
            }
            return;
        }

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry().with(console).with(
            fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(env_filter(log_level)),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
            return;
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            "🔧 STRUCTURED LOGGING: Initialized with file output"
        );

        // Flushes on drop; must live for the whole process
        std::mem::forget(guard);
    });
}

/// `RUST_LOG` when set, otherwise the environment's default level
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log one bootstrap lifecycle transition
pub fn log_bootstrap_operation(
    backend: BackendKind,
    event: &BootstrapEvent,
    from: &BootstrapState,
    to: &BootstrapState,
) {
    if let Some(reason) = event.error_message() {
        tracing::error!(
            backend = %backend,
            operation = event.event_type(),
            from_state = %from,
            state = %to,
            error = reason,
            timestamp = %Utc::now().to_rfc3339(),
            "🧩 BOOTSTRAP_OPERATION"
        );
    } else {
        tracing::info!(
            backend = %backend,
            operation = event.event_type(),
            from_state = %from,
            state = %to,
            timestamp = %Utc::now().to_rfc3339(),
            "🧩 BOOTSTRAP_OPERATION"
        );
    }
}
