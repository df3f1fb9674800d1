use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::DiagnosticsConfig;

/// Keeps the JSON log writer flushing until dropped.
pub struct TelemetryGuard {
    pub session_id: Uuid,
    pub log_file: PathBuf,
    _file_guard: WorkerGuard,
}

pub fn init_tracing(log_dir: impl AsRef<Path>) -> anyhow::Result<TelemetryGuard> {
    init_tracing_from_config(log_dir, &DiagnosticsConfig::default())
}

/// Installs the global subscriber: a JSON session log under `log_dir` and, unless
/// `console_logs` is off, compact console output on stderr. Stdout stays free for reports.
pub fn init_tracing_from_config(
    log_dir: impl AsRef<Path>,
    diagnostics: &DiagnosticsConfig,
) -> anyhow::Result<TelemetryGuard> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let session_id = Uuid::new_v4();
    let file_name = session_log_name(&diagnostics.trace_file_prefix, session_id);
    let log_file = log_dir.join(&file_name);
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&diagnostics.rust_log_filter));

    let console_layer = diagnostics.console_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(file_writer);

    if let Err(error) = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        warn!(?error, "global tracing subscriber already initialized");
    } else {
        info!(%session_id, log_file = %log_file.display(), "tracing initialized");
    }

    Ok(TelemetryGuard {
        session_id,
        log_file,
        _file_guard: file_guard,
    })
}

/// `<prefix>-<utc timestamp>-<first session id block>.log`, unique across same-second runs.
fn session_log_name(prefix: &str, session_id: Uuid) -> String {
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let session = session_id.simple().to_string();
    format!("{prefix}-{timestamp}-{}.log", &session[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_log_names_carry_prefix_and_session() {
        let session_id = Uuid::new_v4();
        let name = session_log_name("sfx", session_id);
        let short = session_id.simple().to_string();

        assert!(name.starts_with("sfx-"));
        assert!(name.ends_with(&format!("-{}.log", &short[..8])));
    }

    #[test]
    fn init_creates_the_log_directory_and_reports_the_file() {
        let temp = tempfile::tempdir().expect("tempdir should work");
        let log_dir = temp.path().join("logs").join("nested");
        let diagnostics = DiagnosticsConfig {
            console_logs: false,
            trace_file_prefix: "unit".to_string(),
            ..DiagnosticsConfig::default()
        };

        let guard = init_tracing_from_config(&log_dir, &diagnostics).expect("init should work");
        assert!(log_dir.is_dir());
        assert_eq!(guard.log_file.parent(), Some(log_dir.as_path()));
        assert!(
            guard
                .log_file
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("unit-"))
        );
    }
}
