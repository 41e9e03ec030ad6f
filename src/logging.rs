//! Tracing setup for the binary: a daily file under the configured log
//! directory, plus warnings echoed to stderr.

use std::path::{Path, PathBuf};

use projtree::kernel::services::adapters::resolve_log_dir;
use projtree::kernel::services::ports::TreeConfig;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "projtree.log";
const FALLBACK_FILTER: &str = "projtree=info";

pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// `RUST_LOG` wins over the configured directives. Bad directives fall back
/// to the default filter and are reported once logging is up.
fn build_filter(config: &TreeConfig) -> (EnvFilter, Option<String>) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, None);
    }
    match EnvFilter::try_new(&config.log_filter) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(FALLBACK_FILTER), Some(e.to_string())),
    }
}

pub fn init(config: &TreeConfig) -> Option<LoggingGuard> {
    let log_dir = resolve_log_dir(config)
        .or_else(|_| -> std::io::Result<PathBuf> {
            let dir = std::env::temp_dir().join("projtree").join("logs");
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        })
        .ok()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let (filter, bad_filter) = build_filter(config);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr.with_max_level(Level::WARN)),
        );

    if subscriber.try_init().is_err() {
        return None;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!(panic = %panic_info, "panic");
        previous(panic_info);
    }));

    if let Some(error) = bad_filter {
        tracing::warn!(filter = %config.log_filter, error = %error, "invalid log_filter, using default");
    }
    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard {
        _guard: guard,
        log_dir,
    })
}
