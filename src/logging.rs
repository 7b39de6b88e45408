use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging: stdout plus an optional rolling file appender.
/// Filter precedence: config level, then `RUST_LOG`, then "info".
pub fn init_with_config(cfg: &LoggingConfig) {
    let env_filter = match &cfg.level {
        Some(level) => tracing_subscriber::EnvFilter::new(level.as_str()),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    let file_writer = if cfg.enable_file_logging {
        file_writer(cfg)
    } else {
        None
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    // A failed second init (tests, embedding) is not worth surfacing.
    let _ = match (cfg.format, file_writer) {
        (LogFormat::Json, Some(writer)) => registry
            .with(json_layer(std::io::stdout))
            .with(json_layer(writer))
            .try_init(),
        (LogFormat::Json, None) => registry.with(json_layer(std::io::stdout)).try_init(),
        (LogFormat::Text, Some(writer)) => registry
            .with(text_layer(std::io::stdout, true))
            .with(text_layer(writer, false))
            .try_init(),
        (LogFormat::Text, None) => registry
            .with(text_layer(std::io::stdout, true))
            .try_init(),
    };
}

fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(writer)
}

fn text_layer<S, W>(writer: W, ansi: bool) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(writer)
}

/// Non-blocking rolling file writer; the flush guard intentionally lives
/// for the process lifetime.
fn file_writer(cfg: &LoggingConfig) -> Option<tracing_appender::non_blocking::NonBlocking> {
    let rotation = match cfg.rotation.to_lowercase().as_str() {
        "hourly" => tracing_appender::rolling::Rotation::HOURLY,
        "never" => tracing_appender::rolling::Rotation::NEVER,
        _ => tracing_appender::rolling::Rotation::DAILY,
    };

    if std::fs::create_dir_all(&cfg.dir).is_err() {
        eprintln!(
            "Failed to create log directory '{}', continuing with stdout logs",
            cfg.dir
        );
        return None;
    }

    let file_appender =
        tracing_appender::rolling::RollingFileAppender::new(rotation, &cfg.dir, &cfg.filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _leaked: &'static _ = Box::leak(Box::new(guard));
    Some(non_blocking)
}
