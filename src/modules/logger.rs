use std::fs;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::models::LogConfig;

const LOG_FILE_PREFIX: &str = "calc-bff.log";

/// Initialize logger system
///
/// Console output is always on. A daily rolling file is added when
/// `config.dir` is set and can be created.
pub fn init_logger(config: &LogConfig) {
    // Capture log macro logs
    let _ = tracing_log::LogTracer::init();

    let file_layer = config.dir.as_ref().and_then(|dir| {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("Failed to create log directory {:?}: {}", dir, e);
            return None;
        }

        let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The guard flushes on drop; the process logs until exit
        std::mem::forget(guard);

        Some(
            fmt::Layer::new()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_level(true),
        )
    });
    let to_file = file_layer.is_some();

    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    // RUST_LOG wins over the configured filter
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init so a second initialization is a no-op instead of a panic
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if to_file {
        info!("Logger system initialized (Console + File Persistence)");
    } else {
        info!("Logger system initialized (Console)");
    }
}
