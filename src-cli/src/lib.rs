//! voxcorpus library
//!
//! Configuration, persistence, cloud transcription and the command
//! implementations behind the `voxcorpus` binary.

pub mod commands;
pub mod config;
pub mod providers;
pub mod store;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install stderr and daily-rolling file logging.
///
/// The returned guard flushes the file writer on drop and must live as long
/// as the process.
pub fn init_logging(log_dir: &Path) -> WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory {:?}: {}", log_dir, e);
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "voxcorpus.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,voxcorpus=debug,voxcorpus_lib=debug".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging to {:?}", log_dir);
    guard
}
