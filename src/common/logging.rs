//! Logging and tracing configuration
//!
//! The harness logs to stderr so stdout carries only progress lines and the
//! verdict. The surrogate runs as a child process, so it logs to a rolling
//! file as well.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::paths;

/// Initialize tracing for a harness run (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `--verbose`), WARN for dependencies.
pub fn init_cli(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("deletion_harness=debug,warn")
        } else {
            EnvFilter::new("deletion_harness=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for the surrogate (file + stderr logging)
///
/// The surrogate logs to both:
/// 1. A daily log file under `~/.local/share/deletion-harness/logs/`
/// 2. stderr, which the harness forwards into its own log
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init_surrogate() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("deletion_harness=debug,info"));

    let appender = paths::log_dir().and_then(|dir| {
        Builder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix("surrogate")
            .filename_suffix("log")
            .build(dir)
            .map_err(|e| eprintln!("Warning: Could not open log file: {}", e))
            .ok()
    });

    match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(surrogate_stderr_layer())
                .init();

            Some(guard)
        }
        None => {
            // Fallback: stderr only
            tracing_subscriber::registry()
                .with(filter)
                .with(surrogate_stderr_layer())
                .init();
            None
        }
    }
}

/// stderr output of the surrogate, which the harness forwards into its own log
fn surrogate_stderr_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .compact()
}
