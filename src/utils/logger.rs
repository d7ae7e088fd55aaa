use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines.
    Compact,
    /// JSON lines on stdout, for batch runs whose logs are collected by a scheduler.
    Json,
}

/// `RUST_LOG` wins over the verbosity flag.
fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "galfitm_feedme=debug,info"
    } else {
        "galfitm_feedme=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    // tests may initialize more than once
    let _ = match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter(verbose))
            .with(layer.with_thread_ids(false).compact())
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter(verbose))
            .with(layer.with_thread_ids(true).json())
            .try_init(),
    };
}

pub fn init_cli_logger(verbose: bool) {
    init_logger(LogFormat::Compact, verbose);
}

pub fn init_json_logger(verbose: bool) {
    init_logger(LogFormat::Json, verbose);
}
