use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: `--verbose`, then the configured level, then `info`.
pub fn default_directive(verbose: bool, log_level: Option<&str>) -> String {
    match (verbose, log_level) {
        (true, _) => "spectra_recon=debug,info".to_string(),
        (false, Some(level)) => format!("spectra_recon={}", level),
        (false, None) => "spectra_recon=info".to_string(),
    }
}

fn default_filter(verbose: bool, log_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, log_level)))
}

pub fn init_cli_logger(verbose: bool, log_level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON lines, one event per line, for log collectors.
pub fn init_json_logger(verbose: bool, log_level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
