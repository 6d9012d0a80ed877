use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging on stderr.
///
/// `RUST_LOG` wins, then `QUIZ_DASHBOARD_LOG`, then the CLI flags.
pub fn init_tracing(verbose: bool, log_json: bool) -> anyhow::Result<()> {
    let default_level = if verbose {
        "quiz_dashboard=debug,tower_http=debug"
    } else {
        "quiz_dashboard=info,tower_http=info"
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("QUIZ_DASHBOARD_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}
