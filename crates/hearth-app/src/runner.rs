//! Process-level entry helpers.

use tracing_subscriber::EnvFilter;

use crate::application::Application;

/// Install the global `tracing` subscriber.
///
/// Honors `RUST_LOG`, defaulting to `info`, and writes to standard error.
/// Calling it again is a no-op.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initialize logging and run `app` until it quits.
pub fn run_app(mut app: Application) -> anyhow::Result<()> {
    init_logging();
    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_can_be_initialized_twice() {
        init_logging();
        init_logging();
        tracing::info!("still logging");
    }
}
