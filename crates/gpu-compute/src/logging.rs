//! Logging setup and the optional log sink used by [`Compute`](crate::Compute).

use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A callback receiving plain-text progress messages, such as the notice
/// emitted right before a task blocks on the GPU.
pub type LogSink = dyn Fn(&str) + Send + Sync;

static LOGGING: OnceCell<()> = OnceCell::new();

/// Install a `tracing` subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Only the first
/// call has an effect, and an already-installed global subscriber is left in
/// place.
pub fn init_logging() {
    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// A log sink that forwards messages to `tracing` at `info` level.
pub fn tracing_sink() -> impl Fn(&str) + Send + Sync + 'static {
    |message: &str| info!(target: "gpu_compute", "{message}")
}
