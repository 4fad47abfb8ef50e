//! Tracing setup shared by every Steelyard binary.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `level` is the default verbosity; `RUST_LOG` overrides it when set. With
/// `json` the formatter emits newline-delimited JSON instead of human text.
/// Calling this twice is harmless; the second install is a no-op because the
/// global subscriber can only be set once per process.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let base = tracing_subscriber::registry().with(filter);

    if json {
        base.with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        base.with(fmt::layer().with_target(false)).try_init().ok();
    }
}
