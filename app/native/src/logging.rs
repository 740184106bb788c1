//! Logging setup.
//!
//! One fmt subscriber for the whole process, writing to stderr so command
//! output on stdout stays machine-readable. `RUST_LOG` wins over the
//! defaults below.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset.
///
/// The daemon logs every cycle at `info`; one-shot commands only surface
/// warnings unless `--verbose` is given.
#[must_use]
pub const fn default_directive(verbose: bool, daemon: bool) -> &'static str {
    match (verbose, daemon) {
        (true, _) => "info,terrapaper_lib=debug,terrapaper=debug",
        (false, true) => "info",
        (false, false) => "warn",
    }
}

/// Installs the global subscriber.
///
/// Only the first call takes effect.
pub fn init(verbose: bool, daemon: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, daemon)));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false);

    if tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().is_err() {
        tracing::debug!("logging already initialized");
    }
}
