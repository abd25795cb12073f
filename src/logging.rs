//! Tracing subscriber setup for the binary.
//!
//! `RUST_LOG` wins when set; otherwise the `-v` count picks the level.
//! Output goes to stderr so `--json` results on stdout stay clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "orbit=warn",
        1 => "orbit=info",
        _ => "orbit=debug",
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(verbosity).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
