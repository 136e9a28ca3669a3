//! Support for tracing execution of a program.

use tracing_subscriber::{
    fmt::{format::FmtSpan, Subscriber},
    prelude::*,
    EnvFilter,
};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "warn,geoconnect=info,geoconnectd=info,geoconnect_common=info";

/// Set up the `tracing` library, honoring `RUST_LOG` when present. Spans are
/// logged as they open and close.
pub fn initialize_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_env_filter(filter)
        .finish()
        .init();
}
