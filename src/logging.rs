//! Structured logging setup for hosts embedding the kernel.
//!
//! The kernel only emits `tracing` events. Hosts that do not install their
//! own subscriber can call [`init_tracing`].

use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "artifact_kernel=info";

/// Install a global subscriber.
///
/// `RUST_LOG` selects the filter, `LOG_FORMAT=pretty` switches from JSON to
/// human readable output. Returns `false` when a subscriber was already
/// installed, which makes the call safe to repeat from tests.
pub fn init_tracing() -> bool {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .try_init()
            .is_ok()
    }
}
