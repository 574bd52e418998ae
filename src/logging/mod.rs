//! Tracing setup and wire audit logging.
//!
//! Every line sent or received is logged under the `crabtmi::wire` target.
//! Credentials never reach the log: `PASS <token>` is written as
//! `PASS {REDACTED}`.

use crate::irc::parser::{classify, LineKind};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))
}

/// Strip credential material from a wire line.
pub fn redact(line: &str) -> &str {
    if line.starts_with("PASS ") {
        "PASS {REDACTED}"
    } else {
        line
    }
}

pub fn log_send(line: &str) {
    info!(target: "crabtmi::wire", "SEND << {}", redact(line));
}

/// Numeric replies in the 4xx/5xx range are logged as warnings.
pub fn recv_level(line: &str) -> Level {
    match classify(line) {
        LineKind::Numeric(code) if (400..600).contains(&code) => Level::WARN,
        _ => Level::INFO,
    }
}

pub fn log_recv(line: &str) {
    let line = line.trim_end();
    if recv_level(line) == Level::WARN {
        warn!(target: "crabtmi::wire", "RECV >> {}", redact(line));
    } else {
        info!(target: "crabtmi::wire", "RECV >> {}", redact(line));
    }
}
