//! Wire traffic tracing.
//!
//! Every byte the link writes or reads is offered to a [`WireLog`] sink.
//! The default sink forwards to `tracing` at trace level; integrations
//! that keep a persistent comm log can install their own sink and format
//! entries with [`trace_line`].

use chrono::Local;

/// Which way the bytes travelled, from the client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
}

impl Direction {
    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Out => ">>",
            Direction::In => "<<",
        }
    }
}

/// Sink for raw wire traffic.
///
/// Called from inside the exchange loop, so implementations must not
/// block; hand bytes off to a writer task instead of flushing files
/// inline.
pub trait WireLog: Send {
    fn record(&mut self, direction: Direction, bytes: &[u8]);
}

/// Formats one comm-log line: local wall-clock time, direction arrow,
/// hex-encoded bytes.
pub fn trace_line(direction: Direction, bytes: &[u8]) -> String {
    format!(
        "{} {} {}",
        Local::now().format("%H:%M:%S%.3f"),
        direction.arrow(),
        hex::encode(bytes)
    )
}

/// Default sink: forwards traffic to the `tracing` subscriber.
pub struct TracingWireLog;

impl WireLog for TracingWireLog {
    fn record(&mut self, direction: Direction, bytes: &[u8]) {
        tracing::trace!(dir = direction.arrow(), data = %hex::encode(bytes), "wire");
    }
}
