//! Client error types.

use ecrlink_protocol::ProtocolError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the terminal link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// I/O failure on the underlying channel.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire-level protocol violation.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Channel could not be opened.
    #[error("failed to open channel to {target}: {reason}")]
    Connect { target: String, reason: String },

    /// Serial port failure.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// The exchange deadline elapsed.
    #[error("exchange timed out")]
    Timeout,

    /// The exchange was cancelled from another task.
    #[error("exchange cancelled")]
    Cancelled,

    /// The peer rejected a frame more times than the retry budget allows.
    #[error("peer rejected frame {0} times, retry budget exhausted")]
    RetryExhausted(u32),

    /// The peer closed the channel mid-exchange.
    #[error("channel closed by peer")]
    Closed,

    /// The link configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LinkError {
    /// True for failures that mean "the terminal never answered in time":
    /// deadline expiry, cancellation and an exhausted retry budget. These
    /// surface to integrators as a timeout outcome rather than a hard error.
    pub fn is_interruption(&self) -> bool {
        matches!(
            self,
            LinkError::Timeout | LinkError::Cancelled | LinkError::RetryExhausted(_)
        )
    }
}
