//! # ecrlink Client
//!
//! Async terminal link. Opens a serial, network or Bluetooth channel to a
//! payment terminal, runs acknowledged framed exchanges over it, and
//! orchestrates the stage/process/read-response cycle integrators drive.
//!
//! ## Example
//!
//! ```no_run
//! use ecrlink_client::{CommConfig, Terminal};
//! use ecrlink_client::protocol::{Category, Money, PaymentRequest, TenderType};
//!
//! # async fn run() -> Result<(), ecrlink_client::LinkError> {
//! let config = CommConfig::default();
//! let mut terminal = Terminal::connect(&config).await?;
//!
//! terminal.stage(PaymentRequest::sale(TenderType::Credit, Money::from_cents(1099)));
//! let result = terminal.process(Category::Payment).await;
//! if result.is_ok() {
//!     if let Some(response) = terminal.payment_response() {
//!         println!("auth code: {:?}", response.auth_code);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod link;
pub mod terminal;
pub mod trace;

pub use channel::Channel;
pub use config::{
    ChannelKind, CommConfig, ConfigError, NetworkConfig, SerialConfig, WirelessConfig,
};
pub use error::LinkError;
pub use link::{Link, LinkState};
pub use terminal::{Canceller, ExchangeOutcome, ExchangeResult, Terminal, TerminalStatus};
pub use trace::{Direction, TracingWireLog, WireLog};

pub use ecrlink_protocol as protocol;
