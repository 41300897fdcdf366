//! ecrlink - Payment Terminal Link
//!
//! Drives retail payment terminals over serial, TCP and Bluetooth channels
//! using the STX/ETX framed field protocol spoken by terminal firmware.
//!
//! This crate is a facade over the two workspace crates:
//!
//! - [`protocol`] holds the transport-agnostic wire format: symbol tables,
//!   the delimited field codec, request encoders and lenient response
//!   decoders, and control-byte framing with LRC or CRC-32C trailers.
//! - [`client`] holds the async link: channel connectors, the ACK/NAK frame
//!   exchange with retry, chunked transmission and reassembly, and the
//!   [`Terminal`] front end that runs whole request/response exchanges.
//!
//! ```no_run
//! use ecrlink::{Category, CommConfig, Money, PaymentRequest, TenderType, Terminal};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CommConfig::default();
//! let mut terminal = Terminal::connect(&config).await?;
//!
//! terminal.stage(PaymentRequest::sale(TenderType::Credit, Money::from_cents(1099)));
//! let result = terminal.process(Category::Payment).await;
//! if result.is_ok() {
//!     if let Some(response) = terminal.payment_response() {
//!         println!("approved: {}", response.result_text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub use ecrlink_client as client;
pub use ecrlink_protocol as protocol;

pub use ecrlink_client::{
    Canceller, Channel, ChannelKind, CommConfig, Direction, ExchangeOutcome, ExchangeResult,
    LinkError, LinkState, Terminal, TerminalStatus, TracingWireLog, WireLog,
};
pub use ecrlink_protocol::{
    BatchRequest, BatchResponse, BatchType, BrandTotal, CardBrand, Category, EdcTotal, EdcType,
    EncodeError, ExtView, ManageRequest, ManageResponse, ManageType, Money, PaymentRequest,
    PaymentResponse, PaymentType, ProtocolError, ReportRequest, ReportResponse, ReportType,
    Request, Response, TenderType, DEFAULT_PORT, RESULT_OK, WIRE_VERSION,
};
