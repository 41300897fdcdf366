//! # ecrlink Protocol
//!
//! Wire protocol for the ecrlink terminal link. This crate is transport
//! agnostic: it defines the symbol tables shared with the terminal firmware,
//! the delimited field codec used by request and response bodies, and the
//! control-byte framing that carries those bodies over a byte stream.
//!
//! ## Wire Format
//!
//! A message body is a flat sequence of printable fields joined by the FS
//! byte (0x1C). Composite fields carry sub-values joined by US (0x1F), and a
//! third level of structured sub-records may be joined by GS (0x1D). Bodies
//! travel inside one or more frames:
//!
//! ```text
//! ┌─────┬─────────────────┬─────┬───────────────┐
//! │ STX │     payload     │ ETX │   integrity   │
//! │ 1B  │  ≤ chunk limit  │ 1B  │  1B LRC / 4B  │
//! └─────┴─────────────────┴─────┴───────────────┘
//! ```
//!
//! Multi-frame bodies are terminated by a bare EOT byte. Every frame is
//! acknowledged by the peer with ACK or NAK before the next one is sent.

pub mod batch;
pub mod error;
pub mod ext;
pub mod field;
pub mod manage;
pub mod message;
pub mod money;
pub mod packet;
pub mod payment;
pub mod report;
pub mod symbol;

pub use batch::{BatchRequest, BatchResponse, EdcTotal};
pub use error::{EncodeError, ProtocolError};
pub use ext::ExtView;
pub use field::{BodyBuilder, FieldView};
pub use manage::{ManageRequest, ManageResponse};
pub use message::{Category, Request, Response};
pub use money::Money;
pub use packet::{Integrity, WireEvent};
pub use payment::{PaymentRequest, PaymentResponse};
pub use report::{BrandTotal, ReportRequest, ReportResponse};
pub use symbol::{
    BatchType, CardBrand, EdcType, ManageType, PaymentType, ReportType, TenderType,
};

/// Protocol version string carried in every request body.
pub const WIRE_VERSION: &str = "1.28";

/// Default TCP port terminals listen on.
pub const DEFAULT_PORT: u16 = 10009;

/// Largest frame payload a terminal is required to accept (bytes).
pub const MAX_FRAME_PAYLOAD: usize = 141;

/// Upper bound on a reassembled message body (bytes).
pub const MAX_BODY_SIZE: usize = 4000;

/// Result code a terminal reports for an approved operation.
pub const RESULT_OK: &str = "000000";
