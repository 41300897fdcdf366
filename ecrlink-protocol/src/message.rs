//! Message categories and request/response dispatch.
//!
//! Every exchange belongs to one of four categories. The category picks the
//! command-token letter, the request encoder and the response decoder; the
//! two-digit sub-type code completing the token comes from the request
//! itself.

use std::fmt;

use crate::batch::{BatchRequest, BatchResponse};
use crate::error::EncodeError;
use crate::manage::{ManageRequest, ManageResponse};
use crate::payment::{PaymentRequest, PaymentResponse};
use crate::report::{ReportRequest, ReportResponse};
use crate::RESULT_OK;

/// The four exchange categories a terminal speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Payment,
    Manage,
    Batch,
    Report,
}

impl Category {
    /// Command-token letter opening every request body.
    pub fn letter(self) -> char {
        match self {
            Category::Payment => 'T',
            Category::Manage => 'A',
            Category::Batch => 'B',
            Category::Report => 'R',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Payment => "payment",
            Category::Manage => "manage",
            Category::Batch => "batch",
            Category::Report => "report",
        }
    }

    pub const ALL: [Category; 4] = [
        Category::Payment,
        Category::Manage,
        Category::Batch,
        Category::Report,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staged request of any category.
#[derive(Debug, Clone)]
pub enum Request {
    Payment(PaymentRequest),
    Manage(ManageRequest),
    Batch(BatchRequest),
    Report(ReportRequest),
}

impl Request {
    pub fn category(&self) -> Category {
        match self {
            Request::Payment(_) => Category::Payment,
            Request::Manage(_) => Category::Manage,
            Request::Batch(_) => Category::Batch,
            Request::Report(_) => Category::Report,
        }
    }

    /// Encodes the request into a wire body.
    pub fn encode(&self) -> Result<String, EncodeError> {
        match self {
            Request::Payment(r) => r.encode(),
            Request::Manage(r) => r.encode(),
            Request::Batch(r) => r.encode(),
            Request::Report(r) => r.encode(),
        }
    }
}

impl From<PaymentRequest> for Request {
    fn from(r: PaymentRequest) -> Self {
        Request::Payment(r)
    }
}

impl From<ManageRequest> for Request {
    fn from(r: ManageRequest) -> Self {
        Request::Manage(r)
    }
}

impl From<BatchRequest> for Request {
    fn from(r: BatchRequest) -> Self {
        Request::Batch(r)
    }
}

impl From<ReportRequest> for Request {
    fn from(r: ReportRequest) -> Self {
        Request::Report(r)
    }
}

/// A decoded response of any category.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Payment(PaymentResponse),
    Manage(ManageResponse),
    Batch(BatchResponse),
    Report(ReportResponse),
}

impl Response {
    /// Decodes a reassembled body. Decoding is lenient and total: fields the
    /// terminal did not send simply stay unset.
    pub fn decode(category: Category, body: &str) -> Response {
        match category {
            Category::Payment => Response::Payment(PaymentResponse::decode(body)),
            Category::Manage => Response::Manage(ManageResponse::decode(body)),
            Category::Batch => Response::Batch(BatchResponse::decode(body)),
            Category::Report => Response::Report(ReportResponse::decode(body)),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Response::Payment(_) => Category::Payment,
            Response::Manage(_) => Category::Manage,
            Response::Batch(_) => Category::Batch,
            Response::Report(_) => Category::Report,
        }
    }

    /// Six-digit terminal result code; empty if the terminal sent none.
    pub fn result_code(&self) -> &str {
        match self {
            Response::Payment(r) => &r.result_code,
            Response::Manage(r) => &r.result_code,
            Response::Batch(r) => &r.result_code,
            Response::Report(r) => &r.result_code,
        }
    }

    /// Human-readable result text accompanying the code.
    pub fn result_text(&self) -> &str {
        match self {
            Response::Payment(r) => &r.result_text,
            Response::Manage(r) => &r.result_text,
            Response::Batch(r) => &r.result_text,
            Response::Report(r) => &r.result_text,
        }
    }

    /// A terminal approves an operation by reporting [`RESULT_OK`].
    pub fn is_approved(&self) -> bool {
        self.result_code() == RESULT_OK
    }
}
