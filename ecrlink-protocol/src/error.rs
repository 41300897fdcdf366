//! Protocol error types.

use thiserror::Error;

/// Errors raised while framing or deframing bytes on the wire.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame trailer did not match the payload.
    #[error("integrity check failed: expected {expected:#010x}, got {actual:#010x}")]
    TrailerMismatch { expected: u32, actual: u32 },

    /// Frame payload exceeds the negotiated chunk limit.
    #[error("frame payload too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Reassembled body exceeds the body cap.
    #[error("message body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// A byte outside the protocol alphabet arrived between frames.
    #[error("unexpected byte on wire: {0:#04x}")]
    UnexpectedByte(u8),

    /// A frame payload tried to smuggle a reserved control byte.
    #[error("reserved byte {0:#04x} in frame payload")]
    ReservedByte(u8),

    /// Reassembled body was not valid UTF-8.
    #[error("message body is not valid utf-8")]
    InvalidUtf8,
}

/// Errors raised while building a request body.
///
/// Each variant maps to a stable negative code reported to integrators;
/// the codes count upward from [`EncodeError::BASE`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// No request of the processed category was staged.
    #[error("no request of this category has been staged")]
    RequestNotSet,

    /// Tender type conflicts with another request field.
    #[error("tender type {tender} does not permit {field}")]
    TenderMismatch {
        tender: &'static str,
        field: &'static str,
    },

    /// Transaction sub-type cannot be sent.
    #[error("transaction type {0} cannot be sent to a terminal")]
    TransType(&'static str),

    /// A sub-type demands a field the request left empty.
    #[error("{trans} requires {field}")]
    ForceValue {
        trans: &'static str,
        field: &'static str,
    },

    /// A field required by every sub-type is missing.
    #[error("required field {0} is missing")]
    Missing(&'static str),

    /// An amount field held something other than minor-unit digits.
    #[error("field {0} is not a valid amount")]
    Amount(&'static str),

    /// A field value contained a reserved separator or control byte.
    #[error("field {field} contains reserved byte {byte:#04x}")]
    Separator { field: &'static str, byte: u8 },

    /// The assembled body blew the body cap.
    #[error("encoded body is {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },
}

impl EncodeError {
    /// Lowest (most negative) code in the table.
    pub const BASE: i32 = -1003;

    /// Stable numeric code for integrators keying on failure classes.
    pub fn code(&self) -> i32 {
        match self {
            EncodeError::Amount(_)
            | EncodeError::Separator { .. }
            | EncodeError::BodyTooLarge { .. } => Self::BASE,
            EncodeError::RequestNotSet => Self::BASE + 1,
            EncodeError::TenderMismatch { .. } => Self::BASE + 2,
            EncodeError::TransType(_) => Self::BASE + 3,
            EncodeError::ForceValue { .. } => Self::BASE + 4,
            EncodeError::Missing(_) => Self::BASE + 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_codes() {
        assert_eq!(EncodeError::RequestNotSet.code(), -1002);
        assert_eq!(
            EncodeError::TenderMismatch {
                tender: "CASH",
                field: "voucher_number"
            }
            .code(),
            -1001
        );
        assert_eq!(EncodeError::TransType("UNKNOWN").code(), -1000);
        assert_eq!(
            EncodeError::ForceValue {
                trans: "FORCEAUTH",
                field: "auth_code"
            }
            .code(),
            -999
        );
        assert_eq!(EncodeError::Missing("amount").code(), -998);
        assert_eq!(EncodeError::Amount("tip_amount").code(), -1003);
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::TrailerMismatch {
            expected: 0xdeadbeef,
            actual: 0x12345678,
        };
        assert!(err.to_string().contains("0xdeadbeef"));

        let err = EncodeError::ForceValue {
            trans: "FORCEAUTH",
            field: "auth_code",
        };
        assert_eq!(err.to_string(), "FORCEAUTH requires auth_code");
    }
}
