//! Control-byte framing.
//!
//! A body chunk travels as `STX payload ETX trailer`. The trailer is either
//! a one-byte LRC (XOR fold) or a four-byte big-endian CRC-32C, both computed
//! over the payload followed by the ETX byte. Between frames the wire may
//! carry single-byte signals: ACK, NAK, EOT and ENQ.
//!
//! [`decode`] is incremental in the style of a split codec: feed it a read
//! buffer, get back `Ok(None)` until a complete event is buffered. A frame
//! with a bad trailer is consumed before the error is returned so the caller
//! can NAK and keep reading.

use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Start of frame.
pub const STX: u8 = 0x02;
/// End of frame payload, trailer follows.
pub const ETX: u8 = 0x03;
/// End of a multi-frame transmission.
pub const EOT: u8 = 0x04;
/// Status enquiry.
pub const ENQ: u8 = 0x05;
/// Positive acknowledgement.
pub const ACK: u8 = 0x06;
/// Negative acknowledgement.
pub const NAK: u8 = 0x15;

/// Trailer algorithm guarding each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrity {
    /// Single-byte XOR fold. The firmware default.
    #[default]
    Lrc,
    /// Four-byte big-endian CRC-32C.
    Crc32c,
}

impl Integrity {
    pub fn trailer_len(self) -> usize {
        match self {
            Integrity::Lrc => 1,
            Integrity::Crc32c => 4,
        }
    }

    fn compute(self, payload: &[u8]) -> u32 {
        match self {
            Integrity::Lrc => u32::from(lrc(payload)),
            Integrity::Crc32c => crc32c::crc32c_append(crc32c::crc32c(payload), &[ETX]),
        }
    }

    fn trailer_bytes(self, payload: &[u8]) -> Vec<u8> {
        match self {
            Integrity::Lrc => vec![self.compute(payload) as u8],
            Integrity::Crc32c => self.compute(payload).to_be_bytes().to_vec(),
        }
    }
}

/// XOR fold over the payload followed by ETX.
pub fn lrc(payload: &[u8]) -> u8 {
    payload.iter().fold(ETX, |acc, b| acc ^ b)
}

/// One decoded unit of inbound traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    Ack,
    Nak,
    EndOfTransmission,
    Enquiry,
    /// A verified frame payload.
    Frame(Bytes),
}

/// Frames one body chunk. The payload must stay inside `max_payload` and
/// must not contain reserved control bytes.
pub fn encode_frame(
    payload: &[u8],
    integrity: Integrity,
    max_payload: usize,
) -> Result<BytesMut, ProtocolError> {
    if payload.len() > max_payload {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len(),
            max: max_payload,
        });
    }
    if let Some(&byte) = payload.iter().find(|&&b| is_control(b)) {
        return Err(ProtocolError::ReservedByte(byte));
    }
    let trailer = integrity.trailer_bytes(payload);
    let mut frame = BytesMut::with_capacity(payload.len() + 2 + trailer.len());
    frame.extend_from_slice(&[STX]);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[ETX]);
    frame.extend_from_slice(&trailer);
    Ok(frame)
}

/// Splits a body into payload-sized chunks for transmission.
pub fn chunks(body: &[u8], max_payload: usize) -> impl Iterator<Item = &[u8]> {
    body.chunks(max_payload.max(1))
}

/// Pulls the next wire event out of `buf`, consuming exactly the bytes that
/// formed it.
///
/// Returns `Ok(None)` when the buffer holds only a partial frame. A frame
/// whose trailer does not verify is consumed and reported as
/// [`ProtocolError::TrailerMismatch`]; a byte outside the protocol alphabet
/// is consumed and reported as [`ProtocolError::UnexpectedByte`]. Both leave
/// the buffer positioned to continue decoding.
pub fn decode(
    buf: &mut BytesMut,
    integrity: Integrity,
    max_payload: usize,
) -> Result<Option<WireEvent>, ProtocolError> {
    let first = match buf.first() {
        Some(&b) => b,
        None => return Ok(None),
    };
    match first {
        ACK => {
            buf.advance(1);
            Ok(Some(WireEvent::Ack))
        }
        NAK => {
            buf.advance(1);
            Ok(Some(WireEvent::Nak))
        }
        EOT => {
            buf.advance(1);
            Ok(Some(WireEvent::EndOfTransmission))
        }
        ENQ => {
            buf.advance(1);
            Ok(Some(WireEvent::Enquiry))
        }
        STX => decode_frame(buf, integrity, max_payload),
        other => {
            buf.advance(1);
            Err(ProtocolError::UnexpectedByte(other))
        }
    }
}

fn decode_frame(
    buf: &mut BytesMut,
    integrity: Integrity,
    max_payload: usize,
) -> Result<Option<WireEvent>, ProtocolError> {
    let etx_pos = match buf[1..].iter().position(|&b| b == ETX) {
        Some(p) => 1 + p,
        None => {
            // Nothing past the cap can still become a valid frame.
            if buf.len() > 1 + max_payload {
                return Err(ProtocolError::FrameTooLarge {
                    size: buf.len() - 1,
                    max: max_payload,
                });
            }
            return Ok(None);
        }
    };
    let payload_len = etx_pos - 1;
    if payload_len > max_payload {
        return Err(ProtocolError::FrameTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }
    let frame_len = etx_pos + 1 + integrity.trailer_len();
    if buf.len() < frame_len {
        return Ok(None);
    }

    let frame = buf.split_to(frame_len);
    let payload = &frame[1..etx_pos];
    let actual = match integrity {
        Integrity::Lrc => u32::from(frame[frame_len - 1]),
        Integrity::Crc32c => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&frame[frame_len - 4..]);
            u32::from_be_bytes(raw)
        }
    };
    let expected = integrity.compute(payload);
    if actual != expected {
        return Err(ProtocolError::TrailerMismatch { expected, actual });
    }
    Ok(Some(WireEvent::Frame(Bytes::copy_from_slice(payload))))
}

fn is_control(b: u8) -> bool {
    matches!(b, STX | ETX | EOT | ENQ | ACK | NAK)
}
