//! Wire Protocol for the Feed Service
//!
//! Fixed 17-byte binary frames for record delivery, 2-byte frames for
//! requests. All integers are big-endian signed 32-bit.

use serde::Serialize;

/// Total record frame size in bytes
/// 4 (symbol) + 1 (side) + 4 (quantity) + 4 (price) + 4 (sequence) = 17
pub const RECORD_FRAME_SIZE: usize = 17;

/// Request frame size in bytes (opcode + parameter)
pub const REQUEST_FRAME_SIZE: usize = 2;

/// Opcode: stream every record the service holds
pub const OP_STREAM_ALL: u8 = 1;

/// Opcode: resend a single record by sequence number
pub const OP_RESEND: u8 = 2;

/// Trade side (closed set, single ASCII byte on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "S")]
    Sell,
}

impl Side {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            b'B' => Some(Self::Buy),
            b'S' => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Buy => b'B',
            Self::Sell => b'S',
        }
    }
}

/// One market event, decoded from a 17-byte frame
///
/// Layout (integers big-endian signed):
/// ```text
/// Offset  Size  Field
/// 0       4     symbol (ASCII, right-padded)
/// 4       1     side ('B' or 'S')
/// 5       4     quantity
/// 9       4     price (fixed-point, scale owned by the service)
/// 13      4     sequence (unique key, assigned from 1 upward)
/// Total: 17 bytes
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub symbol: String,
    pub side: Side,
    pub quantity: i32,
    pub price: i32,
    pub sequence: i32,
}

impl Record {
    /// Decode a record from exactly one frame's worth of bytes.
    pub fn try_from_slice(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != RECORD_FRAME_SIZE {
            return Err(WireError::InvalidSize(buf.len()));
        }

        let symbol = String::from_utf8_lossy(&buf[0..4])
            .trim_end_matches([' ', '\0'])
            .to_string();

        let side = Side::from_u8(buf[4]).ok_or(WireError::InvalidSide(buf[4]))?;

        let quantity = i32::from_be_bytes(buf[5..9].try_into().unwrap());
        let price = i32::from_be_bytes(buf[9..13].try_into().unwrap());
        let sequence = i32::from_be_bytes(buf[13..17].try_into().unwrap());

        Ok(Self {
            symbol,
            side,
            quantity,
            price,
            sequence,
        })
    }

    /// Serialize to frame bytes. Symbols longer than 4 bytes are truncated,
    /// shorter ones space-padded.
    pub fn to_bytes(&self) -> [u8; RECORD_FRAME_SIZE] {
        let mut buf = [0u8; RECORD_FRAME_SIZE];
        let sym = self.symbol.as_bytes();
        let n = sym.len().min(4);
        buf[..n].copy_from_slice(&sym[..n]);
        for b in buf[n..4].iter_mut() {
            *b = b' ';
        }
        buf[4] = self.side.as_u8();
        buf[5..9].copy_from_slice(&self.quantity.to_be_bytes());
        buf[9..13].copy_from_slice(&self.price.to_be_bytes());
        buf[13..17].copy_from_slice(&self.sequence.to_be_bytes());
        buf
    }
}

/// Client-to-server request frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFrame {
    /// Stream all records; server half-closes when done.
    StreamAll,
    /// Resend the record with this sequence number; exactly one frame comes back.
    Resend { sequence: i32 },
}

impl RequestFrame {
    /// Encode to the 2-byte wire form.
    ///
    /// The resend parameter is a single unsigned byte on the wire, so a
    /// sequence number outside 0..=255 cannot be round-tripped and is
    /// rejected rather than truncated.
    pub fn encode(&self) -> Result<[u8; REQUEST_FRAME_SIZE], WireError> {
        match *self {
            Self::StreamAll => Ok([OP_STREAM_ALL, 0]),
            Self::Resend { sequence } => {
                let param = u8::try_from(sequence)
                    .map_err(|_| WireError::ResendSequenceOverflow(sequence))?;
                Ok([OP_RESEND, param])
            }
        }
    }
}

/// Errors during wire protocol encoding/decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    InvalidSize(usize),
    InvalidSide(u8),
    ResendSequenceOverflow(i32),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSize(s) => {
                write!(f, "invalid frame size: {} (expected {})", s, RECORD_FRAME_SIZE)
            }
            Self::InvalidSide(b) => write!(f, "invalid side byte: 0x{:02X}", b),
            Self::ResendSequenceOverflow(seq) => write!(
                f,
                "sequence {} does not fit the single-byte resend parameter (max 255)",
                seq
            ),
        }
    }
}

impl std::error::Error for WireError {}
