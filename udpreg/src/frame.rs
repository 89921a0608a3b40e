//! The fixed 64-bit register access frame.
//!
//! Every datagram in the protocol carries exactly one frame, serialized as a big-endian `u64`:
//!
//! ```text
//! bits 63-62: opcode   (0=WRITE_REQUEST, 1=READ_REQUEST, 2=WRITE_ACK, 3=READ_ACK)
//! bits 61-32: address  (30-bit unsigned)
//! bits 31-0 : data     (32-bit unsigned)
//! ```
//!
//! Encoding never fails. Out of range inputs are truncated to their field width rather than
//! rejected, which is what the gateware on the other end expects.

use crate::Error;
use num_derive::{
    FromPrimitive,
    ToPrimitive,
};
use num_traits::FromPrimitive;

/// The number of bytes in a frame on the wire
pub const FRAME_LEN: usize = 8;
/// Mask applied to register addresses before packing
pub const ADDRESS_MASK: u32 = 0x3FFF_FFFF;
/// The largest representable register address
pub const MAX_ADDRESS: u32 = ADDRESS_MASK;

const OPCODE_MASK: u8 = 0b11;
const OPCODE_SHIFT: u32 = 62;
const ADDRESS_SHIFT: u32 = 32;

/// The operation carried by a frame
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    WriteRequest = 0,
    ReadRequest = 1,
    WriteAck = 2,
    ReadAck = 3,
}

impl Opcode {
    /// Interpret the low two bits of `bits` as an opcode. Every two bit pattern names an opcode,
    /// so this can't fail.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Opcode::from_u8(bits & OPCODE_MASK).expect("Every 2-bit value is a valid opcode")
    }

    /// The acknowledgement a conformant device answers this request with, or `None` if this is
    /// already an acknowledgement
    #[must_use]
    pub fn expected_ack(self) -> Option<Self> {
        match self {
            Opcode::WriteRequest => Some(Opcode::WriteAck),
            Opcode::ReadRequest => Some(Opcode::ReadAck),
            Opcode::WriteAck | Opcode::ReadAck => None,
        }
    }

    #[must_use]
    pub fn is_request(self) -> bool {
        self.expected_ack().is_some()
    }
}

/// One decoded register access frame
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    pub opcode: Opcode,
    /// Only the low 30 bits are meaningful, [`Frame::new`] guarantees the rest are zero
    pub address: u32,
    pub data: u32,
}

impl Frame {
    /// Build a frame, truncating `address` to 30 bits
    #[must_use]
    pub fn new(opcode: Opcode, address: u32, data: u32) -> Self {
        Self {
            opcode,
            address: address & ADDRESS_MASK,
            data,
        }
    }

    /// Pack this frame into its 8 byte wire representation
    #[must_use]
    pub fn pack(&self) -> [u8; FRAME_LEN] {
        let word = (u64::from(self.opcode as u8 & OPCODE_MASK) << OPCODE_SHIFT)
            | (u64::from(self.address & ADDRESS_MASK) << ADDRESS_SHIFT)
            | u64::from(self.data);
        word.to_be_bytes()
    }

    /// Given bytes from UDP, construct a frame
    /// # Errors
    /// Returns [`Error::MalformedFrame`] if `bytes` is not exactly [`FRAME_LEN`] long
    #[allow(clippy::cast_possible_truncation)]
    pub fn unpack(bytes: &[u8]) -> Result<Self, Error> {
        let chunk: [u8; FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| Error::MalformedFrame(bytes.len()))?;
        let word = u64::from_be_bytes(chunk);
        // The casts below intentionally drop everything above each field
        Ok(Self {
            opcode: Opcode::from_bits((word >> OPCODE_SHIFT) as u8),
            address: (word >> ADDRESS_SHIFT) as u32 & ADDRESS_MASK,
            data: word as u32,
        })
    }
}

/// Encode an `(opcode, address, data)` triple into a wire frame
#[must_use]
pub fn encode(opcode: Opcode, address: u32, data: u32) -> [u8; FRAME_LEN] {
    Frame::new(opcode, address, data).pack()
}

/// Decode a wire frame into its `(opcode, address, data)` triple
/// # Errors
/// Returns [`Error::MalformedFrame`] if `bytes` is not exactly [`FRAME_LEN`] long
pub fn decode(bytes: &[u8]) -> Result<(Opcode, u32, u32), Error> {
    let Frame {
        opcode,
        address,
        data,
    } = Frame::unpack(bytes)?;
    Ok((opcode, address, data))
}
