//! Framing of a text message as a flagged bit sequence.
//!
//! Layout: `11110000 11110000`, message bytes MSB first, `00001111 00001111`.
//! Flags are not escaped, a payload containing the end pattern ends the
//! frame early on decode.

use bitvec::prelude::*;

pub type BitStream = BitVec<u8, Msb0>;

pub static START_FLAG: [u8; 2] = [0b1111_0000, 0b1111_0000];
pub static END_FLAG: [u8; 2] = [0b0000_1111, 0b0000_1111];

pub const FLAG_BITS: usize = 16;

/// A decoded frame with the bit offsets where its flags were matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message: String,
    /// Offset of the start flag.
    pub start: usize,
    /// Offset of the end flag.
    pub end: usize,
}

impl Frame {
    /// Number of payload bits between the flags.
    pub fn payload_bits(&self) -> usize {
        self.end - self.start - FLAG_BITS
    }
}

pub fn encode(message: &str) -> BitStream {
    let mut bytes = Vec::with_capacity(message.len() + 2 * START_FLAG.len());
    bytes.extend_from_slice(&START_FLAG);
    bytes.extend_from_slice(message.as_bytes());
    bytes.extend_from_slice(&END_FLAG);
    BitStream::from_vec(bytes)
}

fn find(haystack: &BitSlice<u8, Msb0>, needle: &BitSlice<u8, Msb0>) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Finds the first start flag, then the first end flag after it.
///
/// A payload that is not a whole number of bytes is padded with zero bits on
/// the right. Invalid UTF-8 is replaced rather than rejected.
pub fn decode(bits: &BitSlice<u8, Msb0>) -> Option<Frame> {
    let start = find(bits, START_FLAG.view_bits::<Msb0>())?;
    let payload_start = start + FLAG_BITS;
    let end = payload_start + find(&bits[payload_start..], END_FLAG.view_bits::<Msb0>())?;

    let bytes: Vec<u8> = bits[payload_start..end]
        .chunks(8)
        .map(|chunk| chunk.load_be::<u8>() << (8 - chunk.len()))
        .collect();

    Some(Frame {
        message: String::from_utf8_lossy(&bytes).into_owned(),
        start,
        end,
    })
}
