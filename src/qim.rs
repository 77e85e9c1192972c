use crate::dct::BlockDct;
use crate::matrix::Block;

/// Quantization step used when none is configured
pub const DEFAULT_DELTA: f64 = 10.0;

/// DCT positions `(row, col)` carrying bit 0 and bit 1 of each block.
pub const PAYLOAD_POSITIONS: [(usize, usize); 2] = [(1, 3), (3, 1)];

/// Value of one payload coefficient before and after embedding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficient {
    pub position: (usize, usize),
    pub before: f64,
    pub after: f64,
}

/// Lower edge of the quantization cell containing `c`.
fn cell_base(c: f64, delta: f64) -> f64 {
    (c / delta).floor() * delta
}

/// Moves `c` to the centre of the bit's half of its quantization cell.
pub fn embed_bit(c: f64, bit: bool, delta: f64) -> f64 {
    let base = cell_base(c, delta);
    if bit {
        base + 3.0 * delta / 4.0
    } else {
        base + delta / 4.0
    }
}

/// Reads the bit back from the position of `c` inside its cell.
///
/// The remainder is computed by floor subtraction, so it lies in
/// `[0, delta)` for negative coefficients too.
pub fn extract_bit(c: f64, delta: f64) -> bool {
    let remainder = c - cell_base(c, delta);
    remainder >= delta / 2.0
}

/// Embeds two bits into a spatial-domain block, in place.
pub fn embed_block(dct: &BlockDct, block: &mut Block, bits: [bool; 2], delta: f64) -> [Coefficient; 2] {
    let mut coefficients = dct.forward(block);

    let changes = [0, 1].map(|i| {
        let (r, c) = PAYLOAD_POSITIONS[i];
        let before = coefficients[r][c];
        let after = embed_bit(before, bits[i], delta);
        coefficients[r][c] = after;
        Coefficient {
            position: (r, c),
            before,
            after,
        }
    });

    *block = dct.inverse(&coefficients);
    changes
}

/// The two payload coefficients of a spatial-domain block
pub fn read_coefficients(dct: &BlockDct, block: &Block) -> [f64; 2] {
    let coefficients = dct.forward(block);
    PAYLOAD_POSITIONS.map(|(r, c)| coefficients[r][c])
}

pub fn extract_block(dct: &BlockDct, block: &Block, delta: f64) -> [bool; 2] {
    read_coefficients(dct, block).map(|c| extract_bit(c, delta))
}
