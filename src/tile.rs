//! Redundant embedding over 128 * 128 tiles of a sub-band.
//!
//! Every full tile gets its own complete copy of the stream, two bits per
//! 8 * 8 block in row-major block order. Rows and columns left over at the
//! band edges belong to no tile and are never touched.

use std::fmt;

use bitvec::prelude::*;
use rayon::prelude::*;

use crate::bitstream::{BitStream, FLAG_BITS};
use crate::dct::BlockDct;
use crate::error::DimensionError;
use crate::matrix::{Matrix, BLOCK_SIZE};
use crate::qim;
use crate::trace::{Event, Observer};

pub const TILE_SIZE: usize = 128;
pub const BLOCKS_PER_SIDE: usize = TILE_SIZE / BLOCK_SIZE;
pub const BLOCKS_PER_TILE: usize = BLOCKS_PER_SIDE * BLOCKS_PER_SIDE;
pub const BITS_PER_BLOCK: usize = 2;
pub const TILE_CAPACITY_BITS: usize = BLOCKS_PER_TILE * BITS_PER_BLOCK;

/// Longest message whose whole frame fits in one tile.
pub const MAX_MESSAGE_BYTES: usize = (TILE_CAPACITY_BITS - 2 * FLAG_BITS) / 8;

/// Position of a tile in the tile grid of a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub row: usize,
    pub col: usize,
}

impl TileIndex {
    /// Top-left element of the tile inside its band.
    pub fn origin(&self) -> (usize, usize) {
        (self.row * TILE_SIZE, self.col * TILE_SIZE)
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.row, self.col)
    }
}

/// Full tiles of a `rows * cols` band, in row-major order.
pub fn tile_grid(rows: usize, cols: usize) -> impl Iterator<Item = TileIndex> {
    let (tile_rows, tile_cols) = (rows / TILE_SIZE, cols / TILE_SIZE);
    (0..tile_rows).flat_map(move |row| (0..tile_cols).map(move |col| TileIndex { row, col }))
}

fn block_origin(block: usize) -> (usize, usize) {
    (
        (block / BLOCKS_PER_SIDE) * BLOCK_SIZE,
        (block % BLOCKS_PER_SIDE) * BLOCK_SIZE,
    )
}

fn check_tile(tile: &Matrix) -> Result<(), DimensionError> {
    if tile.dimensions() != (TILE_SIZE, TILE_SIZE) {
        return Err(DimensionError::TileShape {
            rows: tile.rows(),
            cols: tile.cols(),
            size: TILE_SIZE,
        });
    }
    Ok(())
}

/// Writes as much of `stream` as fits into one tile.
///
/// Returns the number of blocks written. Blocks past the end of the stream
/// are left as they were, and a stream longer than the tile is cut short.
pub fn embed_tile(
    dct: &BlockDct,
    tile: &mut Matrix,
    stream: &BitSlice<u8, Msb0>,
    delta: f64,
    index: TileIndex,
    observer: &dyn Observer,
) -> Result<usize, DimensionError> {
    check_tile(tile)?;

    let mut written = 0;
    for (block_idx, pair) in stream
        .chunks_exact(BITS_PER_BLOCK)
        .take(BLOCKS_PER_TILE)
        .enumerate()
    {
        let (r, c) = block_origin(block_idx);
        let mut block = tile.block(r, c)?;
        let changes = qim::embed_block(dct, &mut block, [pair[0], pair[1]], delta);
        tile.put_block(r, c, &block)?;

        for change in &changes {
            observer.event(&Event::CoefficientEmbedded {
                tile: index,
                block: block_idx,
                position: change.position,
                before: change.before,
                after: change.after,
            });
        }
        written += 1;
    }
    Ok(written)
}

/// Reads every block of a tile, always [`TILE_CAPACITY_BITS`] bits.
pub fn read_tile_bits(dct: &BlockDct, tile: &Matrix, delta: f64) -> Result<BitStream, DimensionError> {
    check_tile(tile)?;

    let mut bits = BitStream::with_capacity(TILE_CAPACITY_BITS);
    for block_idx in 0..BLOCKS_PER_TILE {
        let (r, c) = block_origin(block_idx);
        let block = tile.block(r, c)?;
        bits.extend(qim::extract_block(dct, &block, delta));
    }
    Ok(bits)
}

/// Embeds a copy of `stream` into every full tile of `band`, returns the tile count.
pub fn embed_band(
    dct: &BlockDct,
    band: &mut Matrix,
    stream: &BitSlice<u8, Msb0>,
    delta: f64,
    observer: &dyn Observer,
) -> Result<usize, DimensionError> {
    let mut tiles = 0;
    for index in tile_grid(band.rows(), band.cols()) {
        let (r, c) = index.origin();
        let mut tile = band.region(r, c, TILE_SIZE, TILE_SIZE)?;
        let blocks = embed_tile(dct, &mut tile, stream, delta, index, observer)?;
        band.put_region(r, c, &tile)?;
        tracing::trace!(%index, blocks, "tile embedded");
        tiles += 1;
    }
    Ok(tiles)
}

/// Reads the raw bits of every full tile of `band`, tiles processed in parallel.
pub fn read_band(
    dct: &BlockDct,
    band: &Matrix,
    delta: f64,
) -> Result<Vec<(TileIndex, BitStream)>, DimensionError> {
    let tiles: Vec<TileIndex> = tile_grid(band.rows(), band.cols()).collect();
    tiles
        .into_par_iter()
        .map(|index| -> Result<_, DimensionError> {
            let (r, c) = index.origin();
            let tile = band.region(r, c, TILE_SIZE, TILE_SIZE)?;
            Ok((index, read_tile_bits(dct, &tile, delta)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream;
    use crate::qim::DEFAULT_DELTA;
    use crate::trace::recording::RecordingObserver;
    use crate::trace::NoopObserver;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_band(rows: usize, cols: usize, seed: u64) -> Matrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let data = (0..rows * cols).map(|_| rng.gen_range(-60.0..60.0)).collect();
        Matrix::from_vec(rows, cols, data).unwrap()
    }

    #[test]
    fn test_capacity_constants() {
        assert_eq!(BLOCKS_PER_TILE, 256);
        assert_eq!(TILE_CAPACITY_BITS, 512);
        assert_eq!(MAX_MESSAGE_BYTES, 60);
    }

    #[test]
    fn test_tile_grid_is_row_major_and_skips_partial_tiles() {
        let grid: Vec<_> = tile_grid(300, 260).collect();
        assert_eq!(
            grid,
            [
                TileIndex { row: 0, col: 0 },
                TileIndex { row: 0, col: 1 },
                TileIndex { row: 1, col: 0 },
                TileIndex { row: 1, col: 1 },
            ]
        );
        assert_eq!(tile_grid(127, 1024).count(), 0);
        assert_eq!(TileIndex { row: 1, col: 2 }.origin(), (128, 256));
    }

    #[test]
    fn test_tile_round_trip() {
        let dct = BlockDct::new();
        let mut tile = random_band(TILE_SIZE, TILE_SIZE, 1);
        let stream = bitstream::encode("Hello World");

        let written = embed_tile(
            &dct,
            &mut tile,
            &stream,
            DEFAULT_DELTA,
            TileIndex { row: 0, col: 0 },
            &NoopObserver,
        )
        .unwrap();
        assert_eq!(written, stream.len() / 2);

        let bits = read_tile_bits(&dct, &tile, DEFAULT_DELTA).unwrap();
        assert_eq!(bits.len(), TILE_CAPACITY_BITS);
        assert_eq!(&bits[..stream.len()], &stream[..]);
        assert_eq!(bitstream::decode(&bits).unwrap().message, "Hello World");
    }

    #[test]
    fn test_trailing_blocks_are_untouched() {
        let dct = BlockDct::new();
        let original = random_band(TILE_SIZE, TILE_SIZE, 2);
        let mut tile = original.clone();
        let stream = bitstream::encode("hi");
        let written = embed_tile(
            &dct,
            &mut tile,
            &stream,
            DEFAULT_DELTA,
            TileIndex { row: 0, col: 0 },
            &NoopObserver,
        )
        .unwrap();

        for block_idx in written..BLOCKS_PER_TILE {
            let (r, c) = block_origin(block_idx);
            assert_eq!(tile.block(r, c).unwrap(), original.block(r, c).unwrap());
        }
    }

    #[test]
    fn test_sixty_byte_message_fills_tile_exactly() {
        let dct = BlockDct::new();
        let message = "a".repeat(MAX_MESSAGE_BYTES);
        let stream = bitstream::encode(&message);
        assert_eq!(stream.len(), TILE_CAPACITY_BITS);

        let mut tile = random_band(TILE_SIZE, TILE_SIZE, 3);
        let written = embed_tile(
            &dct,
            &mut tile,
            &stream,
            DEFAULT_DELTA,
            TileIndex { row: 0, col: 0 },
            &NoopObserver,
        )
        .unwrap();
        assert_eq!(written, BLOCKS_PER_TILE);

        let bits = read_tile_bits(&dct, &tile, DEFAULT_DELTA).unwrap();
        assert_eq!(bitstream::decode(&bits).unwrap().message, message);
    }

    #[test]
    fn test_oversized_message_is_truncated_without_panicking() {
        let dct = BlockDct::new();
        let message = "a".repeat(MAX_MESSAGE_BYTES + 1);
        let stream = bitstream::encode(&message);

        let mut tile = random_band(TILE_SIZE, TILE_SIZE, 4);
        let written = embed_tile(
            &dct,
            &mut tile,
            &stream,
            DEFAULT_DELTA,
            TileIndex { row: 0, col: 0 },
            &NoopObserver,
        )
        .unwrap();
        assert_eq!(written, BLOCKS_PER_TILE);

        let bits = read_tile_bits(&dct, &tile, DEFAULT_DELTA).unwrap();
        assert_eq!(&bits[..], &stream[..TILE_CAPACITY_BITS]);
        // the end flag got cut, so the frame cannot close
        assert_eq!(bitstream::decode(&bits), None);
    }

    #[test]
    fn test_wrong_tile_shape_is_rejected() {
        let dct = BlockDct::new();
        let tile = Matrix::zeros(64, 128);
        assert!(matches!(
            read_tile_bits(&dct, &tile, DEFAULT_DELTA),
            Err(DimensionError::TileShape { rows: 64, cols: 128, .. })
        ));
    }

    #[test]
    fn test_band_embedding_covers_full_tiles_only() {
        let dct = BlockDct::new();
        let original = random_band(300, 260, 5);
        let mut band = original.clone();
        let stream = bitstream::encode("tiles");
        let observer = RecordingObserver::default();

        let tiles = embed_band(&dct, &mut band, &stream, DEFAULT_DELTA, &observer).unwrap();
        assert_eq!(tiles, 4);
        assert_eq!(observer.count("CoefficientEmbedded"), 4 * stream.len());

        // right and bottom margins stay as they were
        for r in 0..300 {
            for c in 256..260 {
                assert_eq!(band[(r, c)], original[(r, c)]);
            }
        }
        for r in 256..300 {
            for c in 0..260 {
                assert_eq!(band[(r, c)], original[(r, c)]);
            }
        }

        let read = read_band(&dct, &band, DEFAULT_DELTA).unwrap();
        assert_eq!(read.len(), 4);
        for (i, (index, bits)) in read.iter().enumerate() {
            assert_eq!(*index, tile_grid(300, 260).nth(i).unwrap());
            assert_eq!(bitstream::decode(bits).unwrap().message, "tiles");
        }
    }
}
