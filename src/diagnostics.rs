//! Measurements for checking a watermark run; the library never prints them.

use bitvec::prelude::*;

use crate::bitstream;
use crate::engine::WatermarkEngine;
use crate::error::{DimensionError, Result};
use crate::matrix::Matrix;
use crate::tile::TileIndex;

/// Element-wise difference between two matrices of the same shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructionError {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub max: f64,
}

impl ReconstructionError {
    pub fn between(original: &Matrix, reconstructed: &Matrix) -> std::result::Result<Self, DimensionError> {
        if original.dimensions() != reconstructed.dimensions() {
            return Err(DimensionError::ShapeMismatch {
                expected: original.dimensions(),
                actual: reconstructed.dimensions(),
            });
        }

        let count = original.as_slice().len().max(1) as f64;
        let (sum_abs, sum_sq, max) = original
            .as_slice()
            .iter()
            .zip(reconstructed.as_slice())
            .map(|(a, b)| (a - b).abs())
            .fold((0.0, 0.0, 0.0_f64), |(abs, sq, max), e| (abs + e, sq + e * e, max.max(e)));

        let mse = sum_sq / count;
        Ok(Self {
            mae: sum_abs / count,
            mse,
            rmse: mse.sqrt(),
            max,
        })
    }

    /// PSNR in dB for 8-bit samples, infinite for identical inputs.
    pub fn psnr(&self) -> f64 {
        10.0 * (255.0 * 255.0 / self.mse).log10()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitAccuracy {
    pub matched: usize,
    pub compared: usize,
}

impl BitAccuracy {
    /// Compares the common prefix of both sequences.
    pub fn compare(extracted: &BitSlice<u8, Msb0>, expected: &BitSlice<u8, Msb0>) -> Self {
        let compared = extracted.len().min(expected.len());
        let matched = extracted[..compared]
            .iter()
            .zip(expected[..compared].iter())
            .filter(|(a, b)| **a == **b)
            .count();
        Self { matched, compared }
    }

    pub fn ratio(&self) -> f64 {
        if self.compared == 0 {
            return 0.0;
        }
        self.matched as f64 / self.compared as f64
    }
}

/// Per-tile check of an expected message against what was read.
#[derive(Debug, Clone, PartialEq)]
pub struct TileInspection {
    pub index: TileIndex,
    pub accuracy: BitAccuracy,
    pub message: Option<String>,
}

impl TileInspection {
    pub fn matches(&self, expected: &str) -> bool {
        self.message.as_deref() == Some(expected)
    }
}

/// Reads every tile of `luma` and compares it with the stream `expected` would produce.
pub fn inspect(engine: &WatermarkEngine, luma: &Matrix, expected: &str) -> Result<Vec<TileInspection>> {
    let stream = bitstream::encode(expected);
    let tiles = engine.extract_tiles(luma)?;

    Ok(tiles
        .into_iter()
        .map(|tile| TileInspection {
            index: tile.index,
            accuracy: BitAccuracy::compare(&tile.bits, &stream),
            message: tile.frame.map(|frame| frame.message),
        })
        .collect())
}
