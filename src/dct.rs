use std::sync::Arc;

use rustdct::{DctPlanner, TransformType2And3};

use crate::matrix::{Block, BLOCK_SIZE};

/// Orthonormal scale of coefficient `k`: sqrt(1/N) for DC, sqrt(2/N) otherwise
fn alpha(k: usize) -> f64 {
    if k == 0 {
        (1.0 / BLOCK_SIZE as f64).sqrt()
    } else {
        (2.0 / BLOCK_SIZE as f64).sqrt()
    }
}

/// Separable 8 * 8 DCT with orthonormal scaling.
///
/// rustdct does not normalize, so outputs are rescaled by `alpha(k)` on the
/// way in and the inverse feeds DCT3 with a doubled DC term, which cancels
/// the half weight rustdct gives to the first input of a DCT3.
#[derive(Clone)]
pub struct BlockDct {
    plan: Arc<dyn TransformType2And3<f64>>,
}

impl BlockDct {
    pub fn new() -> Self {
        let mut planner = DctPlanner::new();
        Self {
            plan: planner.plan_dct2(BLOCK_SIZE),
        }
    }

    fn forward_1d(&self, line: &mut [f64; BLOCK_SIZE]) {
        self.plan.process_dct2(line);
        for (k, value) in line.iter_mut().enumerate() {
            *value *= alpha(k);
        }
    }

    fn inverse_1d(&self, line: &mut [f64; BLOCK_SIZE]) {
        for (k, value) in line.iter_mut().enumerate() {
            *value *= alpha(k);
        }
        line[0] *= 2.0;
        self.plan.process_dct3(line);
    }

    /// Type-II DCT: rows first, then columns.
    pub fn forward(&self, block: &Block) -> Block {
        let mut out = *block;
        for row in out.iter_mut() {
            self.forward_1d(row);
        }

        // Transpose, transform the columns as rows, transpose back
        let mut transposed = transpose(&out);
        for column in transposed.iter_mut() {
            self.forward_1d(column);
        }
        transpose(&transposed)
    }

    /// Type-III DCT: columns first, then rows.
    pub fn inverse(&self, coefficients: &Block) -> Block {
        let mut transposed = transpose(coefficients);
        for column in transposed.iter_mut() {
            self.inverse_1d(column);
        }

        let mut out = transpose(&transposed);
        for row in out.iter_mut() {
            self.inverse_1d(row);
        }
        out
    }
}

impl Default for BlockDct {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlockDct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockDct").field("len", &BLOCK_SIZE).finish()
    }
}

fn transpose(block: &Block) -> Block {
    let mut out = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
    for (i, row) in block.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            out[j][i] = value;
        }
    }
    out
}
