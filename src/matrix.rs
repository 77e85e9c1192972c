//! Dense row-major `f64` matrix used by every transform stage.

use std::ops::{Index, IndexMut};

use crate::error::DimensionError;

/// Side length of a DCT block.
pub const BLOCK_SIZE: usize = 8;

/// An 8 * 8 block copied out of a matrix.
pub type Block = [[f64; BLOCK_SIZE]; BLOCK_SIZE];

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wraps a row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, DimensionError> {
        if data.len() != rows * cols {
            return Err(DimensionError::NotRectangular {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from nested rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, DimensionError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(height * width);
        for row in rows {
            if row.len() != width {
                return Err(DimensionError::NotRectangular {
                    rows: height,
                    cols: width,
                    len: data.len() + row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: height,
            cols: width,
            data,
        })
    }

    /// Transposes a column-major buffer (column `c` at `data[c * rows..]`) into a matrix.
    pub fn from_column_major(
        rows: usize,
        cols: usize,
        data: &[f64],
    ) -> Result<Self, DimensionError> {
        if data.len() != rows * cols {
            return Err(DimensionError::NotRectangular {
                rows,
                cols,
                len: data.len(),
            });
        }
        let mut out = Self::zeros(rows, cols);
        for (c, column) in data.chunks_exact(rows.max(1)).enumerate() {
            for (r, &value) in column.iter().enumerate() {
                out.data[r * cols + c] = value;
            }
        }
        Ok(out)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Smallest and largest element, `None` for an empty matrix.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let first = *self.data.first()?;
        Some(
            self.data
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    fn check_region(
        &self,
        row: usize,
        col: usize,
        height: usize,
        width: usize,
    ) -> Result<(), DimensionError> {
        if row + height > self.rows || col + width > self.cols {
            return Err(DimensionError::OutOfBounds {
                row,
                col,
                height,
                width,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    /// Copies the 8 * 8 block whose top-left corner is `(row, col)`.
    pub fn block(&self, row: usize, col: usize) -> Result<Block, DimensionError> {
        self.check_region(row, col, BLOCK_SIZE, BLOCK_SIZE)?;
        let mut block = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
        for (i, line) in block.iter_mut().enumerate() {
            let start = (row + i) * self.cols + col;
            line.copy_from_slice(&self.data[start..start + BLOCK_SIZE]);
        }
        Ok(block)
    }

    pub fn put_block(&mut self, row: usize, col: usize, block: &Block) -> Result<(), DimensionError> {
        self.check_region(row, col, BLOCK_SIZE, BLOCK_SIZE)?;
        for (i, line) in block.iter().enumerate() {
            let start = (row + i) * self.cols + col;
            self.data[start..start + BLOCK_SIZE].copy_from_slice(line);
        }
        Ok(())
    }

    /// Copies a `height * width` region whose top-left corner is `(row, col)`.
    pub fn region(
        &self,
        row: usize,
        col: usize,
        height: usize,
        width: usize,
    ) -> Result<Matrix, DimensionError> {
        self.check_region(row, col, height, width)?;
        let mut data = Vec::with_capacity(height * width);
        for r in row..row + height {
            let start = r * self.cols + col;
            data.extend_from_slice(&self.data[start..start + width]);
        }
        Ok(Matrix {
            rows: height,
            cols: width,
            data,
        })
    }

    pub fn put_region(&mut self, row: usize, col: usize, region: &Matrix) -> Result<(), DimensionError> {
        self.check_region(row, col, region.rows, region.cols)?;
        for r in 0..region.rows {
            let start = (row + r) * self.cols + col;
            self.data[start..start + region.cols].copy_from_slice(region.row(r));
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f64 {
        &mut self.data[r * self.cols + c]
    }
}
