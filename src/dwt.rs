//! Single-level 2D Haar wavelet transform.
//!
//! Each pass is a fork-join over rayon: one task per row for the row passes,
//! one task per column for the column passes. Row tasks write to disjoint
//! row chunks of the output, column tasks write to disjoint columns of a
//! column-major scratch buffer that is transposed afterwards, so no task
//! ever shares a writable cell with another. A pass returns only when all of
//! its tasks have finished, and the next pass reads its output.

use std::f64::consts::FRAC_1_SQRT_2;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::DimensionError;
use crate::matrix::Matrix;
use crate::trace::{Event, NoopObserver, Observer, Pass};

/// The four quadrants of one decomposition, all `rows/2 * cols/2`.
///
/// Rows are filtered first: `LL`/`LH` come from the row low-pass output,
/// `HL`/`HH` from the row high-pass output.
#[derive(Debug, Clone, PartialEq)]
pub struct SubBands {
    pub ll: Matrix,
    pub lh: Matrix,
    pub hl: Matrix,
    pub hh: Matrix,
}

impl SubBands {
    pub fn dimensions(&self) -> (usize, usize) {
        self.ll.dimensions()
    }

    fn check_shapes(&self) -> Result<(), DimensionError> {
        let (rows, cols) = self.ll.dimensions();
        if rows == 0 || cols == 0 {
            return Err(DimensionError::Empty { rows, cols });
        }
        for (band, m) in [("LH", &self.lh), ("HL", &self.hl), ("HH", &self.hh)] {
            if m.dimensions() != (rows, cols) {
                return Err(DimensionError::SubBandMismatch {
                    band,
                    rows: m.rows(),
                    cols: m.cols(),
                    expected_rows: rows,
                    expected_cols: cols,
                });
            }
        }
        Ok(())
    }
}

/// Haar analysis of one line into its low and high halves.
fn analyze(input: &[f64], low: &mut [f64], high: &mut [f64]) {
    for (i, pair) in input.chunks_exact(2).enumerate() {
        low[i] = (pair[0] + pair[1]) * FRAC_1_SQRT_2;
        high[i] = (pair[0] - pair[1]) * FRAC_1_SQRT_2;
    }
}

/// Haar synthesis, the exact inverse of [`analyze`].
fn synthesize(low: &[f64], high: &[f64], output: &mut [f64]) {
    for (i, pair) in output.chunks_exact_mut(2).enumerate() {
        pair[0] = (low[i] + high[i]) * FRAC_1_SQRT_2;
        pair[1] = (low[i] - high[i]) * FRAC_1_SQRT_2;
    }
}

fn timed<T>(observer: &dyn Observer, pass: Pass, rows: usize, cols: usize, f: impl FnOnce() -> T) -> T {
    observer.event(&Event::PassStarted { pass, rows, cols });
    let start = Instant::now();
    let out = f();
    observer.event(&Event::PassFinished {
        pass,
        elapsed: start.elapsed(),
    });
    out
}

/// Column-wise analysis of a row-major `rows * cols` buffer.
///
/// Returns `(low, high)`, each `rows/2 * cols`, as row-major matrices.
fn analyze_columns(input: &[f64], rows: usize, cols: usize) -> Result<(Matrix, Matrix), DimensionError> {
    let half = rows / 2;
    let mut low = vec![0.0; half * cols];
    let mut high = vec![0.0; half * cols];

    low.par_chunks_mut(half)
        .zip(high.par_chunks_mut(half))
        .enumerate()
        .for_each(|(c, (low, high))| {
            let column: Vec<f64> = (0..rows).map(|r| input[r * cols + c]).collect();
            analyze(&column, low, high);
        });

    Ok((
        Matrix::from_column_major(half, cols, &low)?,
        Matrix::from_column_major(half, cols, &high)?,
    ))
}

/// Column-wise synthesis of two row-major `rows * cols` bands into `2*rows * cols`.
fn synthesize_columns(low: &Matrix, high: &Matrix) -> Result<Matrix, DimensionError> {
    let (rows, cols) = low.dimensions();
    let full = rows * 2;
    let mut out = vec![0.0; full * cols];

    out.par_chunks_mut(full).enumerate().for_each(|(c, column)| {
        let low: Vec<f64> = (0..rows).map(|r| low[(r, c)]).collect();
        let high: Vec<f64> = (0..rows).map(|r| high[(r, c)]).collect();
        synthesize(&low, &high, column);
    });

    Matrix::from_column_major(full, cols, &out)
}

pub fn forward(luma: &Matrix) -> Result<SubBands, DimensionError> {
    forward_observed(luma, &NoopObserver)
}

/// Decomposes `luma` into four sub-bands.
///
/// Fails before doing any work unless both dimensions are even and non-zero.
pub fn forward_observed(luma: &Matrix, observer: &dyn Observer) -> Result<SubBands, DimensionError> {
    let (rows, cols) = luma.dimensions();
    if rows == 0 || cols == 0 {
        return Err(DimensionError::Empty { rows, cols });
    }
    if rows % 2 != 0 || cols % 2 != 0 {
        return Err(DimensionError::OddDimensions { rows, cols });
    }
    let half_cols = cols / 2;

    let (temp_l, temp_h) = timed(observer, Pass::ForwardRows, rows, cols, || {
        let mut temp_l = vec![0.0; rows * half_cols];
        let mut temp_h = vec![0.0; rows * half_cols];
        temp_l
            .par_chunks_mut(half_cols)
            .zip(temp_h.par_chunks_mut(half_cols))
            .zip(luma.as_slice().par_chunks(cols))
            .for_each(|((low, high), row)| analyze(row, low, high));
        (temp_l, temp_h)
    });

    let (low_bands, high_bands) = timed(observer, Pass::ForwardColumns, rows, half_cols, || {
        rayon::join(
            || analyze_columns(&temp_l, rows, half_cols),
            || analyze_columns(&temp_h, rows, half_cols),
        )
    });
    let (ll, lh) = low_bands?;
    let (hl, hh) = high_bands?;

    Ok(SubBands { ll, lh, hl, hh })
}

pub fn inverse(bands: SubBands) -> Result<Matrix, DimensionError> {
    inverse_observed(bands, &NoopObserver)
}

/// Rebuilds the full matrix from four sub-bands, columns first, then rows.
pub fn inverse_observed(bands: SubBands, observer: &dyn Observer) -> Result<Matrix, DimensionError> {
    bands.check_shapes()?;
    let (half_rows, half_cols) = bands.dimensions();
    let (rows, cols) = (half_rows * 2, half_cols * 2);

    let (temp_l, temp_h) = timed(observer, Pass::InverseColumns, half_rows, half_cols, || {
        rayon::join(
            || synthesize_columns(&bands.ll, &bands.lh),
            || synthesize_columns(&bands.hl, &bands.hh),
        )
    });
    let (temp_l, temp_h) = (temp_l?, temp_h?);

    let out = timed(observer, Pass::InverseRows, rows, cols, || {
        let mut out = vec![0.0; rows * cols];
        out.par_chunks_mut(cols)
            .enumerate()
            .for_each(|(r, row)| synthesize(temp_l.row(r), temp_h.row(r), row));
        out
    });

    Matrix::from_vec(rows, cols, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::recording::RecordingObserver;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Matrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let data = (0..rows * cols).map(|_| rng.gen_range(-128.0..128.0)).collect();
        Matrix::from_vec(rows, cols, data).unwrap()
    }

    fn assert_close(a: &Matrix, b: &Matrix) {
        assert_eq!(a.dimensions(), b.dimensions());
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((x - y).abs() < 1e-9, "{x} vs {y}");
        }
    }

    #[test]
    fn test_round_trip_random_matrices() {
        for (rows, cols, seed) in [(2, 2, 1), (8, 16, 2), (64, 38, 3), (256, 256, 4)] {
            let m = random_matrix(rows, cols, seed);
            let bands = forward(&m).unwrap();
            assert_eq!(bands.dimensions(), (rows / 2, cols / 2));
            assert_close(&inverse(bands).unwrap(), &m);
        }
    }

    #[test]
    fn test_known_2x2_decomposition() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let bands = forward(&m).unwrap();

        // rows: L = [3, 7] / sqrt2, H = [-1, -1] / sqrt2; then columns
        assert!((bands.ll[(0, 0)] - 5.0).abs() < 1e-12);
        assert!((bands.lh[(0, 0)] + 2.0).abs() < 1e-12);
        assert!((bands.hl[(0, 0)] + 1.0).abs() < 1e-12);
        assert!(bands.hh[(0, 0)].abs() < 1e-12);
    }

    #[test]
    fn test_constant_matrix_has_no_detail() {
        let bands = forward(&Matrix::filled(16, 16, 37.25)).unwrap();
        for band in [&bands.lh, &bands.hl, &bands.hh] {
            assert!(band.as_slice().iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_odd_and_empty_dimensions_are_rejected() {
        assert_eq!(
            forward(&Matrix::zeros(4, 5)).unwrap_err(),
            DimensionError::OddDimensions { rows: 4, cols: 5 }
        );
        assert_eq!(
            forward(&Matrix::zeros(3, 4)).unwrap_err(),
            DimensionError::OddDimensions { rows: 3, cols: 4 }
        );
        assert!(matches!(
            forward(&Matrix::zeros(0, 4)).unwrap_err(),
            DimensionError::Empty { .. }
        ));
    }

    #[test]
    fn test_mismatched_sub_bands_are_rejected() {
        let mut bands = forward(&random_matrix(8, 8, 9)).unwrap();
        bands.hh = Matrix::zeros(4, 2);
        assert!(matches!(
            inverse(bands).unwrap_err(),
            DimensionError::SubBandMismatch { band: "HH", .. }
        ));
    }

    #[test]
    fn test_hl_edit_stays_local() {
        let m = random_matrix(16, 16, 5);
        let mut bands = forward(&m).unwrap();
        bands.hl[(3, 4)] += 1.0;
        let edited = inverse(bands).unwrap();

        for r in 0..16 {
            for c in 0..16 {
                let inside = r / 2 == 3 && c / 2 == 4;
                let moved = (edited[(r, c)] - m[(r, c)]).abs() > 1e-9;
                assert_eq!(inside, moved, "pixel ({r}, {c})");
            }
        }
    }

    #[test]
    fn test_passes_are_reported_in_order() {
        let observer = RecordingObserver::default();
        let bands = forward_observed(&random_matrix(8, 8, 6), &observer).unwrap();
        inverse_observed(bands, &observer).unwrap();

        let started: Vec<_> = observer
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with("PassStarted"))
            .map(|e| e.split(',').next().unwrap().to_string())
            .collect();
        assert_eq!(
            started,
            [
                "PassStarted { pass: ForwardRows",
                "PassStarted { pass: ForwardColumns",
                "PassStarted { pass: InverseColumns",
                "PassStarted { pass: InverseRows",
            ]
        );
        assert_eq!(observer.count("PassFinished"), 4);
    }
}
