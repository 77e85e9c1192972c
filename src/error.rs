use thiserror::Error;

/// Shape problems detected before any data is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DimensionError {
    #[error("matrix is {rows}x{cols}, both dimensions must be even")]
    OddDimensions { rows: usize, cols: usize },
    #[error("matrix is empty ({rows}x{cols})")]
    Empty { rows: usize, cols: usize },
    #[error("data of length {len} cannot form a {rows}x{cols} matrix")]
    NotRectangular { rows: usize, cols: usize, len: usize },
    #[error("sub-band {band} is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    SubBandMismatch {
        band: &'static str,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("matrix shape is {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("tile is {rows}x{cols}, expected {size}x{size}")]
    TileShape { rows: usize, cols: usize, size: usize },
    #[error("region {height}x{width} at ({row}, {col}) exceeds a {rows}x{cols} matrix")]
    OutOfBounds {
        row: usize,
        col: usize,
        height: usize,
        width: usize,
        rows: usize,
        cols: usize,
    },
}

#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error(transparent)]
    Dimension(#[from] DimensionError),
    #[error("no watermark found in any of {tiles} tiles")]
    NotFound { tiles: usize },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
