//! Invisible text watermarks for still images.
//!
//! The luminance of an image is split by a single Haar wavelet level, the
//! message is framed with start/end flags and written with QIM into two
//! mid-frequency DCT coefficients of every 8 * 8 block of each 128 * 128
//! tile of the `HL` band. Every tile carries a full copy; extraction decodes
//! each tile on its own and takes a majority vote.
//!
//! ```no_run
//! use dwt_watermark::{embed_image, extract_image, load_image};
//!
//! let cover = load_image("cover.png")?;
//! let marked = embed_image(&cover, "Hello World")?;
//! marked.save("marked.png")?;
//!
//! let consensus = extract_image(&load_image("marked.png")?)?;
//! assert_eq!(consensus.message, "Hello World");
//! # Ok::<(), dwt_watermark::WatermarkError>(())
//! ```

pub mod bitstream;
pub mod colorspace;
pub mod consensus;
pub mod dct;
pub mod diagnostics;
pub mod dwt;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod qim;
pub mod tile;
pub mod trace;

use std::path::Path;

use image::{DynamicImage, RgbImage};

pub use consensus::Consensus;
pub use engine::{TileResult, WatermarkConfig, WatermarkEngine};
pub use error::{DimensionError, Result, WatermarkError};
pub use matrix::Matrix;
pub use tile::MAX_MESSAGE_BYTES;

/// Load the image indicated by the path
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}

/// Watermarks an image with the default engine.
pub fn embed_image(image: &DynamicImage, message: &str) -> Result<RgbImage> {
    embed_image_with(&WatermarkEngine::new(), image, message)
}

pub fn embed_image_with(engine: &WatermarkEngine, image: &DynamicImage, message: &str) -> Result<RgbImage> {
    let planes = colorspace::split_luma(image)?;
    let marked = engine.embed(&planes.luma, message)?;
    let (rgb, normalization) = colorspace::merge_luma(&planes, &marked)?;
    if normalization.was_rescaled() {
        tracing::info!(
            min = normalization.min,
            max = normalization.max,
            scale = normalization.scale,
            "luma rescaled to fit pixel range"
        );
    }
    Ok(rgb)
}

/// Reads the watermark of an image with the default engine.
pub fn extract_image(image: &DynamicImage) -> Result<Consensus> {
    extract_image_with(&WatermarkEngine::new(), image)
}

pub fn extract_image_with(engine: &WatermarkEngine, image: &DynamicImage) -> Result<Consensus> {
    let planes = colorspace::split_luma(image)?;
    engine.extract(&planes.luma)
}
