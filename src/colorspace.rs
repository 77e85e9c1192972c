use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use crate::error::DimensionError;
use crate::matrix::Matrix;

/// Offset removed from luma so the matrix is centred on zero.
pub const LUMA_OFFSET: f64 = 128.0;

/// Valid range of the zero-centred luma matrix.
pub const LUMA_RANGE: (f64, f64) = (-128.0, 127.0);

/// An image split into zero-centred luma and full-range chroma planes.
///
/// Conversion is JFIF BT.601, `Y = 0.299 R + 0.587 G + 0.114 B`. The luma
/// matrix holds `Y - 128`; chroma stays in `0..=255` around 128 and is kept
/// as `f64` so that re-merging does not round it twice.
#[derive(Debug, Clone)]
pub struct YCbCrPlanes {
    pub luma: Matrix,
    pub cb: Vec<f64>,
    pub cr: Vec<f64>,
    width: u32,
    height: u32,
}

impl YCbCrPlanes {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// How the luma matrix was brought back into pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub min: f64,
    pub max: f64,
    /// Factor applied around `min`, `1.0` when the matrix was already in range.
    pub scale: f64,
}

impl Normalization {
    pub fn was_rescaled(&self) -> bool {
        self.scale != 1.0
    }
}

/// Takes a DynamicImage and splits it into luma and chroma
#[allow(non_snake_case)]
pub fn split_luma(image: &DynamicImage) -> Result<YCbCrPlanes, DimensionError> {
    let (width, height) = image.dimensions();
    let rgb = image.to_rgb8();
    let len = (width * height) as usize;

    let mut y_plane = Vec::with_capacity(len);
    let mut cb_plane = Vec::with_capacity(len);
    let mut cr_plane = Vec::with_capacity(len);

    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0.map(f64::from);
        let Y = luma_of([r, g, b]);
        let Cb = -0.168_736 * r - 0.331_264 * g + 0.5 * b + 128.0;
        let Cr = 0.5 * r - 0.418_688 * g - 0.081_312 * b + 128.0;

        y_plane.push(Y - LUMA_OFFSET);
        cb_plane.push(Cb);
        cr_plane.push(Cr);
    }

    Ok(YCbCrPlanes {
        luma: Matrix::from_vec(height as usize, width as usize, y_plane)?,
        cb: cb_plane,
        cr: cr_plane,
        width,
        height,
    })
}

const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

fn luma_of(rgb: [f64; 3]) -> f64 {
    rgb.iter().zip(LUMA_WEIGHTS).map(|(v, w)| v * w).sum()
}

/// Brings a colour down to bytes, keeping its luma as close to `target` as 8 bits allow.
///
/// Each channel goes either down or up; of the eight combinations the one
/// whose luma lies nearest `target` wins, then the one nearest the unrounded
/// colour. Luma edits under half a level survive, which per-channel rounding
/// would erase.
fn quantize(rgb: [f64; 3], target: f64) -> [u8; 3] {
    let low = rgb.map(|v| v.floor().clamp(0.0, 255.0));
    let high = rgb.map(|v| (v.floor() + 1.0).clamp(0.0, 255.0));

    let mut best = low;
    let mut best_error = (f64::INFINITY, f64::INFINITY);
    for mask in 0..8u8 {
        let candidate: [f64; 3] =
            std::array::from_fn(|c| if mask >> c & 1 == 1 { high[c] } else { low[c] });
        let luma_error = (luma_of(candidate) - target).abs();
        let colour_error: f64 = candidate
            .iter()
            .zip(&rgb)
            .map(|(q, v)| (q - v) * (q - v))
            .sum();
        if (luma_error, colour_error) < best_error {
            best = candidate;
            best_error = (luma_error, colour_error);
        }
    }
    best.map(|v| v as u8)
}

/// Recombines a (possibly watermarked) luma matrix with the chroma of `planes`.
///
/// If the matrix left `[-128, 127]` it is rescaled linearly to span exactly
/// that range before the offset is added back. Channels are then clamped to
/// `0..=255` and rounded so that the luma of the 8-bit pixel stays within a
/// fraction of a level of the matrix value.
#[allow(non_snake_case)]
pub fn merge_luma(
    planes: &YCbCrPlanes,
    luma: &Matrix,
) -> Result<(RgbImage, Normalization), DimensionError> {
    let (width, height) = planes.dimensions();
    let expected = (height as usize, width as usize);
    if luma.dimensions() != expected {
        return Err(DimensionError::ShapeMismatch {
            expected,
            actual: luma.dimensions(),
        });
    }

    let (min, max) = luma.min_max().unwrap_or((0.0, 0.0));
    let (low, high) = LUMA_RANGE;
    // a constant matrix has no span to rescale, it is only clamped
    let scale = if (min < low || max > high) && max > min {
        (high - low) / (max - min)
    } else {
        1.0
    };
    let normalization = Normalization { min, max, scale };
    if normalization.was_rescaled() {
        tracing::debug!(min, max, scale, "rescaling luma into pixel range");
    }

    let image = RgbImage::from_fn(width, height, |x, y| {
        let i = (y * width + x) as usize;
        let value = luma.as_slice()[i];
        let centred = if normalization.was_rescaled() {
            (value - min) * scale + low
        } else {
            value
        };

        let Y = centred + LUMA_OFFSET;
        let Cb = planes.cb[i] - 128.0;
        let Cr = planes.cr[i] - 128.0;
        Rgb(quantize(
            [
                Y + 1.402 * Cr,
                Y - 0.344_136 * Cb - 0.714_136 * Cr,
                Y + 1.772 * Cb,
            ],
            Y,
        ))
    });

    Ok((image, normalization))
}
