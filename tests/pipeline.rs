//! End-to-end tests through the image-level API.

use std::io::Cursor;

use dwt_watermark::{
    embed_image, embed_image_with, extract_image, extract_image_with, WatermarkConfig,
    WatermarkEngine, WatermarkError,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn gray(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
}

/// Random colours kept away from 0 and 255 so embedding never clips.
fn noise(width: u32, height: u32, seed: u64) -> DynamicImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        Rgb([
            rng.gen_range(48..208),
            rng.gen_range(48..208),
            rng.gen_range(48..208),
        ])
    }))
}

fn png_round_trip(image: &RgbImage) -> DynamicImage {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    image::load_from_memory(bytes.get_ref()).unwrap()
}

#[test]
fn gray_image_round_trip() {
    let marked = embed_image(&gray(256, 256), "Hello World").unwrap();
    assert_eq!(marked.dimensions(), (256, 256));

    let consensus = extract_image(&DynamicImage::ImageRgb8(marked)).unwrap();
    assert_eq!(consensus.message, "Hello World");
    assert_eq!(consensus.tiles, 1);
}

#[test]
fn noisy_image_survives_png() {
    let marked = embed_image(&noise(512, 256, 11), "stored as png").unwrap();
    let reloaded = png_round_trip(&marked);

    let consensus = extract_image(&reloaded).unwrap();
    assert_eq!(consensus.message, "stored as png");
    assert_eq!(consensus.tiles, 2);
    assert!(consensus.is_unanimous());
}

#[test]
fn non_ascii_message() {
    let marked = embed_image(&noise(256, 256, 12), "héllo wörld").unwrap();
    let consensus = extract_image(&DynamicImage::ImageRgb8(marked)).unwrap();
    assert_eq!(consensus.message, "héllo wörld");
}

#[test]
fn custom_delta_must_match() {
    let engine = WatermarkEngine::with_config(WatermarkConfig { delta: 16.0 });
    let marked = embed_image_with(&engine, &noise(256, 256, 13), "stronger").unwrap();
    let marked = DynamicImage::ImageRgb8(marked);

    assert_eq!(extract_image_with(&engine, &marked).unwrap().message, "stronger");
    let default = extract_image(&marked);
    assert!(default.map_or(true, |c| c.message != "stronger"));
}

#[test]
fn unmarked_image_reports_not_found() {
    let err = extract_image(&gray(256, 256)).unwrap_err();
    assert!(matches!(err, WatermarkError::NotFound { tiles: 1 }));
}

#[test]
fn odd_sized_image_is_rejected() {
    let err = embed_image(&gray(255, 256), "x").unwrap_err();
    assert!(matches!(err, WatermarkError::Dimension(_)));
}
