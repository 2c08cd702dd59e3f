//! Grayscale conversion.
//!
//! Writes the luma value into all three color channels so downstream
//! single-channel stages can read channel 0 regardless of whether they
//! run on a color or grayscaled buffer. Alpha is preserved.

use crate::types::RgbaImage;

/// Convert an image to grayscale using the standard luminance weights
/// `0.299 R + 0.587 G + 0.114 B`, rounded to the nearest integer.
///
/// The result packs `(luma, luma, luma, A)` per pixel. Applying the
/// conversion twice is a no-op: the weights sum to 1, so the luma of a
/// gray pixel is itself.
#[must_use = "returns the grayscaled image"]
pub fn grayscale(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let [r, g, b, a] = px.0;
        let luma = f32::from(r).mul_add(0.299, f32::from(g).mul_add(0.587, f32::from(b) * 0.114));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let luma = luma.round() as u8;
        px.0 = [luma, luma, luma, a];
    }
    out
}
