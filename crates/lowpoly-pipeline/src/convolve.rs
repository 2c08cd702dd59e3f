//! Square-matrix convolution over a single channel.
//!
//! The convolution reads a snapshot of channel 0, applies the weighted
//! kernel, and writes the clamped result back to channel 0 only. The
//! remaining channels keep their previous bytes; downstream consumers
//! read channel 0 exclusively, so the stale G/B/A data is never observed.
//!
//! Kernel taps whose source coordinate falls outside the image are
//! dropped from the sum (not clamped to the edge). This shrinks the
//! effective kernel near the borders, which is an observable property of
//! the edge response and is relied on by the point sampler.

use crate::types::{PipelineError, RgbaImage};

/// Build the smoothing matrix of side `2 * factor + 1`: all ones.
///
/// Intended divisor: the matrix length, turning the pass into a box
/// average over channel 0.
#[must_use]
pub fn blur_matrix(factor: u32) -> Vec<f64> {
    let side = (2 * factor + 1) as usize;
    vec![1.0; side * side]
}

/// Build the edge-extraction matrix of side `2 * factor + 1`: the center
/// weight is the negated matrix length, every other weight is one.
///
/// Intended divisor: `factor`. The pass responds strongly wherever the
/// center pixel diverges from its surroundings.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn edge_matrix(factor: u32) -> Vec<f64> {
    let side = (2 * factor + 1) as usize;
    let length = side * side;
    let mut matrix = vec![1.0; length];
    matrix[length / 2] = -(length as f64);
    matrix
}

/// Convolve channel 0 of `image` with a square `matrix`, scaling every
/// weight by `1 / divisor`, and write the clamped result back to
/// channel 0.
///
/// The accumulator is clamped to `[0, 255]` before the write, so the
/// output channel always holds a valid byte.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] when `divisor` is zero or
/// when the matrix length is not the square of an odd side.
pub fn convolve_channel(
    image: &mut RgbaImage,
    matrix: &[f64],
    divisor: f64,
) -> Result<(), PipelineError> {
    if divisor == 0.0 {
        return Err(PipelineError::InvalidConfig(
            "convolution divisor must be non-zero".to_owned(),
        ));
    }
    let side = kernel_side(matrix.len())?;
    let dim = (side / 2) as i64;

    let width = i64::from(image.width());
    let height = i64::from(image.height());

    let pixels: &mut [u8] = image;

    // Snapshot channel 0 so the pass reads pre-convolution values even
    // after earlier rows have been overwritten.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let snapshot: Vec<f64> = (0..(width * height) as usize)
        .map(|i| f64::from(pixels[i * 4]))
        .collect();

    let scale = 1.0 / divisor;

    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0_f64;
            for row in -dim..=dim {
                let sy = y + row;
                if sy < 0 || sy >= height {
                    continue;
                }
                let kernel_row = ((row + dim) * side) as usize;
                for col in -dim..=dim {
                    let sx = x + col;
                    if sx < 0 || sx >= width {
                        continue;
                    }
                    let weight = matrix[kernel_row + (col + dim) as usize] * scale;
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let src = snapshot[(sy * width + sx) as usize];
                    acc += src * weight;
                }
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let value = (acc as i64).clamp(0, 255) as u8;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = ((y * width + x) * 4) as usize;
            pixels[idx] = value;
        }
    }

    Ok(())
}

/// Validate a kernel length and return its (odd) side.
fn kernel_side(length: usize) -> Result<i64, PipelineError> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let side = (length as f64).sqrt() as usize;
    if side * side != length || side % 2 == 0 {
        return Err(PipelineError::InvalidConfig(format!(
            "convolution matrix length {length} is not the square of an odd side",
        )));
    }
    Ok(side as i64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    fn uniform(w: u32, h: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([value, 77, 88, 99]))
    }

    #[test]
    fn blur_matrix_shape() {
        let m = blur_matrix(1);
        assert_eq!(m.len(), 9);
        assert!(m.iter().all(|&w| (w - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn edge_matrix_shape() {
        let m = edge_matrix(1);
        assert_eq!(m.len(), 9);
        assert!((m[4] - -9.0).abs() < f64::EPSILON);
        let others: f64 = m.iter().enumerate().filter(|&(i, _)| i != 4).map(|(_, w)| w).sum();
        assert!((others - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_divisor_is_rejected() {
        let mut img = uniform(4, 4, 128);
        let err = convolve_channel(&mut img, &blur_matrix(1), 0.0).unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidConfig(ref s) if s.contains("divisor")),
            "expected InvalidConfig about the divisor, got {err:?}",
        );
    }

    #[test]
    fn non_square_matrix_is_rejected() {
        let mut img = uniform(4, 4, 128);
        assert!(convolve_channel(&mut img, &[1.0; 8], 8.0).is_err());
    }

    #[test]
    fn even_side_matrix_is_rejected() {
        let mut img = uniform(4, 4, 128);
        assert!(convolve_channel(&mut img, &[1.0; 16], 16.0).is_err());
    }

    #[test]
    fn identity_kernel_preserves_channel() {
        let img = RgbaImage::from_fn(5, 5, |x, y| Rgba([(x * 40 + y) as u8, 1, 2, 3]));
        let mut out = img.clone();
        let mut identity = vec![0.0; 9];
        identity[4] = 1.0;
        convolve_channel(&mut out, &identity, 1.0).unwrap();
        assert_eq!(img, out);
    }

    #[test]
    fn box_average_on_uniform_interior_is_identity() {
        // Interior pixels see the full 3x3 window; the average of nine
        // equal values divided by nine is the value itself.
        let mut img = uniform(5, 5, 120);
        convolve_channel(&mut img, &blur_matrix(1), 9.0).unwrap();
        assert_eq!(img.get_pixel(2, 2).0[0], 120);
    }

    #[test]
    fn border_taps_are_dropped_not_clamped() {
        // At a corner only four of the nine taps land inside, so a
        // uniform image divided by the full length darkens there:
        // 4 * 90 / 9 = 40.
        let mut img = uniform(5, 5, 90);
        convolve_channel(&mut img, &blur_matrix(1), 9.0).unwrap();
        assert_eq!(img.get_pixel(0, 0).0[0], 40);
    }

    #[test]
    fn only_channel_zero_is_written() {
        let mut img = uniform(5, 5, 200);
        convolve_channel(&mut img, &edge_matrix(1), 1.0).unwrap();
        for px in img.pixels() {
            assert_eq!(&px.0[1..], &[77, 88, 99]);
        }
    }

    #[test]
    fn edge_response_is_zero_on_uniform_interior() {
        // Center weight -9 plus eight ones sums to -1 per unit value;
        // the negative accumulator clamps to zero.
        let mut img = uniform(7, 7, 150);
        convolve_channel(&mut img, &edge_matrix(1), 1.0).unwrap();
        assert_eq!(img.get_pixel(3, 3).0[0], 0);
    }

    #[test]
    fn edge_response_fires_on_contrast() {
        // A lone bright pixel in a dark field: its neighbors each see a
        // strong positive sum from the surround-minus-center shape.
        let mut img = uniform(7, 7, 0);
        img.get_pixel_mut(3, 3).0[0] = 255;
        convolve_channel(&mut img, &edge_matrix(1), 1.0).unwrap();
        assert_eq!(img.get_pixel(2, 3).0[0], 255, "neighbor should saturate");
        assert_eq!(img.get_pixel(3, 3).0[0], 0, "center response is negative");
    }

    #[test]
    fn output_stays_in_byte_range() {
        // Large positive and negative excursions both clamp.
        let img = RgbaImage::from_fn(9, 9, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let mut out = img;
        convolve_channel(&mut out, &edge_matrix(2), 2.0).unwrap();
        // Every byte of channel 0 is a u8 by construction; assert the
        // pass completed and produced plausible extrema.
        let max = out.pixels().map(|p| p.0[0]).max().unwrap();
        assert_eq!(max, 255);
    }
}
