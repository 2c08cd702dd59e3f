//! Stack blur: a linear-time approximation of a Gaussian blur.
//!
//! The blur maintains a sliding "stack" of pixels per row (then per
//! column) whose triangular weighting is updated with two running sums,
//! so each output pixel costs O(1) per channel regardless of the radius.
//! Window taps past the image edge are clamped to the nearest border
//! pixel. All four channels are blurred, alpha included.
//!
//! Normalization divides by the exact stack weight `(radius + 1)^2`
//! (the sum of the triangular weights `1, 2, .., r+1, .., 2, 1`), so no
//! fixed-point multiplier tables are needed.

use crate::types::RgbaImage;

/// Upper bound on the blur radius; wider stacks gain nothing visually
/// and the classic formulation caps here.
const MAX_RADIUS: u32 = 254;

/// Apply a stack blur with the given radius.
///
/// A radius of zero returns the image unchanged, byte for byte. The
/// radius is clamped to half the shorter image dimension (and to
/// [`MAX_RADIUS`]); when the clamp reduces it to zero the image is
/// likewise returned unchanged.
///
/// Runs in O(width * height) independent of the radius.
#[must_use = "returns the blurred image"]
pub fn stack_blur(image: &RgbaImage, radius: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let radius = radius.min(width.min(height) / 2).min(MAX_RADIUS);
    if radius == 0 || width == 0 || height == 0 {
        return image.clone();
    }

    let mut out = image.clone();
    horizontal_pass(&mut out, width as usize, height as usize, radius as usize);
    vertical_pass(&mut out, width as usize, height as usize, radius as usize);
    out
}

#[inline]
fn read_px(pixels: &[u8], idx: usize) -> [i64; 4] {
    [
        i64::from(pixels[idx]),
        i64::from(pixels[idx + 1]),
        i64::from(pixels[idx + 2]),
        i64::from(pixels[idx + 3]),
    ]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn horizontal_pass(image: &mut RgbaImage, width: usize, height: usize, radius: usize) {
    let div = 2 * radius + 1;
    // Weight of the leading edge pixel at window start: r+1 stack slots
    // plus the triangular tail it fills, (r+1)(r+2)/2 in total.
    let sum_factor = ((radius + 1) * (radius + 2) / 2) as i64;
    let weight = ((radius + 1) * (radius + 1)) as i64;
    let wm = width - 1;

    let pixels: &mut [u8] = image;
    let mut stack = vec![[0_i64; 4]; div];

    for y in 0..height {
        let row = y * width * 4;
        let mut in_sum = [0_i64; 4];
        let mut out_sum = [0_i64; 4];
        let mut sum = [0_i64; 4];

        // Prime the stack: the window starts clamped to the row's first
        // pixel, then takes the next `radius` pixels with decreasing
        // triangular weight.
        let first = read_px(pixels, row);
        for c in 0..4 {
            out_sum[c] = (radius as i64 + 1) * first[c];
            sum[c] = sum_factor * first[c];
        }
        for slot in stack.iter_mut().take(radius + 1) {
            *slot = first;
        }
        for i in 1..=radius {
            let p = read_px(pixels, row + wm.min(i) * 4);
            let rbs = (radius + 1 - i) as i64;
            for c in 0..4 {
                sum[c] += p[c] * rbs;
                in_sum[c] += p[c];
            }
            stack[radius + i] = p;
        }

        let mut stack_in = 0_usize;
        let mut stack_out = radius + 1;
        for x in 0..width {
            let idx = row + x * 4;
            for c in 0..4 {
                pixels[idx + c] = (sum[c] / weight) as u8;
            }

            for c in 0..4 {
                sum[c] -= out_sum[c];
                out_sum[c] -= stack[stack_in][c];
            }
            let p = read_px(pixels, row + wm.min(x + radius + 1) * 4);
            stack[stack_in] = p;
            for c in 0..4 {
                in_sum[c] += p[c];
                sum[c] += in_sum[c];
            }
            stack_in = (stack_in + 1) % div;

            let mid = stack[stack_out];
            for c in 0..4 {
                out_sum[c] += mid[c];
                in_sum[c] -= mid[c];
            }
            stack_out = (stack_out + 1) % div;
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn vertical_pass(image: &mut RgbaImage, width: usize, height: usize, radius: usize) {
    let div = 2 * radius + 1;
    let sum_factor = ((radius + 1) * (radius + 2) / 2) as i64;
    let weight = ((radius + 1) * (radius + 1)) as i64;
    let hm = height - 1;

    let pixels: &mut [u8] = image;
    let mut stack = vec![[0_i64; 4]; div];

    for x in 0..width {
        let col = x * 4;
        let mut in_sum = [0_i64; 4];
        let mut out_sum = [0_i64; 4];
        let mut sum = [0_i64; 4];

        let first = read_px(pixels, col);
        for c in 0..4 {
            out_sum[c] = (radius as i64 + 1) * first[c];
            sum[c] = sum_factor * first[c];
        }
        for slot in stack.iter_mut().take(radius + 1) {
            *slot = first;
        }
        for i in 1..=radius {
            let p = read_px(pixels, col + hm.min(i) * width * 4);
            let rbs = (radius + 1 - i) as i64;
            for c in 0..4 {
                sum[c] += p[c] * rbs;
                in_sum[c] += p[c];
            }
            stack[radius + i] = p;
        }

        let mut stack_in = 0_usize;
        let mut stack_out = radius + 1;
        for y in 0..height {
            let idx = col + y * width * 4;
            for c in 0..4 {
                pixels[idx + c] = (sum[c] / weight) as u8;
            }

            for c in 0..4 {
                sum[c] -= out_sum[c];
                out_sum[c] -= stack[stack_in][c];
            }
            let p = read_px(pixels, col + hm.min(y + radius + 1) * width * 4);
            stack[stack_in] = p;
            for c in 0..4 {
                in_sum[c] += p[c];
                sum[c] += in_sum[c];
            }
            stack_in = (stack_in + 1) % div;

            let mid = stack[stack_out];
            for c in 0..4 {
                out_sum[c] += mid[c];
                in_sum[c] -= mid[c];
            }
            stack_out = (stack_out + 1) % div;
        }
    }
}
