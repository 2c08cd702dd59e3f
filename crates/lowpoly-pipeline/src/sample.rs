//! Vertex sampling from the edge-filtered image.
//!
//! Every pixel whose 3x3 neighborhood mean of channel 0 exceeds the
//! threshold becomes a candidate; a bounded random subset of the
//! candidates (drawn with replacement, duplicates permitted) feeds the
//! triangulator. The generator is injected so callers control seeding.

use rand::Rng;

use crate::types::{Point, RgbaImage};

/// Collect every pixel whose 3x3 neighborhood mean of channel 0 exceeds
/// `threshold`.
///
/// Neighbors outside the image are dropped from the mean (the divisor
/// shrinks at the borders), matching the convolution's boundary policy.
/// Candidates are produced in row-major order.
#[must_use]
pub fn candidate_points(image: &RgbaImage, threshold: u8) -> Vec<Point> {
    let width = i64::from(image.width());
    let height = i64::from(image.height());
    let pixels: &[u8] = image;
    let threshold = i64::from(threshold);

    let mut candidates = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0_i64;
            let mut total = 0_i64;
            for row in -1..=1_i64 {
                let sy = y + row;
                if sy < 0 || sy >= height {
                    continue;
                }
                for col in -1..=1_i64 {
                    let sx = x + col;
                    if sx < 0 || sx >= width {
                        continue;
                    }
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let idx = ((sy * width + sx) * 4) as usize;
                    sum += i64::from(pixels[idx]);
                    total += 1;
                }
            }
            if total > 0 {
                sum /= total;
            }
            if sum > threshold {
                #[allow(clippy::cast_possible_truncation)]
                candidates.push(Point::new(x as i32, y as i32));
            }
        }
    }
    candidates
}

/// Draw up to `min(floor(len * point_rate), max_points)` points from the
/// candidate list, uniformly with replacement.
///
/// Duplicates are forwarded unchanged; the triangulator tolerates them.
#[must_use]
pub fn draw_points<R: Rng>(
    candidates: &[Point],
    max_points: usize,
    point_rate: f64,
    rng: &mut R,
) -> Vec<Point> {
    if candidates.is_empty() {
        return Vec::new();
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let limit = ((candidates.len() as f64 * point_rate) as usize).min(max_points);

    let mut drawn = Vec::with_capacity(limit);
    for _ in 0..limit {
        let j = rng.gen_range(0..candidates.len());
        drawn.push(candidates[j]);
    }
    drawn
}

/// Threshold and draw in one step.
#[must_use]
pub fn sample_points<R: Rng>(
    image: &RgbaImage,
    threshold: u8,
    max_points: usize,
    point_rate: f64,
    rng: &mut R,
) -> Vec<Point> {
    let candidates = candidate_points(image, threshold);
    draw_points(&candidates, max_points, point_rate, rng)
}
