//! Film-grain noise for the raster output.
//!
//! Uses a 31-bit Lehmer linear congruential generator
//! (`state <- 16807 * state mod (2^31 - 1)`, seed 1), kept for bit
//! compatibility with the generator this filter was ported from. The
//! generator lives behind its own type so the pipeline could swap it
//! without touching call sites.

use crate::types::RgbaImage;

const MULTIPLIER: u64 = 16807;
const MODULUS: u64 = 0x7fff_ffff;

/// Minimal Lehmer LCG with a fixed seed of 1.
///
/// The full period is `2^31 - 2`; every run of the grain filter draws
/// the same sequence, so grained output is deterministic.
#[derive(Debug, Clone)]
pub struct GrainRng {
    state: u64,
}

impl GrainRng {
    /// Create a generator at the canonical seed.
    #[must_use]
    pub const fn new() -> Self {
        Self { state: 1 }
    }

    /// Next value in `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_unit(&mut self) -> f64 {
        self.state = (self.state * MULTIPLIER) % MODULUS;
        self.state as f64 / MODULUS as f64
    }
}

impl Default for GrainRng {
    fn default() -> Self {
        Self::new()
    }
}

/// Add grain of the given intensity to the RGB channels in place.
///
/// For each pixel a single noise value `(u - 0.01) * amount` is drawn
/// and added to R, G, and B together - but only when all three shifted
/// channels stay below the byte ceiling; otherwise the pixel keeps its
/// original color. Channels are clamped to `[0, 255]` and alpha is
/// preserved. Pixels are visited column-major, matching the generator's
/// canonical draw order.
///
/// No channel moves by more than `amount`.
pub fn add_grain(image: &mut RgbaImage, amount: u32) {
    if amount == 0 {
        return;
    }
    let (width, height) = image.dimensions();
    let mut rng = GrainRng::new();

    for x in 0..width {
        for y in 0..height {
            let noise = (rng.next_unit() - 0.01) * f64::from(amount);
            let px = image.get_pixel_mut(x, y);
            let [r, g, b, a] = px.0;
            let mut rf = f64::from(r);
            let mut gf = f64::from(g);
            let mut bf = f64::from(b);

            if (rf + noise).abs() < 255.0 && (gf + noise).abs() < 255.0 && (bf + noise).abs() < 255.0
            {
                rf += noise;
                gf += noise;
                bf += noise;
            }
            px.0 = [clamp_channel(rf), clamp_channel(gf), clamp_channel(bf), a];
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}
