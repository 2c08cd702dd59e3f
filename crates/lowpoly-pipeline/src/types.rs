//! Shared types for the lowpoly image triangulation pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference raster data
/// without depending on `image` directly.
pub use image::RgbaImage;

/// An RGBA color with straight (non-premultiplied) alpha.
pub type Rgba = image::Rgba<u8>;

/// A point on the integer pixel lattice.
///
/// Serves double duty: sampled candidate locations and mesh vertices.
/// Equality and hashing use exact integer comparison, so a point can key
/// hash-based edge deduplication during triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from the left edge).
    pub x: i32,
    /// Vertical position (pixels from the top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count as a widened integer.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Visual treatment of the generated triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Wireframe {
    /// Filled triangles, no stroke.
    #[default]
    None,
    /// Filled triangles with a faint black stroke.
    Both,
    /// Stroked outlines only, no fill.
    StrokeOnly,
}

impl fmt::Display for Wireframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Both => f.write_str("Both"),
            Self::StrokeOnly => f.write_str("StrokeOnly"),
        }
    }
}

/// A single colored triangle emitted for vector output.
///
/// `p3` always repeats `p0` so serializers can write the closing segment
/// of the path without special-casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrianglePrimitive {
    /// First vertex.
    pub p0: Point,
    /// Second vertex.
    pub p1: Point,
    /// Third vertex.
    pub p2: Point,
    /// Closing vertex, equal to `p0`.
    pub p3: Point,
    /// Fill color.
    pub fill: Rgba,
    /// Stroke color.
    pub stroke: Rgba,
}

/// Configuration for the triangulation pipeline.
///
/// All parameters have documented defaults. Fields are public; call
/// [`validate`](Self::validate) before processing to surface invalid
/// combinations as [`PipelineError::InvalidConfig`] instead of panics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stack blur radius applied before edge extraction. Zero disables
    /// the blur pass.
    pub blur_radius: u32,

    /// Half-width of the pre-edge smoothing convolution matrix; the
    /// matrix side is `2 * blur_factor + 1`.
    pub blur_factor: u32,

    /// Half-width of the edge-extraction convolution matrix; the matrix
    /// side is `2 * edge_factor + 1`. Also the divisor of the edge pass,
    /// so it must be at least 1. Larger values produce a blockier result.
    pub edge_factor: u32,

    /// Threshold on the 3x3 neighborhood mean of the edge-filtered
    /// channel above which a pixel becomes a candidate vertex.
    pub points_threshold: u8,

    /// Fraction of candidate points retained, in `(0, 1]`. Lower values
    /// produce larger triangles.
    pub point_rate: f64,

    /// Hard cap on the number of sampled vertices. Zero short-circuits
    /// the pipeline after the blur stage.
    pub max_points: usize,

    /// Stroke/fill treatment of the output triangles.
    pub wireframe: Wireframe,

    /// Grain intensity added to the raster output. Zero disables the
    /// grain pass.
    pub noise: u32,

    /// Stroke width in pixels for [`Wireframe::Both`] and
    /// [`Wireframe::StrokeOnly`].
    pub stroke_width: f64,

    /// When `true`, strokes are solid black instead of the sampled
    /// triangle color.
    pub is_stroke_solid: bool,

    /// When `true`, triangle colors are sampled from the grayscaled
    /// image instead of the original.
    pub grayscale: bool,

    /// Background color as a 3/6/8-digit hex string (leading `#`
    /// optional). Used where the sampled source pixel is fully
    /// transparent. `None` leaves the canvas transparent.
    pub bg_color: Option<String>,

    /// Seed for the vertex sampler. `None` seeds from entropy; two runs
    /// with the same seed and input produce identical output.
    pub seed: Option<u64>,
}

impl PipelineConfig {
    /// Default stack blur radius.
    pub const DEFAULT_BLUR_RADIUS: u32 = 4;
    /// Default smoothing matrix half-width.
    pub const DEFAULT_BLUR_FACTOR: u32 = 1;
    /// Default edge matrix half-width.
    pub const DEFAULT_EDGE_FACTOR: u32 = 6;
    /// Default candidate threshold.
    pub const DEFAULT_POINTS_THRESHOLD: u8 = 20;
    /// Default candidate retention rate.
    pub const DEFAULT_POINT_RATE: f64 = 0.075;
    /// Default vertex cap.
    pub const DEFAULT_MAX_POINTS: usize = 2500;
    /// Default stroke width in pixels.
    pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

    /// Validate that all fields satisfy the documented invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// violated constraint:
    ///
    /// - `edge_factor >= 1` (it divides the edge convolution)
    /// - `point_rate` in `(0, 1]`
    /// - `stroke_width >= 0`
    /// - `bg_color`, when present, parses as 3/6/8-digit hex
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.edge_factor == 0 {
            return Err(PipelineError::InvalidConfig(
                "edge_factor must be at least 1".to_owned(),
            ));
        }
        if !(self.point_rate > 0.0 && self.point_rate <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "point_rate must be in (0, 1], got {}",
                self.point_rate,
            )));
        }
        if self.stroke_width < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "stroke_width must be non-negative, got {}",
                self.stroke_width,
            )));
        }
        if let Some(ref hex) = self.bg_color {
            parse_hex_color(hex)?;
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
            blur_factor: Self::DEFAULT_BLUR_FACTOR,
            edge_factor: Self::DEFAULT_EDGE_FACTOR,
            points_threshold: Self::DEFAULT_POINTS_THRESHOLD,
            point_rate: Self::DEFAULT_POINT_RATE,
            max_points: Self::DEFAULT_MAX_POINTS,
            wireframe: Wireframe::default(),
            noise: 0,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            is_stroke_solid: false,
            grayscale: false,
            bg_color: None,
            seed: None,
        }
    }
}

/// Parse a `#rgb`, `#rrggbb`, or `#rrggbbaa` hex color (leading `#`
/// optional) into a straight-alpha RGBA value.
///
/// Three-digit values expand each nibble (`#fa0` -> `#ffaa00`).
/// Alpha defaults to 255 when not given.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for any other length or for
/// non-hex digits.
pub fn parse_hex_color(input: &str) -> Result<Rgba, PipelineError> {
    let hex = input.strip_prefix('#').unwrap_or(input);

    let invalid = || PipelineError::InvalidConfig(format!("malformed hex color {input:?}"));

    let nibble = |c: u8| -> Result<u8, PipelineError> {
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            _ => Err(invalid()),
        }
    };
    let byte = |pair: &[u8]| -> Result<u8, PipelineError> {
        Ok(nibble(pair[0])? << 4 | nibble(pair[1])?)
    };

    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => {
            let r = nibble(bytes[0])?;
            let g = nibble(bytes[1])?;
            let b = nibble(bytes[2])?;
            Ok(image::Rgba([r << 4 | r, g << 4 | g, b << 4 | b, 255]))
        }
        6 => Ok(image::Rgba([
            byte(&bytes[0..2])?,
            byte(&bytes[2..4])?,
            byte(&bytes[4..6])?,
            255,
        ])),
        8 => Ok(image::Rgba([
            byte(&bytes[0..2])?,
            byte(&bytes[2..4])?,
            byte(&bytes[4..6])?,
            byte(&bytes[6..8])?,
        ])),
        _ => Err(invalid()),
    }
}

/// Result of running the pipeline to a raster output.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// The shaded (and optionally grained) triangulated raster.
    pub image: RgbaImage,
    /// The final triangle mesh, super-rectangle corners included.
    pub triangles: Vec<crate::delaunay::Triangle>,
    /// The sampled vertices, in insertion order.
    pub points: Vec<Point>,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Result of running the pipeline to a vector output.
#[derive(Debug, Clone)]
pub struct PrimitiveResult {
    /// One colored primitive per emitted triangle.
    pub primitives: Vec<TrianglePrimitive>,
    /// The final triangle mesh, super-rectangle corners included.
    pub triangles: Vec<crate::delaunay::Triangle>,
    /// The sampled vertices, in insertion order.
    pub points: Vec<Point>,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Result of running the pipeline with all intermediate stage outputs
/// preserved.
///
/// Each field captures the output of one logical pipeline stage, enabling
/// inspection of every step of the processing chain.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 0: the untouched source image.
    pub original: RgbaImage,
    /// Stage 1: stack-blurred image.
    pub blurred: RgbaImage,
    /// Stage 2: grayscaled copy of the blurred image.
    pub grayscaled: RgbaImage,
    /// Stages 3+4: working buffer after both convolution passes.
    /// Channel 0 holds the edge response; the remaining channels carry
    /// the blurred values untouched by the convolutions.
    pub edges: RgbaImage,
    /// Stage 5: sampled vertices, in insertion order.
    pub points: Vec<Point>,
    /// Stage 6: the triangle mesh.
    pub triangles: Vec<crate::delaunay::Triangle>,
    /// Stages 7+8: shaded raster output, grain applied when configured.
    pub shaded: RgbaImage,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image cannot be processed (e.g. degenerate dimensions).
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A geometric computation degenerated (zero-area seed geometry).
    #[error("degenerate geometry: {0}")]
    Math(String),

    /// The pixel buffer would exceed the addressable range.
    #[error("image too large: {width}x{height} exceeds the addressable pixel range")]
    BufferOverflow {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_new() {
        let p = Point::new(3, 4);
        assert_eq!(p.x, 3);
        assert_eq!(p.y, 4);
    }

    #[test]
    fn point_equality_is_exact() {
        assert_eq!(Point::new(1, 2), Point::new(1, 2));
        assert_ne!(Point::new(1, 2), Point::new(1, 3));
    }

    #[test]
    fn point_distance_squared() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_eq!(a.distance_squared(b), 25);
    }

    #[test]
    fn point_display() {
        assert_eq!(Point::new(7, -2).to_string(), "(7, -2)");
    }

    // --- Dimensions tests ---

    #[test]
    fn dimensions_pixel_count_widens() {
        let d = Dimensions {
            width: 100_000,
            height: 100_000,
        };
        assert_eq!(d.pixel_count(), 10_000_000_000);
    }

    // --- PipelineConfig tests ---

    #[test]
    fn config_defaults_match_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.blur_radius, 4);
        assert_eq!(config.blur_factor, 1);
        assert_eq!(config.edge_factor, 6);
        assert_eq!(config.points_threshold, 20);
        assert!((config.point_rate - 0.075).abs() < f64::EPSILON);
        assert_eq!(config.max_points, 2500);
        assert_eq!(config.wireframe, Wireframe::None);
        assert_eq!(config.noise, 0);
        assert!((config.stroke_width - 1.0).abs() < f64::EPSILON);
        assert!(!config.is_stroke_solid);
        assert!(!config.grayscale);
        assert!(config.bg_color.is_none());
        assert!(config.seed.is_none());
    }

    #[test]
    fn validate_default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_edge_factor() {
        let config = PipelineConfig {
            edge_factor: 0,
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidConfig(ref s) if s.contains("edge_factor")),
            "expected InvalidConfig about edge_factor, got {err:?}",
        );
    }

    #[test]
    fn validate_rejects_zero_point_rate() {
        let config = PipelineConfig {
            point_rate: 0.0,
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidConfig(ref s) if s.contains("point_rate")),
            "expected InvalidConfig about point_rate, got {err:?}",
        );
    }

    #[test]
    fn validate_rejects_point_rate_above_one() {
        let config = PipelineConfig {
            point_rate: 1.01,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_point_rate_of_one() {
        let config = PipelineConfig {
            point_rate: 1.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_stroke_width() {
        let config = PipelineConfig {
            stroke_width: -0.5,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_bg_color() {
        let config = PipelineConfig {
            bg_color: Some("#12345".to_owned()),
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidConfig(ref s) if s.contains("hex")),
            "expected InvalidConfig about hex color, got {err:?}",
        );
    }

    // --- Hex color parsing tests ---

    #[test]
    fn hex_color_six_digits() {
        assert_eq!(
            parse_hex_color("#1a2b3c").unwrap(),
            image::Rgba([0x1a, 0x2b, 0x3c, 255]),
        );
    }

    #[test]
    fn hex_color_three_digits_expand() {
        assert_eq!(
            parse_hex_color("#fa0").unwrap(),
            image::Rgba([0xff, 0xaa, 0x00, 255]),
        );
    }

    #[test]
    fn hex_color_eight_digits_carry_alpha() {
        assert_eq!(
            parse_hex_color("#11223380").unwrap(),
            image::Rgba([0x11, 0x22, 0x33, 0x80]),
        );
    }

    #[test]
    fn hex_color_without_hash() {
        assert_eq!(
            parse_hex_color("ffffff").unwrap(),
            image::Rgba([255, 255, 255, 255]),
        );
    }

    #[test]
    fn hex_color_uppercase() {
        assert_eq!(
            parse_hex_color("#AABBCC").unwrap(),
            image::Rgba([0xaa, 0xbb, 0xcc, 255]),
        );
    }

    #[test]
    fn hex_color_rejects_bad_lengths_and_digits() {
        for bad in ["", "#", "#ff", "#fffff", "#ggg", "#12345g", "white"] {
            assert!(parse_hex_color(bad).is_err(), "expected error for {bad:?}");
        }
    }

    // --- Serde round-trip tests ---

    #[test]
    fn point_serde_round_trip() {
        let p = Point::new(12, -7);
        let json = serde_json::to_string(&p).unwrap();
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = PipelineConfig {
            blur_radius: 2,
            blur_factor: 2,
            edge_factor: 3,
            points_threshold: 10,
            point_rate: 0.5,
            max_points: 100,
            wireframe: Wireframe::StrokeOnly,
            noise: 12,
            stroke_width: 1.5,
            is_stroke_solid: true,
            grayscale: true,
            bg_color: Some("#ffffff".to_owned()),
            seed: Some(42),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    // --- PipelineError tests ---

    #[test]
    fn error_display_messages() {
        assert_eq!(
            PipelineError::InvalidInput("too small".to_owned()).to_string(),
            "invalid input image: too small",
        );
        assert_eq!(
            PipelineError::BufferOverflow {
                width: 70_000,
                height: 70_000,
            }
            .to_string(),
            "image too large: 70000x70000 exceeds the addressable pixel range",
        );
    }
}
