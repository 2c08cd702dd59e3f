//! lowpoly-pipeline: Pure image triangulation pipeline (sans-IO).
//!
//! Converts raster images into low-polygon renditions through:
//! stack blur -> grayscale -> convolution-based edge extraction ->
//! vertex sampling -> Delaunay triangulation -> centroid shading.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers and returns structured data. Decoding files, writing
//! output, and the CLI live in the sibling crates.
//!
//! # Output modes
//!
//! - [`process`] renders the mesh onto a raster canvas (with optional
//!   grain).
//! - [`process_primitives`] emits one colored [`TrianglePrimitive`] per
//!   triangle for SVG serialization.
//! - [`process_staged`] keeps every intermediate image alongside the
//!   final result; [`process_staged_with_diagnostics`] adds per-stage
//!   timing and counts.
//!
//! # Determinism
//!
//! Vertex sampling draws from a seedable generator: set
//! [`PipelineConfig::seed`] and two runs over the same input produce
//! identical output. The grain pass is always deterministic (fixed-seed
//! Lehmer generator).

pub mod blur;
pub mod convolve;
pub mod delaunay;
pub mod diagnostics;
pub mod grain;
pub mod grayscale;
pub mod pipeline;
pub mod sample;
pub mod shade;
pub mod types;

pub use delaunay::{Circumcircle, Triangle, Triangulation};
pub use diagnostics::{PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics};
pub use pipeline::{process, process_primitives, process_staged, process_staged_with_diagnostics};
pub use types::{
    Dimensions, PipelineConfig, PipelineError, Point, PrimitiveResult, ProcessResult, Rgba,
    RgbaImage, StagedResult, TrianglePrimitive, Wireframe,
};
