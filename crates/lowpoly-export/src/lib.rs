//! lowpoly-export: output serializers for the triangulation pipeline.
//!
//! Currently SVG only. Serializers are pure functions from pipeline
//! data to strings; writing files is the caller's concern.

mod svg;

pub use svg::{to_svg, SvgMetadata, SvgOptions};
