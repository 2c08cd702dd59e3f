//! Triangle shading: centroid-sampled fills and strokes.
//!
//! Each triangle takes its color from the shading source at the
//! triangle's centroid (floored to the pixel lattice, clamped at the
//! extreme rectangle corners). Raster output renders through a 2D path
//! rasterizer; vector output emits one [`TrianglePrimitive`] per
//! triangle for the SVG serializer.

use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::delaunay::Triangle;
use crate::types::{
    parse_hex_color, PipelineConfig, PipelineError, Rgba, RgbaImage, TrianglePrimitive, Wireframe,
};

/// Alpha of the faint black outline drawn by [`Wireframe::Both`].
const WIREFRAME_STROKE_ALPHA: u8 = 20;

const BLACK: Rgba = image::Rgba([0, 0, 0, 255]);
const WHITE: Rgba = image::Rgba([255, 255, 255, 255]);

/// The pixel coordinate a triangle samples its color from: the centroid
/// floored to the lattice and clamped into the image.
///
/// Clamping only engages for centroids on the far rectangle boundary
/// (x = width or y = height), which floor outside the pixel grid.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn centroid_pixel(triangle: &Triangle, width: u32, height: u32) -> (u32, u32) {
    let [p0, p1, p2] = triangle.nodes;
    let cx = f64::from(p0.x + p1.x + p2.x) / 3.0;
    let cy = f64::from(p0.y + p1.y + p2.y) / 3.0;
    let x = (cx.floor() as i64).clamp(0, i64::from(width) - 1) as u32;
    let y = (cy.floor() as i64).clamp(0, i64::from(height) - 1) as u32;
    (x, y)
}

#[allow(clippy::cast_precision_loss)]
fn triangle_path(triangle: &Triangle) -> Option<tiny_skia::Path> {
    let [p0, p1, p2] = triangle.nodes;
    let mut pb = PathBuilder::new();
    pb.move_to(p0.x as f32, p0.y as f32);
    pb.line_to(p1.x as f32, p1.y as f32);
    pb.line_to(p2.x as f32, p2.y as f32);
    pb.close();
    pb.finish()
}

fn to_color(rgba: Rgba) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(rgba.0[0], rgba.0[1], rgba.0[2], rgba.0[3])
}

/// Render the mesh onto a raster canvas, sampling triangle colors from
/// `source` (the original or grayscaled image per the configuration).
///
/// A triangle whose sampled pixel is fully transparent is filled with
/// the configured background color, or skipped entirely when no
/// background is set, leaving the transparent canvas visible.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an unparseable
/// background color and [`PipelineError::InvalidInput`] when the canvas
/// cannot be allocated.
pub fn rasterize(
    source: &RgbaImage,
    triangles: &[Triangle],
    config: &PipelineConfig,
) -> Result<RgbaImage, PipelineError> {
    let (width, height) = source.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        PipelineError::InvalidInput(format!("cannot allocate a {width}x{height} canvas"))
    })?;

    let bg = config.bg_color.as_deref().map(parse_hex_color).transpose()?;
    if let Some(bg) = bg {
        pixmap.fill(to_color(bg));
    }

    #[allow(clippy::cast_possible_truncation)]
    let stroke = Stroke {
        width: config.stroke_width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    let mut fill_paint = Paint::default();
    fill_paint.anti_alias = false;
    let mut stroke_paint = Paint::default();
    stroke_paint.anti_alias = true;

    for triangle in triangles {
        let Some(path) = triangle_path(triangle) else {
            continue;
        };

        let (sx, sy) = centroid_pixel(triangle, width, height);
        let sampled = *source.get_pixel(sx, sy);
        let opaque = image::Rgba([sampled.0[0], sampled.0[1], sampled.0[2], 255]);

        let fill = if sampled.0[3] == 0 { bg } else { Some(opaque) };

        match config.wireframe {
            Wireframe::None => {
                let Some(fill) = fill else { continue };
                fill_paint.set_color(to_color(fill));
                pixmap.fill_path(&path, &fill_paint, FillRule::Winding, Transform::identity(), None);
            }
            Wireframe::Both => {
                let Some(fill) = fill else { continue };
                fill_paint.set_color(to_color(fill));
                pixmap.fill_path(&path, &fill_paint, FillRule::Winding, Transform::identity(), None);
                stroke_paint.set_color_rgba8(0, 0, 0, WIREFRAME_STROKE_ALPHA);
                pixmap.stroke_path(&path, &stroke_paint, &stroke, Transform::identity(), None);
            }
            Wireframe::StrokeOnly => {
                let color = if config.is_stroke_solid {
                    BLACK
                } else if sampled.0[3] == 0 {
                    let Some(bg) = bg else { continue };
                    bg
                } else {
                    opaque
                };
                stroke_paint.set_color(to_color(color));
                pixmap.stroke_path(&path, &stroke_paint, &stroke, Transform::identity(), None);
            }
        }
    }

    Ok(pixmap_to_rgba(&pixmap))
}

/// Convert a premultiplied pixmap back to a straight-alpha image.
#[allow(clippy::cast_possible_truncation)]
fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let data = pixmap.data();
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (i, pixel) in out.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        if a == 0 {
            *pixel = image::Rgba([0, 0, 0, 0]);
        } else {
            let r = u16::from(data[off]) * 255 / u16::from(a);
            let g = u16::from(data[off + 1]) * 255 / u16::from(a);
            let b = u16::from(data[off + 2]) * 255 / u16::from(a);
            *pixel = image::Rgba([r as u8, g as u8, b as u8, a]);
        }
    }
    out
}

/// Emit one colored primitive per triangle for vector output.
///
/// Fill color follows the raster rules, except that a transparent
/// sample with no configured background falls back to opaque white (the
/// vector canvas is white) and [`Wireframe::StrokeOnly`] always fills
/// white. The stroke color is solid black when `is_stroke_solid` is
/// set, otherwise the sampled color.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an unparseable
/// background color.
pub fn emit_primitives(
    source: &RgbaImage,
    triangles: &[Triangle],
    config: &PipelineConfig,
) -> Result<Vec<TrianglePrimitive>, PipelineError> {
    let (width, height) = source.dimensions();
    let bg = config.bg_color.as_deref().map(parse_hex_color).transpose()?;

    let mut primitives = Vec::with_capacity(triangles.len());
    for triangle in triangles {
        let (sx, sy) = centroid_pixel(triangle, width, height);
        let sampled = *source.get_pixel(sx, sy);
        let opaque = image::Rgba([sampled.0[0], sampled.0[1], sampled.0[2], 255]);

        let fill = match config.wireframe {
            Wireframe::StrokeOnly => WHITE,
            Wireframe::None | Wireframe::Both => {
                if sampled.0[3] == 0 {
                    bg.unwrap_or(WHITE)
                } else {
                    opaque
                }
            }
        };
        let stroke = if config.is_stroke_solid { BLACK } else { opaque };

        let [p0, p1, p2] = triangle.nodes;
        primitives.push(TrianglePrimitive {
            p0,
            p1,
            p2,
            p3: p0,
            fill,
            stroke,
        });
    }
    Ok(primitives)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::delaunay::Triangulation;
    use crate::types::{Dimensions, Point};
    use image::Rgba;

    fn seed_mesh(w: u32, h: u32) -> Vec<Triangle> {
        Triangulation::new(Dimensions {
            width: w,
            height: h,
        })
        .unwrap()
        .into_triangles()
    }

    fn uniform(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    #[test]
    fn uniform_source_fills_canvas_with_its_color() {
        let source = uniform(16, 16, [200, 40, 10, 255]);
        let triangles = seed_mesh(16, 16);
        let out = rasterize(&source, &triangles, &PipelineConfig::default()).unwrap();
        for px in out.pixels() {
            assert_eq!(px.0, [200, 40, 10, 255]);
        }
    }

    #[test]
    fn transparent_source_without_background_is_skipped() {
        let source = uniform(8, 8, [0, 0, 0, 0]);
        let triangles = seed_mesh(8, 8);
        let out = rasterize(&source, &triangles, &PipelineConfig::default()).unwrap();
        for px in out.pixels() {
            assert_eq!(px.0[3], 0, "expected a transparent canvas");
        }
    }

    #[test]
    fn transparent_source_with_background_uses_it() {
        let source = uniform(8, 8, [0, 0, 0, 0]);
        let triangles = seed_mesh(8, 8);
        let config = PipelineConfig {
            bg_color: Some("#336699".to_owned()),
            ..PipelineConfig::default()
        };
        let out = rasterize(&source, &triangles, &config).unwrap();
        for px in out.pixels() {
            assert_eq!(px.0, [0x33, 0x66, 0x99, 255]);
        }
    }

    #[test]
    fn stroke_only_leaves_interiors_empty() {
        let source = uniform(64, 64, [10, 200, 10, 255]);
        let triangles = seed_mesh(64, 64);
        let config = PipelineConfig {
            wireframe: Wireframe::StrokeOnly,
            is_stroke_solid: true,
            stroke_width: 2.0,
            ..PipelineConfig::default()
        };
        let out = rasterize(&source, &triangles, &config).unwrap();
        // Deep inside the lower-left triangle, far from every edge.
        assert_eq!(out.get_pixel(8, 48).0[3], 0, "interior should be unfilled");
        // On the diagonal there must be ink.
        assert!(
            out.get_pixel(32, 32).0[3] > 0,
            "expected stroke coverage on the diagonal",
        );
    }

    #[test]
    fn both_mode_keeps_fill_under_the_stroke() {
        let source = uniform(32, 32, [120, 120, 240, 255]);
        let triangles = seed_mesh(32, 32);
        let config = PipelineConfig {
            wireframe: Wireframe::Both,
            stroke_width: 1.0,
            ..PipelineConfig::default()
        };
        let out = rasterize(&source, &triangles, &config).unwrap();
        // Away from the edges the fill color is untouched.
        assert_eq!(out.get_pixel(6, 24).0, [120, 120, 240, 255]);
        // On the diagonal the faint stroke darkens the fill.
        let on_edge = out.get_pixel(16, 16).0;
        assert!(
            on_edge[0] < 120,
            "expected the stroke to darken the edge, got {on_edge:?}",
        );
    }

    #[test]
    fn centroid_sampling_uses_floor() {
        // Mesh over a 3x3 image with a single distinctive pixel at the
        // floored centroid of the upper seed triangle:
        // centroid of (0,0),(3,0),(3,3) = (2, 1).
        let mut source = uniform(3, 3, [0, 0, 0, 255]);
        source.put_pixel(2, 1, Rgba([255, 0, 0, 255]));
        let triangles = seed_mesh(3, 3);
        let primitives =
            emit_primitives(&source, &triangles, &PipelineConfig::default()).unwrap();
        let upper = primitives
            .iter()
            .find(|p| p.p1 == Point::new(3, 0))
            .unwrap();
        assert_eq!(upper.fill, Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn primitives_close_their_paths() {
        let source = uniform(10, 10, [1, 2, 3, 255]);
        let triangles = seed_mesh(10, 10);
        let primitives =
            emit_primitives(&source, &triangles, &PipelineConfig::default()).unwrap();
        assert_eq!(primitives.len(), triangles.len());
        for p in &primitives {
            assert_eq!(p.p0, p.p3);
        }
    }

    #[test]
    fn solid_stroke_is_black() {
        let source = uniform(10, 10, [9, 9, 9, 255]);
        let triangles = seed_mesh(10, 10);
        let config = PipelineConfig {
            is_stroke_solid: true,
            ..PipelineConfig::default()
        };
        let primitives = emit_primitives(&source, &triangles, &config).unwrap();
        for p in &primitives {
            assert_eq!(p.stroke, BLACK);
        }
    }

    #[test]
    fn sampled_stroke_matches_fill() {
        let source = uniform(10, 10, [50, 100, 150, 255]);
        let triangles = seed_mesh(10, 10);
        let primitives =
            emit_primitives(&source, &triangles, &PipelineConfig::default()).unwrap();
        for p in &primitives {
            assert_eq!(p.stroke, Rgba([50, 100, 150, 255]));
            assert_eq!(p.fill, p.stroke);
        }
    }

    #[test]
    fn stroke_only_primitives_fill_white() {
        let source = uniform(10, 10, [50, 100, 150, 255]);
        let triangles = seed_mesh(10, 10);
        let config = PipelineConfig {
            wireframe: Wireframe::StrokeOnly,
            ..PipelineConfig::default()
        };
        let primitives = emit_primitives(&source, &triangles, &config).unwrap();
        for p in &primitives {
            assert_eq!(p.fill, WHITE);
            assert_eq!(p.stroke, Rgba([50, 100, 150, 255]));
        }
    }

    #[test]
    fn transparent_sample_emits_background_fill() {
        let source = uniform(10, 10, [0, 0, 0, 0]);
        let triangles = seed_mesh(10, 10);
        let config = PipelineConfig {
            bg_color: Some("#ff0000".to_owned()),
            ..PipelineConfig::default()
        };
        let primitives = emit_primitives(&source, &triangles, &config).unwrap();
        for p in &primitives {
            assert_eq!(p.fill, Rgba([255, 0, 0, 255]));
        }
    }

    #[test]
    fn transparent_sample_without_background_emits_white() {
        let source = uniform(10, 10, [0, 0, 0, 0]);
        let triangles = seed_mesh(10, 10);
        let primitives =
            emit_primitives(&source, &triangles, &PipelineConfig::default()).unwrap();
        for p in &primitives {
            assert_eq!(p.fill, WHITE);
        }
    }
}
