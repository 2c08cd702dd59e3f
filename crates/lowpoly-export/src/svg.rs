//! SVG export serializer.
//!
//! Converts the pipeline's triangle primitives into an SVG string. Each
//! primitive becomes a `<path>` element with `M`/`L` commands closing
//! back on the first vertex; all paths share one `<g>` element carrying
//! the stroke width and line cap.
//!
//! Color attributes are written as `rgba(r,g,b,a)` with every component
//! a plain integer, and path coordinates as `x,y` integer pairs --
//! consumers rely on these exact forms.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements for
//! accessibility and to help file managers identify exported files.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt::Write;

use lowpoly_pipeline::{Dimensions, Rgba, TrianglePrimitive};

/// Metadata to embed in the SVG document.
///
/// Both fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag. Text
/// values are XML-escaped automatically.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title -- emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description -- emitted as `<desc>`.
    pub description: Option<&'a str>,
}

/// Presentation attributes for the triangle group.
#[derive(Debug, Clone)]
pub struct SvgOptions<'a> {
    /// Stroke width applied to every triangle path.
    pub stroke_width: f64,
    /// Stroke line cap: `butt`, `round`, or `square`.
    pub stroke_linecap: &'a str,
}

impl Default for SvgOptions<'_> {
    fn default() -> Self {
        Self {
            stroke_width: 1.0,
            stroke_linecap: "round",
        }
    }
}

/// Escape the five XML special characters for safe embedding in element
/// text content and attribute values.
///
/// Handles `&` (must be first), `<`, `>`, `"`, and `'`.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Format a color as the `rgba(r,g,b,a)` attribute value with plain
/// integer components.
fn rgba_attr(color: Rgba) -> String {
    let [r, g, b, a] = color.0;
    format!("rgba({r},{g},{b},{a})")
}

/// Build the `d` attribute for one primitive:
/// `M p0 L p1 L p2 L p3` with `x,y` coordinate pairs.
fn primitive_path_d(primitive: &TrianglePrimitive) -> String {
    format!(
        "M {},{} L {},{} L {},{} L {},{}",
        primitive.p0.x,
        primitive.p0.y,
        primitive.p1.x,
        primitive.p1.y,
        primitive.p2.x,
        primitive.p2.y,
        primitive.p3.x,
        primitive.p3.y,
    )
}

/// Serialize triangle primitives into an SVG document string.
///
/// The `viewBox` is set from [`Dimensions`] so the SVG coordinate space
/// matches the source image pixel grid. Every primitive becomes one
/// `<path>` element with per-triangle `fill` and `stroke` colors; the
/// enclosing `<g>` carries `stroke-linecap` and `stroke-width`.
///
/// # Examples
///
/// ```
/// use lowpoly_pipeline::{Dimensions, Point, TrianglePrimitive};
/// use lowpoly_export::{to_svg, SvgMetadata, SvgOptions};
///
/// let primitive = TrianglePrimitive {
///     p0: Point::new(0, 0),
///     p1: Point::new(8, 0),
///     p2: Point::new(8, 8),
///     p3: Point::new(0, 0),
///     fill: image::Rgba([255, 0, 0, 255]),
///     stroke: image::Rgba([0, 0, 0, 255]),
/// };
/// let dims = Dimensions { width: 8, height: 8 };
/// let svg = to_svg(
///     &[primitive],
///     dims,
///     &SvgMetadata { title: Some("demo"), ..SvgMetadata::default() },
///     &SvgOptions::default(),
/// );
/// assert!(svg.contains("viewBox=\"0 0 8 8\""));
/// assert!(svg.contains("<title>demo</title>"));
/// assert!(svg.contains("M 0,0 L 8,0 L 8,8 L 0,0"));
/// assert!(svg.contains("fill=\"rgba(255,0,0,255)\""));
/// ```
#[must_use]
pub fn to_svg(
    primitives: &[TrianglePrimitive],
    dimensions: Dimensions,
    metadata: &SvgMetadata<'_>,
    options: &SvgOptions<'_>,
) -> String {
    let mut out = String::new();

    // XML declaration
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);

    // Opening <svg> tag with namespace, explicit dimensions, and viewBox
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        dimensions.width, dimensions.height, dimensions.width, dimensions.height,
    );

    // Optional <title> element
    if let Some(title) = metadata.title {
        let _ = writeln!(out, "  <title>{}</title>", xml_escape(title));
    }

    // Optional <desc> element
    if let Some(description) = metadata.description {
        let _ = writeln!(out, "  <desc>{}</desc>", xml_escape(description));
    }

    // One <path> per triangle, grouped under shared stroke attributes.
    let _ = writeln!(
        out,
        r#"  <g stroke-linecap="{}" stroke-width="{}">"#,
        xml_escape(options.stroke_linecap),
        options.stroke_width,
    );
    for primitive in primitives {
        let _ = writeln!(
            out,
            r#"    <path d="{}" fill="{}" stroke="{}"/>"#,
            primitive_path_d(primitive),
            rgba_attr(primitive.fill),
            rgba_attr(primitive.stroke),
        );
    }
    let _ = writeln!(out, "  </g>");

    // Closing tag
    let _ = writeln!(out, "</svg>");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lowpoly_pipeline::Point;

    fn primitive(fill: [u8; 4], stroke: [u8; 4]) -> TrianglePrimitive {
        TrianglePrimitive {
            p0: Point::new(0, 0),
            p1: Point::new(10, 0),
            p2: Point::new(10, 10),
            p3: Point::new(0, 0),
            fill: image::Rgba(fill),
            stroke: image::Rgba(stroke),
        }
    }

    fn dims() -> Dimensions {
        Dimensions {
            width: 10,
            height: 10,
        }
    }

    #[test]
    fn document_envelope() {
        let svg = to_svg(&[], dims(), &SvgMetadata::default(), &SvgOptions::default());
        assert!(svg.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains(r#"width="10" height="10" viewBox="0 0 10 10""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn group_carries_stroke_attributes() {
        let options = SvgOptions {
            stroke_width: 1.5,
            stroke_linecap: "round",
        };
        let svg = to_svg(&[], dims(), &SvgMetadata::default(), &options);
        assert!(svg.contains(r#"<g stroke-linecap="round" stroke-width="1.5">"#));
    }

    #[test]
    fn integral_stroke_width_has_no_fraction() {
        let svg = to_svg(&[], dims(), &SvgMetadata::default(), &SvgOptions::default());
        assert!(svg.contains(r#"stroke-width="1">"#));
    }

    #[test]
    fn path_closes_on_first_vertex() {
        let svg = to_svg(
            &[primitive([1, 2, 3, 255], [0, 0, 0, 255])],
            dims(),
            &SvgMetadata::default(),
            &SvgOptions::default(),
        );
        assert!(svg.contains(r#"d="M 0,0 L 10,0 L 10,10 L 0,0""#));
    }

    #[test]
    fn colors_are_plain_integer_rgba() {
        let svg = to_svg(
            &[primitive([255, 128, 0, 255], [0, 0, 0, 20])],
            dims(),
            &SvgMetadata::default(),
            &SvgOptions::default(),
        );
        assert!(svg.contains(r#"fill="rgba(255,128,0,255)""#));
        assert!(svg.contains(r#"stroke="rgba(0,0,0,20)""#));
    }

    #[test]
    fn one_path_per_primitive() {
        let primitives = vec![
            primitive([1, 1, 1, 255], [0, 0, 0, 255]),
            primitive([2, 2, 2, 255], [0, 0, 0, 255]),
            primitive([3, 3, 3, 255], [0, 0, 0, 255]),
        ];
        let svg = to_svg(
            &primitives,
            dims(),
            &SvgMetadata::default(),
            &SvgOptions::default(),
        );
        assert_eq!(svg.matches("<path ").count(), 3);
    }

    #[test]
    fn metadata_elements_are_emitted_and_escaped() {
        let metadata = SvgMetadata {
            title: Some("cats & dogs"),
            description: Some("a < b"),
        };
        let svg = to_svg(&[], dims(), &metadata, &SvgOptions::default());
        assert!(svg.contains("<title>cats &amp; dogs</title>"));
        assert!(svg.contains("<desc>a &lt; b</desc>"));
    }

    #[test]
    fn metadata_absent_by_default() {
        let svg = to_svg(&[], dims(), &SvgMetadata::default(), &SvgOptions::default());
        assert!(!svg.contains("<title>"));
        assert!(!svg.contains("<desc>"));
    }
}
