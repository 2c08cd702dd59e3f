//! Pipeline driver: runs the processing chain in strict sequence over
//! caller-owned buffers.
//!
//! Stage order: validate -> stack blur -> grayscale -> smoothing
//! convolution -> edge convolution -> vertex sampling -> triangulation
//! -> shading -> optional grain. `max_points == 0` short-circuits after
//! the blur and returns the blurred raster with empty point and
//! triangle lists.
//!
//! Each invocation owns its buffers and mesh end to end; nothing is
//! shared between runs. With `PipelineConfig::seed` set, two runs over
//! the same input produce identical output.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::blur::stack_blur;
use crate::convolve::{blur_matrix, convolve_channel, edge_matrix};
use crate::delaunay::{Triangle, Triangulation};
use crate::diagnostics::{PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics};
use crate::grain::add_grain;
use crate::grayscale::grayscale;
use crate::sample::{candidate_points, draw_points};
use crate::shade::{emit_primitives, rasterize};
use crate::types::{
    Dimensions, PipelineConfig, PipelineError, Point, PrimitiveResult, ProcessResult, RgbaImage,
    StagedResult,
};

/// Check the source dimensions: both must exceed one pixel and the
/// pixel count must stay addressable.
fn validate_input(source: &RgbaImage) -> Result<Dimensions, PipelineError> {
    let (width, height) = source.dimensions();
    if width <= 1 || height <= 1 {
        return Err(PipelineError::InvalidInput(format!(
            "image must be larger than 1x1, got {width}x{height}",
        )));
    }
    if u64::from(width) * u64::from(height) > i32::MAX as u64 {
        return Err(PipelineError::BufferOverflow { width, height });
    }
    Ok(Dimensions { width, height })
}

/// Everything the mesh stages produce, with per-stage durations.
struct MeshRun {
    dimensions: Dimensions,
    blurred: RgbaImage,
    grayscaled: RgbaImage,
    edges: RgbaImage,
    candidate_count: usize,
    points: Vec<Point>,
    triangles: Vec<Triangle>,
    degenerate_skips: usize,
    durations: MeshDurations,
}

/// Stage durations for [`MeshRun`]; `None` marks a skipped stage.
struct MeshDurations {
    blur: Duration,
    grayscale: Option<Duration>,
    smoothing: Option<Duration>,
    edge_extraction: Option<Duration>,
    sampling: Option<Duration>,
    triangulation: Option<Duration>,
}

impl MeshRun {
    /// The image triangle colors are sampled from.
    fn shading_source<'a>(&'a self, source: &'a RgbaImage, config: &PipelineConfig) -> &'a RgbaImage {
        if config.grayscale {
            &self.grayscaled
        } else {
            source
        }
    }
}

/// Run every stage up to and including triangulation.
fn run_mesh(source: &RgbaImage, config: &PipelineConfig) -> Result<MeshRun, PipelineError> {
    config.validate()?;
    let dimensions = validate_input(source)?;

    let start = Instant::now();
    let blurred = stack_blur(source, config.blur_radius);
    let blur_duration = start.elapsed();

    if config.max_points == 0 {
        return Ok(MeshRun {
            dimensions,
            grayscaled: blurred.clone(),
            edges: blurred.clone(),
            blurred,
            candidate_count: 0,
            points: Vec::new(),
            triangles: Vec::new(),
            degenerate_skips: 0,
            durations: MeshDurations {
                blur: blur_duration,
                grayscale: None,
                smoothing: None,
                edge_extraction: None,
                sampling: None,
                triangulation: None,
            },
        });
    }

    let start = Instant::now();
    let grayscaled = grayscale(&blurred);
    let grayscale_duration = start.elapsed();

    let mut edges = blurred.clone();

    let start = Instant::now();
    let smoothing = blur_matrix(config.blur_factor);
    #[allow(clippy::cast_precision_loss)]
    convolve_channel(&mut edges, &smoothing, smoothing.len() as f64)?;
    let smoothing_duration = start.elapsed();

    let start = Instant::now();
    let extraction = edge_matrix(config.edge_factor);
    convolve_channel(&mut edges, &extraction, f64::from(config.edge_factor))?;
    let edge_duration = start.elapsed();

    let start = Instant::now();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let candidates = candidate_points(&edges, config.points_threshold);
    let points = draw_points(&candidates, config.max_points, config.point_rate, &mut rng);
    let sampling_duration = start.elapsed();

    let start = Instant::now();
    let mut mesh = Triangulation::new(dimensions)?;
    mesh.insert_all(&points);
    let triangulation_duration = start.elapsed();

    let degenerate_skips = mesh.degenerate_skips();
    Ok(MeshRun {
        dimensions,
        blurred,
        grayscaled,
        edges,
        candidate_count: candidates.len(),
        points,
        triangles: mesh.into_triangles(),
        degenerate_skips,
        durations: MeshDurations {
            blur: blur_duration,
            grayscale: Some(grayscale_duration),
            smoothing: Some(smoothing_duration),
            edge_extraction: Some(edge_duration),
            sampling: Some(sampling_duration),
            triangulation: Some(triangulation_duration),
        },
    })
}

/// Run the full pipeline, preserving every intermediate stage output
/// and collecting per-stage diagnostics.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a bad configuration,
/// [`PipelineError::InvalidInput`] for degenerate dimensions, and
/// [`PipelineError::BufferOverflow`] for an unaddressable pixel count.
pub fn process_staged_with_diagnostics(
    source: &RgbaImage,
    config: &PipelineConfig,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let total_start = Instant::now();
    let run = run_mesh(source, config)?;
    let early_exit = run.durations.grayscale.is_none();

    let (shaded, shading_duration, grain_duration) = if early_exit {
        (run.blurred.clone(), None, None)
    } else {
        let start = Instant::now();
        let mut shaded = rasterize(run.shading_source(source, config), &run.triangles, config)?;
        let shading_duration = start.elapsed();

        let grain_duration = if config.noise > 0 {
            let start = Instant::now();
            add_grain(&mut shaded, config.noise);
            Some(start.elapsed())
        } else {
            None
        };
        (shaded, Some(shading_duration), grain_duration)
    };

    let diagnostics = assemble_diagnostics(
        &run,
        config,
        shading_duration,
        grain_duration,
        total_start.elapsed(),
    );

    let staged = StagedResult {
        original: source.clone(),
        blurred: run.blurred,
        grayscaled: run.grayscaled,
        edges: run.edges,
        points: run.points,
        triangles: run.triangles,
        shaded,
        dimensions: run.dimensions,
    };
    Ok((staged, diagnostics))
}

fn assemble_diagnostics(
    run: &MeshRun,
    config: &PipelineConfig,
    shading_duration: Option<Duration>,
    grain_duration: Option<Duration>,
    total_duration: Duration,
) -> PipelineDiagnostics {
    let stage = |duration: Option<Duration>, metrics: StageMetrics| {
        duration.map(|duration| StageDiagnostics { duration, metrics })
    };

    #[allow(clippy::cast_precision_loss)]
    let smoothing_divisor = blur_matrix(config.blur_factor).len() as f64;

    PipelineDiagnostics {
        blur: StageDiagnostics {
            duration: run.durations.blur,
            metrics: StageMetrics::Blur {
                radius: config.blur_radius,
            },
        },
        grayscale: stage(
            run.durations.grayscale,
            StageMetrics::Grayscale {
                width: run.dimensions.width,
                height: run.dimensions.height,
            },
        ),
        smoothing: stage(
            run.durations.smoothing,
            StageMetrics::Convolution {
                side: 2 * config.blur_factor + 1,
                divisor: smoothing_divisor,
            },
        ),
        edge_extraction: stage(
            run.durations.edge_extraction,
            StageMetrics::Convolution {
                side: 2 * config.edge_factor + 1,
                divisor: f64::from(config.edge_factor),
            },
        ),
        sampling: stage(
            run.durations.sampling,
            StageMetrics::Sampling {
                threshold: config.points_threshold,
                rate: config.point_rate,
                candidate_count: run.candidate_count,
                sampled_count: run.points.len(),
            },
        ),
        triangulation: stage(
            run.durations.triangulation,
            StageMetrics::Triangulation {
                inserted: run.points.len(),
                triangle_count: run.triangles.len(),
                degenerate_skips: run.degenerate_skips,
            },
        ),
        shading: stage(
            shading_duration,
            StageMetrics::Shading {
                wireframe: config.wireframe.to_string(),
                triangle_count: run.triangles.len(),
            },
        ),
        grain: stage(
            grain_duration,
            StageMetrics::Grain {
                amount: config.noise,
            },
        ),
        total_duration,
        summary: PipelineSummary {
            image_width: run.dimensions.width,
            image_height: run.dimensions.height,
            pixel_count: run.dimensions.pixel_count(),
            candidate_count: run.candidate_count,
            point_count: run.points.len(),
            triangle_count: run.triangles.len(),
        },
    }
}

/// Run the full pipeline, preserving every intermediate stage output.
///
/// # Errors
///
/// Same as [`process_staged_with_diagnostics`].
pub fn process_staged(
    source: &RgbaImage,
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    process_staged_with_diagnostics(source, config).map(|(staged, _)| staged)
}

/// Run the pipeline to a raster output.
///
/// Convenience wrapper around [`process_staged`] that discards the
/// intermediate images.
///
/// # Errors
///
/// Same as [`process_staged_with_diagnostics`].
pub fn process(source: &RgbaImage, config: &PipelineConfig) -> Result<ProcessResult, PipelineError> {
    let staged = process_staged(source, config)?;
    Ok(ProcessResult {
        image: staged.shaded,
        triangles: staged.triangles,
        points: staged.points,
        dimensions: staged.dimensions,
    })
}

/// Run the pipeline to a vector output: one colored primitive per
/// triangle, ready for SVG serialization. No raster is produced and the
/// grain pass never applies.
///
/// # Errors
///
/// Same as [`process_staged_with_diagnostics`].
pub fn process_primitives(
    source: &RgbaImage,
    config: &PipelineConfig,
) -> Result<PrimitiveResult, PipelineError> {
    let run = run_mesh(source, config)?;
    let primitives = emit_primitives(run.shading_source(source, config), &run.triangles, config)?;
    Ok(PrimitiveResult {
        primitives,
        triangles: run.triangles,
        points: run.points,
        dimensions: run.dimensions,
    })
}
