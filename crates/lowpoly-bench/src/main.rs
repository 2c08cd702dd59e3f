//! lowpoly-bench: CLI tool for pipeline parameter experimentation and
//! diagnostics.
//!
//! Runs the triangulation pipeline on a given image file with
//! configurable parameters, printing detailed per-stage diagnostics.
//! Useful for:
//!
//! - Tuning blur radius, matrix sizes, thresholds, and point budgets
//! - Comparing wireframe and shading modes
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin lowpoly-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use lowpoly_export::{to_svg, SvgMetadata, SvgOptions};
use lowpoly_pipeline::{shade, PipelineConfig, PipelineDiagnostics};

/// Pipeline parameter experimentation and diagnostics for lowpoly.
///
/// Runs the triangulation pipeline on a given image with configurable
/// parameters and prints detailed per-stage timing and count
/// diagnostics.
#[derive(Parser)]
#[command(name = "lowpoly-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Stack blur radius.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLUR_RADIUS)]
    blur_radius: u32,

    /// Smoothing matrix half-width (side = 2n + 1).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLUR_FACTOR)]
    blur_factor: u32,

    /// Edge matrix half-width (side = 2n + 1); also the edge divisor.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_EDGE_FACTOR)]
    edge_factor: u32,

    /// Threshold on the neighborhood mean for candidate vertices.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_POINTS_THRESHOLD)]
    points_threshold: u8,

    /// Fraction of candidate points retained (0, 1].
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_POINT_RATE)]
    point_rate: f64,

    /// Maximum number of sampled vertices.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_POINTS)]
    max_points: usize,

    /// Wireframe mode.
    #[arg(long, value_enum, default_value_t = WireframeArg::None)]
    wireframe: WireframeArg,

    /// Grain intensity for the raster output.
    #[arg(long, default_value_t = 0)]
    noise: u32,

    /// Stroke width in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_STROKE_WIDTH)]
    stroke_width: f64,

    /// Stroke with solid black instead of sampled colors.
    #[arg(long)]
    solid_stroke: bool,

    /// Sample triangle colors from the grayscaled image.
    #[arg(long)]
    grayscale: bool,

    /// Background hex color for transparent source pixels (e.g. "#fff").
    #[arg(long)]
    bg_color: Option<String>,

    /// Seed for the vertex sampler; omit for entropy seeding.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the shaded raster output as PNG.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

/// Wireframe mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum WireframeArg {
    /// Filled triangles without strokes.
    None,
    /// Filled triangles with a faint stroke.
    Both,
    /// Stroked outlines only.
    StrokeOnly,
}

impl From<WireframeArg> for lowpoly_pipeline::Wireframe {
    fn from(arg: WireframeArg) -> Self {
        match arg {
            WireframeArg::None => Self::None,
            WireframeArg::Both => Self::Both,
            WireframeArg::StrokeOnly => Self::StrokeOnly,
        }
    }
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            blur_radius: self.blur_radius,
            blur_factor: self.blur_factor,
            edge_factor: self.edge_factor,
            points_threshold: self.points_threshold,
            point_rate: self.point_rate,
            max_points: self.max_points,
            wireframe: self.wireframe.into(),
            noise: self.noise,
            stroke_width: self.stroke_width,
            is_stroke_solid: self.solid_stroke,
            grayscale: self.grayscale,
            bg_color: self.bg_color.clone(),
            seed: self.seed,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.runs == 0 {
        eprintln!("Error: --runs must be at least 1");
        return ExitCode::FAILURE;
    }

    let config = cli.config();
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let source = match image::open(&cli.image_path) {
        Ok(decoded) => decoded.to_rgba8(),
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({}x{})",
        cli.image_path.display(),
        source.width(),
        source.height(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (staged, diagnostics) =
            match lowpoly_pipeline::process_staged_with_diagnostics(&source, &config) {
                Ok(output) => output,
                Err(e) => {
                    eprintln!("Pipeline error: {e}");
                    return ExitCode::FAILURE;
                }
            };

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        // Write outputs on the first run only.
        if run == 0 {
            if let Some(ref out_path) = cli.out {
                match staged.shaded.save(out_path) {
                    Ok(()) => eprintln!("PNG written to {}", out_path.display()),
                    Err(e) => eprintln!("Error writing PNG to {}: {e}", out_path.display()),
                }
            }

            if let Some(ref svg_path) = cli.svg {
                // Reuse the mesh of this run so raster and vector
                // outputs describe the same triangulation.
                let shading = if config.grayscale {
                    &staged.grayscaled
                } else {
                    &staged.original
                };
                let primitives =
                    match shade::emit_primitives(shading, &staged.triangles, &config) {
                        Ok(primitives) => primitives,
                        Err(e) => {
                            eprintln!("Primitive emission error: {e}");
                            return ExitCode::FAILURE;
                        }
                    };
                let title = cli
                    .image_path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned());
                let metadata = SvgMetadata {
                    title: title.as_deref(),
                    description: Some("Generated by lowpoly-bench"),
                };
                let options = SvgOptions {
                    stroke_width: config.stroke_width,
                    stroke_linecap: "round",
                };
                let svg = to_svg(&primitives, staged.dimensions, &metadata, &options);
                match std::fs::write(svg_path, &svg) {
                    Ok(()) => {
                        eprintln!("SVG written to {} ({} bytes)", svg_path.display(), svg.len());
                    }
                    Err(e) => eprintln!("Error writing SVG to {}: {e}", svg_path.display()),
                }
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Option<std::time::Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<20} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(36));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Blur", |d| Some(d.blur.duration)),
        ("Grayscale", |d| d.grayscale.as_ref().map(|s| s.duration)),
        ("Smoothing", |d| d.smoothing.as_ref().map(|s| s.duration)),
        ("Edge Extraction", |d| {
            d.edge_extraction.as_ref().map(|s| s.duration)
        }),
        ("Sampling", |d| d.sampling.as_ref().map(|s| s.duration)),
        ("Triangulation", |d| {
            d.triangulation.as_ref().map(|s| s.duration)
        }),
        ("Shading", |d| d.shading.as_ref().map(|s| s.duration)),
        ("Grain", |d| d.grain.as_ref().map(|s| s.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<20} {stage_mean:>10.3}ms");
    }
}
