//! Per-stage instrumentation for pipeline runs.
//!
//! Every diagnostics-enabled run records how long each stage took and
//! what it produced (candidate counts, mesh size, kernel shapes). The
//! CLI prints these after each run, either as a formatted table or as
//! JSON.
//!
//! `std::time::Duration` has no serde support, so duration fields go
//! through [`duration_serde`] and appear in JSON as fractional seconds.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde shim storing a `Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds)
            .map_err(|e| D::Error::custom(format!("bad duration value {seconds}: {e}")))
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// Stages that are conditionally skipped (everything after the blur
/// when `max_points == 0`, the grain pass when `noise == 0`) have
/// `Option` fields that are `None` when the stage did not execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: stack blur.
    pub blur: StageDiagnostics,
    /// Stage 2: grayscale conversion.
    pub grayscale: Option<StageDiagnostics>,
    /// Stage 3: smoothing convolution (all-ones matrix).
    pub smoothing: Option<StageDiagnostics>,
    /// Stage 4: edge-extraction convolution.
    pub edge_extraction: Option<StageDiagnostics>,
    /// Stage 5: candidate thresholding + random draw.
    pub sampling: Option<StageDiagnostics>,
    /// Stage 6: Bowyer-Watson triangulation.
    pub triangulation: Option<StageDiagnostics>,
    /// Stage 7: centroid shading onto the raster canvas.
    pub shading: Option<StageDiagnostics>,
    /// Stage 8: grain (only when `noise > 0`).
    pub grain: Option<StageDiagnostics>,
    /// Total wall-clock duration of the entire pipeline.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Stack blur metrics.
    Blur {
        /// Radius requested by the configuration.
        radius: u32,
    },
    /// Grayscale conversion metrics.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Convolution metrics (smoothing or edge extraction).
    Convolution {
        /// Kernel side length.
        side: u32,
        /// Weight divisor.
        divisor: f64,
    },
    /// Vertex sampling metrics.
    Sampling {
        /// Threshold on the neighborhood mean.
        threshold: u8,
        /// Configured retention rate.
        rate: f64,
        /// Pixels that passed the threshold.
        candidate_count: usize,
        /// Points actually drawn (duplicates included).
        sampled_count: usize,
    },
    /// Triangulation metrics.
    Triangulation {
        /// Points inserted into the mesh.
        inserted: usize,
        /// Triangles in the final mesh.
        triangle_count: usize,
        /// Collinear cavity triangles skipped during rebuilds.
        degenerate_skips: usize,
    },
    /// Shading metrics.
    Shading {
        /// Wireframe mode, as its display string.
        wireframe: String,
        /// Triangles walked.
        triangle_count: usize,
    },
    /// Grain metrics.
    Grain {
        /// Configured noise intensity.
        amount: u32,
    },
}

impl StageMetrics {
    /// One-line detail text for the report table.
    fn describe(&self) -> String {
        match self {
            Self::Blur { radius } => format!("radius={radius}"),
            Self::Grayscale { width, height } => format!("{width}x{height}"),
            Self::Convolution { side, divisor } => format!("{side}x{side} kernel / {divisor}"),
            Self::Sampling {
                threshold,
                rate,
                candidate_count,
                sampled_count,
            } => {
                format!(
                    "{sampled_count} of {candidate_count} candidates \
                     (threshold {threshold}, rate {rate:.3})",
                )
            }
            Self::Triangulation {
                inserted,
                triangle_count,
                degenerate_skips,
            } => {
                format!(
                    "{inserted} inserts, {triangle_count} triangles, {degenerate_skips} skipped",
                )
            }
            Self::Shading {
                wireframe,
                triangle_count,
            } => format!("{triangle_count} triangles, wireframe {wireframe}"),
            Self::Grain { amount } => format!("amount={amount}"),
        }
    }
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Candidate pixels that passed the sampling threshold.
    pub candidate_count: usize,
    /// Points drawn and inserted into the mesh.
    pub point_count: usize,
    /// Triangles in the final mesh.
    pub triangle_count: usize,
}

impl PipelineDiagnostics {
    /// The stages that actually executed, labeled, in pipeline order.
    fn executed_stages(&self) -> impl Iterator<Item = (&'static str, &StageDiagnostics)> + '_ {
        let optional = [
            ("Grayscale", self.grayscale.as_ref()),
            ("Smoothing", self.smoothing.as_ref()),
            ("Edge Extraction", self.edge_extraction.as_ref()),
            ("Sampling", self.sampling.as_ref()),
            ("Triangulation", self.triangulation.as_ref()),
            ("Shading", self.shading.as_ref()),
            ("Grain", self.grain.as_ref()),
        ];
        std::iter::once(("Blur", &self.blur)).chain(
            optional
                .into_iter()
                .filter_map(|(label, stage)| Some((label, stage?))),
        )
    }

    /// Render the diagnostics as a human-readable table.
    #[must_use]
    pub fn report(&self) -> String {
        let total_ms = self.total_duration.as_secs_f64() * 1000.0;

        let mut out = String::new();
        let _ = writeln!(out, "Pipeline Diagnostics Report");
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(
            out,
            "Image: {}x{} ({} pixels), total {total_ms:.3}ms",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        );
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<20} {:>10} {:>8}  {}",
            "Stage", "Duration", "Share", "Details"
        );
        let _ = writeln!(out, "{}", "-".repeat(72));

        for (label, stage) in self.executed_stages() {
            let stage_ms = stage.duration.as_secs_f64() * 1000.0;
            let share = if total_ms > 0.0 {
                100.0 * stage_ms / total_ms
            } else {
                0.0
            };
            let _ = writeln!(
                out,
                "{label:<20} {stage_ms:>8.3}ms {share:>6.1}%  {}",
                stage.metrics.describe(),
            );
        }

        let _ = writeln!(out);
        let _ = write!(
            out,
            "Candidates: {}  |  Points: {}  |  Triangles: {}",
            self.summary.candidate_count, self.summary.point_count, self.summary.triangle_count,
        );
        out
    }
}
