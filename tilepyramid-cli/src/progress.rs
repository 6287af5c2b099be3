//! Terminal progress reporting.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tilepyramid::build::{BuildPlan, BuildReport};
use tilepyramid::pipeline::ProgressCallback;

/// Progress bar fed by the pipeline's per-tile acknowledgments.
pub struct BuildProgress {
    bar: ProgressBar,
}

impl BuildProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(
            Some(total as u64),
            ProgressDrawTarget::stderr_with_hz(10),
        );
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tiles ({per_sec}, eta {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(200));
        Self { bar }
    }

    /// Callback for the pipeline orchestrator.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |completed, _total| bar.set_position(completed as u64))
    }

    pub fn finish(&self, success: bool) {
        if success {
            self.bar.finish();
        } else {
            self.bar.abandon();
        }
    }
}

/// Prints tile counts per zoom level.
pub fn print_plan(plan: &BuildPlan) {
    println!("Zoom levels {}..={}", plan.zooms.min(), plan.zooms.max());
    for range in &plan.ranges {
        match (range.cols, range.rows) {
            (Some((c0, c1)), Some((r0, r1))) => println!(
                "  z{:<2}  cols {}..={}  rows {}..={}  {} tiles",
                range.zoom,
                c0,
                c1,
                r0,
                r1,
                range.tile_count()
            ),
            _ => println!("  z{:<2}  outside grid  0 tiles", range.zoom),
        }
    }
    println!("Total: {} tiles", plan.total_tiles());
}

/// Prints the summary of a finished build.
pub fn print_report(report: &BuildReport) {
    let stats = &report.stats;
    println!();
    println!("Wrote {}", report.output.display());
    println!(
        "  {} tiles, {} bytes in {:.1}s ({:.1} tiles/s)",
        stats.tiles_stored,
        stats.bytes_stored,
        stats.elapsed.as_secs_f64(),
        stats.tiles_per_second()
    );
    if stats.retries > 0 {
        println!("  {} fetch retries", stats.retries);
    }
    if let Some(format) = report.format {
        println!("  format: {}", format);
    }
    if !report.optimized {
        println!("  optimization skipped");
    }
}
