//! pixtrace: convert raster images to SVG from the command line.
//!
//! Each input image is either traced into filled polygon paths or embedded
//! as a base64 PNG, or the analyzer picks one per image. Results land in
//! the output directory as `<stem>.svg`, or `<stem>_ERROR.txt` when a
//! conversion fails.
//!
//! # Usage
//!
//! ```text
//! pixtrace [OPTIONS] <IMAGES>...
//! pixtrace --analyze [--json] <IMAGES>...
//! pixtrace --diagnostics [--json] <IMAGES>...
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use serde::Serialize;

use pixtrace_batch::{
    BatchItem, BatchJob, BatchOptions, ConvertOptions, MethodSelection, archive_entries,
    process_batch,
};
use pixtrace_pipeline::{
    Clock, ContourMode, GrayscaleFill, ImageAnalysis, PixelBuffer, Recommendation, TraceConfig,
    TraceDiagnostics, analyze, recommend, trace_with_diagnostics,
};

/// Convert raster images to SVG by silhouette tracing or base64 embedding.
#[derive(Parser)]
#[command(name = "pixtrace", version)]
struct Cli {
    /// Input images (PNG, JPEG, BMP, WebP, GIF, TIFF).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Conversion method.
    #[arg(long, value_enum, default_value_t = MethodArg::Trace)]
    method: MethodArg,

    /// Binary threshold (0-255).
    #[arg(long, default_value_t = TraceConfig::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// RDP simplification tolerance in pixels.
    #[arg(long, default_value_t = TraceConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify: f64,

    /// Trace pixels at or below the threshold instead of above it.
    #[arg(long)]
    invert: bool,

    /// Do not invert automatically for dark images.
    #[arg(long)]
    no_auto_invert: bool,

    /// Background for alpha compositing, as #RRGGBB.
    #[arg(long)]
    background: Option<String>,

    /// Which contours to extract.
    #[arg(long, value_enum, default_value_t = ContoursArg::Outer)]
    contours: ContoursArg,

    /// Minimum enclosed area for a region to be kept.
    #[arg(long, default_value_t = TraceConfig::DEFAULT_MIN_AREA)]
    min_area: f64,

    /// Fill for paths traced from grayscale images.
    #[arg(long, value_enum, default_value_t = FillArg::Black)]
    grayscale_fill: FillArg,

    /// Maximum number of images converted concurrently.
    #[arg(long, default_value_t = BatchOptions::DEFAULT_MAX_WORKERS, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    jobs: usize,

    /// Directory that receives the output files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Print image analysis and method recommendation instead of converting.
    #[arg(long, conflicts_with = "diagnostics")]
    analyze: bool,

    /// Print per-stage trace diagnostics instead of converting.
    #[arg(long)]
    diagnostics: bool,

    /// Print reports as JSON.
    #[arg(long)]
    json: bool,

    /// Full conversion options as a JSON string.
    ///
    /// When provided, the method and tracing flags are ignored. The JSON
    /// must be a valid `ConvertOptions` serialization; missing fields take
    /// their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Conversion method selection.
#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Trace silhouettes into filled paths.
    Trace,
    /// Embed the image as a base64 PNG.
    Embed,
    /// Analyze each image and pick per image.
    Auto,
}

/// Contour extraction selection.
#[derive(Clone, Copy, ValueEnum)]
enum ContoursArg {
    /// Outermost boundaries only.
    Outer,
    /// Outer and hole boundaries at every depth.
    Full,
}

/// Grayscale fill selection.
#[derive(Clone, Copy, ValueEnum)]
enum FillArg {
    /// Always `#000000`.
    Black,
    /// Mean gray level under each region.
    Sampled,
}

/// Build [`ConvertOptions`] from CLI arguments.
///
/// If `--config-json` is provided it is parsed directly and the
/// individual flags are ignored.
fn options_from_cli(cli: &Cli) -> Result<ConvertOptions, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ConvertOptions {
        method: match cli.method {
            MethodArg::Trace => MethodSelection::Trace,
            MethodArg::Embed => MethodSelection::Embed,
            MethodArg::Auto => MethodSelection::Auto,
        },
        trace: TraceConfig {
            threshold: cli.threshold,
            simplify_tolerance: cli.simplify,
            invert: cli.invert,
            auto_invert: !cli.no_auto_invert,
            background_color: cli.background.clone(),
            contour_mode: match cli.contours {
                ContoursArg::Outer => ContourMode::Outer,
                ContoursArg::Full => ContourMode::Full,
            },
            min_area: cli.min_area,
            grayscale_fill: match cli.grayscale_fill {
                FillArg::Black => GrayscaleFill::Black,
                FillArg::Sampled => GrayscaleFill::Sampled,
            },
            ..TraceConfig::default()
        },
        title: None,
    })
}

/// Caller-facing name for an input: its file name.
fn identifier(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn decode(path: &Path) -> Result<PixelBuffer, String> {
    image::open(path)
        .map(PixelBuffer::from)
        .map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let options = match options_from_cli(&cli) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    log::debug!("options: {options:?}");

    if cli.analyze {
        run_analyze(&cli)
    } else if cli.diagnostics {
        run_diagnostics(&cli, &options.trace)
    } else {
        run_convert(&cli, &options)
    }
}

/// Per-image line of the conversion report.
#[derive(Serialize)]
struct ItemReport<'a> {
    identifier: &'a str,
    output: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<pixtrace_pipeline::Method>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    svg_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> ItemReport<'a> {
    fn new(item: &'a BatchItem, output: &'a str) -> Self {
        match &item.outcome {
            Ok(conversion) => Self {
                identifier: &item.identifier,
                output,
                ok: true,
                method: Some(conversion.method),
                path_count: conversion.path_count,
                svg_bytes: Some(conversion.svg.len()),
                error_kind: None,
                error: None,
            },
            Err(err) => Self {
                identifier: &item.identifier,
                output,
                ok: false,
                method: None,
                path_count: None,
                svg_bytes: None,
                error_kind: Some(err.kind()),
                error: Some(err.to_string()),
            },
        }
    }
}

fn run_convert(cli: &Cli, options: &ConvertOptions) -> ExitCode {
    if let Err(e) = std::fs::create_dir_all(&cli.out_dir) {
        eprintln!("Error creating {}: {e}", cli.out_dir.display());
        return ExitCode::FAILURE;
    }

    let jobs: Vec<BatchJob> = cli
        .images
        .iter()
        .map(|path| {
            let id = identifier(path);
            match decode(path) {
                Ok(buffer) => BatchJob::new(id, buffer, options.clone()),
                Err(message) => BatchJob::undecodable(id, message, options.clone()),
            }
        })
        .collect();

    let report_progress = |done: usize, total: usize| eprintln!("[{done}/{total}]");
    let items = match process_batch(
        jobs,
        &BatchOptions {
            max_workers: cli.jobs,
        },
        Some(&report_progress),
    ) {
        Ok(items) => items,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let entries = archive_entries(&items);
    let mut write_failed = false;
    for entry in &entries {
        let path = cli.out_dir.join(&entry.name);
        if let Err(e) = std::fs::write(&path, &entry.contents) {
            eprintln!("Error writing {}: {e}", path.display());
            write_failed = true;
        }
    }

    let reports: Vec<ItemReport<'_>> = items
        .iter()
        .zip(&entries)
        .map(|(item, entry)| ItemReport::new(item, &entry.name))
        .collect();

    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for report in &reports {
            match (&report.method, &report.error) {
                (Some(method), _) => {
                    let paths = report
                        .path_count
                        .map_or_else(String::new, |n| format!(", {n} paths"));
                    let size = report
                        .svg_bytes
                        .map_or_else(String::new, |n| format!(", {}", format_size(n)));
                    println!(
                        "{} -> {} ({method}{paths}{size})",
                        report.identifier, report.output,
                    );
                }
                (None, error) => println!(
                    "{} -> {} (failed: {})",
                    report.identifier,
                    report.output,
                    error.as_deref().unwrap_or_default(),
                ),
            }
        }
    }

    let failed = items.iter().filter(|item| !item.is_success()).count();
    eprintln!(
        "{} of {} converted into {}",
        items.len() - failed,
        items.len(),
        cli.out_dir.display(),
    );

    if failed > 0 || write_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Human-readable byte count: bytes below 1 KB, otherwise KB with two
/// decimals.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    }
}

/// Analysis and recommendation for one image.
#[derive(Serialize)]
struct AnalysisReport {
    identifier: String,
    analysis: ImageAnalysis,
    recommendation: Recommendation,
}

fn run_analyze(cli: &Cli) -> ExitCode {
    let mut reports = Vec::with_capacity(cli.images.len());
    let mut failed = false;

    for path in &cli.images {
        let id = identifier(path);
        let buffer = match decode(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("Error decoding {}: {e}", path.display());
                failed = true;
                continue;
            }
        };
        let analysis = analyze(&buffer);
        let recommendation = recommend(&analysis);
        reports.push(AnalysisReport {
            identifier: id,
            analysis,
            recommendation,
        });
    }

    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing analysis: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for report in &reports {
            print_analysis(report);
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_analysis(report: &AnalysisReport) {
    let a = &report.analysis;
    let r = &report.recommendation;
    let estimate = if a.num_colors_is_estimate { "~" } else { "" };
    println!("{}", report.identifier);
    println!("  Size:        {}x{} ({} pixels)", a.width, a.height, a.total_pixels);
    println!(
        "  Colors:      {estimate}{}  variance {:.1}  complexity {:?}",
        a.num_colors, a.variance, a.complexity,
    );
    println!(
        "  Alpha:       {}  transparency {}  grayscale {}  photo {}",
        a.has_alpha, a.has_transparency, a.is_grayscale, a.is_photo,
    );
    println!(
        "  Recommended: {} (confidence {:.2}, score {})",
        r.method, r.confidence, r.score,
    );
    for reason in &r.reasons {
        println!("    - {reason}");
    }
}

/// Trace diagnostics for one image.
#[derive(Serialize)]
struct DiagnosticsReport {
    identifier: String,
    diagnostics: TraceDiagnostics,
}

fn run_diagnostics(cli: &Cli, config: &TraceConfig) -> ExitCode {
    let mut reports = Vec::with_capacity(cli.images.len());
    let mut failed = false;

    for path in &cli.images {
        let id = identifier(path);
        let result = decode(path).and_then(|buffer| {
            trace_with_diagnostics(&buffer, config, &StdClock).map_err(|e| e.to_string())
        });
        match result {
            Ok((_, diagnostics)) => reports.push(DiagnosticsReport {
                identifier: id,
                diagnostics,
            }),
            Err(e) => {
                eprintln!("{id}: {e}");
                failed = true;
            }
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for report in &reports {
            println!("{}", report.identifier);
            println!("{}", report.diagnostics.report());
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: Instant) -> Duration {
        since.elapsed()
    }
}
