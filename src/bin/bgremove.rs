use anyhow::{Context, Result};
use clap::Parser;
use pixels_bgremove::{
    decode_image, encode_png, is_suitable, remove_background, BgRemovalError, RemovalOptions,
    RemovalReport,
};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Remove flat backgrounds by flood-filling from the image border.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON options file (tolerance, sampleDepth, edgeSmoothing, maxDimension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Color tolerance 0-100
    #[arg(short, long)]
    tolerance: Option<u32>,

    /// Border band depth used to sample background colors
    #[arg(long)]
    sample_depth: Option<u32>,

    /// Soften the cutout edge
    #[arg(long)]
    edge_smoothing: bool,

    /// Longest side processed at full resolution
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Only report whether each image suits border-based removal
    #[arg(long)]
    probe: bool,

    /// Print one JSON report per input instead of plain text
    #[arg(long)]
    json: bool,

    /// Output directory
    #[arg(short = 'd', long)]
    out_dir: Option<PathBuf>,

    /// Output filename prefix (ignored when --out-dir supplied)
    #[arg(short = 'p', long, default_value = "nobg_")]
    prefix: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileReport {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suitable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<RemovalReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<BgRemovalError>,
}

fn resolve_options(args: &Args) -> Result<RemovalOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            RemovalOptions::from_json_str(&json)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => RemovalOptions::default(),
    };

    if let Some(tolerance) = args.tolerance {
        options.tolerance = tolerance;
    }
    if let Some(depth) = args.sample_depth {
        options.sample_depth = depth;
    }
    if let Some(max) = args.max_dimension {
        options.max_dimension = max;
    }
    if args.edge_smoothing {
        options.edge_smoothing = true;
    }

    options.validate().context("invalid options")?;
    Ok(options)
}

fn output_path(args: &Args, input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    match &args.out_dir {
        Some(dir) => dir.join(format!("{stem}.png")),
        None => input.with_file_name(format!("{}{stem}.png", args.prefix)),
    }
}

fn process(args: &Args, options: &RemovalOptions, input: &Path) -> FileReport {
    let mut file_report = FileReport {
        input: input.display().to_string(),
        output: None,
        suitable: None,
        report: None,
        error: None,
    };

    let outcome = (|| -> pixels_bgremove::Result<()> {
        let img = decode_image(&fs::read(input)?)?;

        if args.probe {
            file_report.suitable = Some(is_suitable(&img));
            return Ok(());
        }

        let removal = remove_background(&img, options)?;
        let out_path = output_path(args, input);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, encode_png(&removal.image)?)?;

        file_report.output = Some(out_path.display().to_string());
        file_report.report = Some(removal.report);
        Ok(())
    })();

    if let Err(e) = outcome {
        file_report.error = Some(e);
    }
    file_report
}

fn print_text(report: &FileReport) {
    if let Some(error) = &report.error {
        eprintln!("{}: {}", report.input, error);
    } else if let Some(suitable) = report.suitable {
        println!("{}: {}", report.input, if suitable { "suitable" } else { "not suitable" });
    } else if let (Some(output), Some(stats)) = (&report.output, &report.report) {
        if stats.fallback {
            println!("{}: no usable border, copied unchanged → {}", report.input, output);
        } else {
            println!(
                "{}: cleared {} px (tolerance {}) → {}",
                report.input, stats.removed_pixels, stats.effective_tolerance, output
            );
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let options = resolve_options(&args)?;

    let reports: Vec<FileReport> = args
        .inputs
        .par_iter()
        .map(|input| process(&args, &options, input))
        .collect();

    for report in &reports {
        if args.json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            print_text(report);
        }
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} inputs failed", failed, reports.len());
    }
    Ok(())
}
