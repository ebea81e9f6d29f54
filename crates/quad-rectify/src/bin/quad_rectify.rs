use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use quad_rectify::io::{parse_corner_list, run_job, JobError, RectifyJobConfig};
use quad_rectify::Interpolation;

/// Rectify a quadrilateral region of an image onto an upright canvas.
#[derive(Parser, Debug)]
#[command(name = "quad-rectify", version, about)]
struct Cli {
    /// Input image file path.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Corners of the region to rectify: "x1,y1,x2,y2,x3,y3,x4,y4".
    #[arg(short, long, alias = "corner-list", allow_hyphen_values = true)]
    corners: Option<String>,

    /// Destination corners in the same order (default: the input image corners).
    #[arg(short, long, alias = "dest-list", allow_hyphen_values = true)]
    destination: Option<String>,

    /// Output image path (default: "<input stem>_rectified.png" next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Convert to gray scale before rectifying.
    #[arg(short = 'L', long = "gray-scale")]
    gray_scale: bool,

    /// Resampling kernel.
    #[arg(long, value_enum)]
    interpolation: Option<InterpolationArg>,

    /// Write a JSON report with the estimated homographies.
    #[arg(long)]
    report: Option<PathBuf>,

    /// JSON job config; command-line flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InterpolationArg {
    Nearest,
    Bilinear,
    Bicubic,
}

impl From<InterpolationArg> for Interpolation {
    fn from(value: InterpolationArg) -> Self {
        match value {
            InterpolationArg::Nearest => Interpolation::Nearest,
            InterpolationArg::Bilinear => Interpolation::Bilinear,
            InterpolationArg::Bicubic => Interpolation::Bicubic,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match build_config(cli).and_then(|cfg| run_job(&cfg)) {
        Ok(report) => {
            println!(
                "wrote {}x{} rectified image to {}",
                report.canvas.width, report.canvas.height, report.output_path
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: Cli) -> Result<RectifyJobConfig, JobError> {
    let base = cli
        .config
        .as_ref()
        .map(RectifyJobConfig::load_json)
        .transpose()?;

    let image_path = match (&cli.input, &base) {
        (Some(path), _) => path.to_string_lossy().into_owned(),
        (None, Some(base)) => base.image_path.clone(),
        (None, None) => return Err(JobError::Missing("input")),
    };
    let corners = match (&cli.corners, &base) {
        (Some(list), _) => parse_corner_list(list)?,
        (None, Some(base)) => base.corners,
        (None, None) => return Err(JobError::Missing("corners")),
    };

    let mut cfg = base.unwrap_or_else(|| RectifyJobConfig::new(image_path.clone(), corners));
    cfg.image_path = image_path;
    cfg.corners = corners;
    if let Some(list) = &cli.destination {
        cfg.destination = Some(parse_corner_list(list)?);
    }
    if let Some(path) = &cli.output {
        cfg.output_path = Some(path.to_string_lossy().into_owned());
    }
    if cli.gray_scale {
        cfg.gray_scale = true;
    }
    if let Some(interp) = cli.interpolation {
        cfg.interpolation = interp.into();
    }
    if let Some(path) = &cli.report {
        cfg.report_path = Some(path.to_string_lossy().into_owned());
    }
    Ok(cfg)
}

#[cfg(feature = "tracing")]
fn init_logging(_verbose: u8) {
    // Route `log` records into the tracing subscriber; RUST_LOG drives the filter.
    let _ = tracing_log::LogTracer::init();
    quad_rectify::core::init_tracing(false);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8) {
    use log::LevelFilter;

    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = quad_rectify::core::init_with_level(level);
}
