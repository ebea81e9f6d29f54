//! JSON job configuration and report helpers.

use crate::core::{CanvasSize, Interpolation, Quadrilateral, RectifyError, ResamplingParams};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[cfg(feature = "image")]
use crate::rectify::{load_image, to_gray_scale, warp_image, RectifyImageError};
#[cfg(feature = "image")]
use std::time::Instant;

#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Rectify(#[from] RectifyError),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] RectifyImageError),
    #[error("invalid coordinate list {input:?}: {reason}")]
    CoordinateList { input: String, reason: String },
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
}

/// Parse `"x1,y1,x2,y2,x3,y3,x4,y4"` into a quadrilateral.
///
/// Surrounding brackets and whitespace are ignored, so `"[10, 10, 10, 110, ...]"`
/// is accepted too.
pub fn parse_corner_list(input: &str) -> Result<Quadrilateral, JobError> {
    let trimmed = input
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    let mut coords = Vec::with_capacity(8);
    for token in trimmed.split(',') {
        let token = token.trim();
        let value: f64 = token.parse().map_err(|_| JobError::CoordinateList {
            input: input.to_string(),
            reason: format!("{token:?} is not a number"),
        })?;
        coords.push(value);
    }
    Quadrilateral::from_flat(&coords).map_err(|err| JobError::CoordinateList {
        input: input.to_string(),
        reason: err.to_string(),
    })
}

/// One rectification job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectifyJobConfig {
    pub image_path: String,
    /// Corners of the region to rectify, in source image coordinates.
    pub corners: Quadrilateral,
    /// Where `corners` should land; defaults to the source image corners.
    #[serde(default)]
    pub destination: Option<Quadrilateral>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub gray_scale: bool,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub report_path: Option<String>,
}

impl RectifyJobConfig {
    pub fn new(image_path: impl Into<String>, corners: Quadrilateral) -> Self {
        Self {
            image_path: image_path.into(),
            corners,
            destination: None,
            output_path: None,
            gray_scale: false,
            interpolation: Interpolation::default(),
            report_path: None,
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, JobError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), JobError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output image path: `<input stem>_rectified.png` next to
    /// the input unless set explicitly.
    pub fn output_path(&self) -> PathBuf {
        if let Some(path) = &self.output_path {
            return PathBuf::from(path);
        }
        let input = Path::new(&self.image_path);
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        input.with_file_name(format!("{stem}_rectified.png"))
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        self.report_path.as_ref().map(PathBuf::from)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingsMs {
    pub load_image: u64,
    pub estimate: u64,
    pub warp: u64,
    pub save_image: u64,
    pub total: u64,
}

/// Summary of a finished job, suitable for JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectifyReport {
    pub image_path: String,
    pub output_path: String,
    pub input_size: [u32; 2],
    pub gray_scale: bool,
    pub interpolation: Interpolation,
    pub origin: Quadrilateral,
    pub destination: Quadrilateral,
    pub dst_to_src: [[f64; 3]; 3],
    pub src_to_dst: [[f64; 3]; 3],
    pub coefficients: [f64; 8],
    pub canvas: CanvasSize,
    pub timings_ms: TimingsMs,
}

impl RectifyReport {
    pub fn new(
        cfg: &RectifyJobConfig,
        output_path: &Path,
        input_size: [u32; 2],
        destination: Quadrilateral,
        params: &ResamplingParams,
    ) -> Self {
        Self {
            image_path: cfg.image_path.clone(),
            output_path: output_path.to_string_lossy().into_owned(),
            input_size,
            gray_scale: cfg.gray_scale,
            interpolation: cfg.interpolation,
            origin: cfg.corners,
            destination,
            dst_to_src: params.dst_to_src.to_array(),
            src_to_dst: params.src_to_dst.to_array(),
            coefficients: params.coefficients(),
            canvas: params.canvas,
            timings_ms: TimingsMs::default(),
        }
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), JobError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Run a job end to end: load, optionally convert to gray, estimate, warp,
/// save, and write the report if requested.
#[cfg(feature = "image")]
pub fn run_job(cfg: &RectifyJobConfig) -> Result<RectifyReport, JobError> {
    use crate::core::{build_resampling_params, default_destination};

    let t_total = Instant::now();

    let t0 = Instant::now();
    let mut img = load_image(&cfg.image_path)?;
    if cfg.gray_scale {
        img = to_gray_scale(&img);
    }
    let load_image_ms = t0.elapsed().as_millis() as u64;
    log::info!(
        "loaded {} ({}x{}) duration_ms={}",
        cfg.image_path,
        img.width(),
        img.height(),
        load_image_ms
    );

    let t0 = Instant::now();
    let destination = match cfg.destination {
        Some(dst) => dst,
        None => default_destination(img.width(), img.height())?,
    };
    let params = build_resampling_params(&cfg.corners, &destination)?;
    let estimate_ms = t0.elapsed().as_millis() as u64;
    log::info!(
        "estimated homography canvas={}x{} duration_ms={}",
        params.canvas.width,
        params.canvas.height,
        estimate_ms
    );

    let t0 = Instant::now();
    let rectified = warp_image(&img, &params, cfg.interpolation)?;
    let warp_ms = t0.elapsed().as_millis() as u64;
    log::info!(
        "resampled with {:?} duration_ms={}",
        cfg.interpolation,
        warp_ms
    );

    let output_path = cfg.output_path();
    let t0 = Instant::now();
    rectified
        .save(&output_path)
        .map_err(RectifyImageError::from)?;
    let save_ms = t0.elapsed().as_millis() as u64;
    log::info!("wrote rectified image to {}", output_path.display());

    let mut report = RectifyReport::new(
        cfg,
        &output_path,
        [img.width(), img.height()],
        destination,
        &params,
    );
    report.timings_ms = TimingsMs {
        load_image: load_image_ms,
        estimate: estimate_ms,
        warp: warp_ms,
        save_image: save_ms,
        total: t_total.elapsed().as_millis() as u64,
    };

    if let Some(path) = cfg.report_path() {
        report.write_json(&path)?;
        log::info!("wrote report JSON to {}", path.display());
    }

    Ok(report)
}
