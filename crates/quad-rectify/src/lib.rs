//! High-level facade for the `quad-rectify` workspace.
//!
//! This crate provides:
//! - re-exports of the geometric core (`quad-rectify-core`)
//! - (feature `image`) helpers that rectify `image::DynamicImage` buffers
//! - JSON job configs and reports, and the `quad-rectify` command-line tool
//!   (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use quad_rectify::core::{Interpolation, Quadrilateral};
//! use quad_rectify::rectify::{load_image, rectify_image};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = load_image("sign.jpg")?;
//! let origin = Quadrilateral::from_array([[32.0, 41.0], [18.0, 260.0], [301.0, 233.0], [276.0, 22.0]])?;
//! let out = rectify_image(&img, &origin, None, Interpolation::Bicubic)?;
//! out.image.save("sign_rectified.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `quad_rectify::core`: quadrilaterals, homography estimation, resampling.
//! - `quad_rectify::io`: JSON job config, report, and `run_job`.
//! - `quad_rectify::rectify` (feature `image`): end-to-end helpers on `image` buffers.

pub use quad_rectify_core as core;

pub use quad_rectify_core::{
    build_resampling_params, estimate_homography, resampling_params_for_image, CanvasSize,
    Homography, Interpolation, Quadrilateral, RectifyError, ResamplingParams,
};

pub mod io;

#[cfg(feature = "image")]
pub mod rectify;
