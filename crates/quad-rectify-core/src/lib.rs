//! Four-point homography estimation and perspective resampling.
//!
//! Given the four corners of a region in a source image (a photographed sign
//! or document) and the four corners it should occupy in the output, this
//! crate estimates the planar homography between them with the normalized
//! linear DLT and resamples the source by inverse mapping.
//!
//! The crate is purely geometric and has no dependency on an image codec;
//! images are exchanged as interleaved 8-bit buffers ([`ImageView`],
//! [`ImageBuf`]).
//!
//! ```
//! use quad_rectify_core::{resampling_params_for_image, Quadrilateral};
//!
//! let origin = Quadrilateral::from_array([[10.0, 10.0], [10.0, 110.0], [110.0, 110.0], [110.0, 10.0]])?;
//! let params = resampling_params_for_image(&origin, None, 200, 200)?;
//! assert_eq!((params.canvas.width, params.canvas.height), (200, 200));
//! # Ok::<(), quad_rectify_core::RectifyError>(())
//! ```

mod error;
mod homography;
mod image;
mod logger;
mod normalize;
mod quad;
mod resample;
mod warp;

pub use error::RectifyError;
pub use homography::{estimate_homography, Homography};
pub use image::{
    sample, sample_bicubic, sample_bilinear, sample_nearest, ImageBuf, ImageView, Interpolation,
};
pub use normalize::{conditioning_transform, normalize_points, SCALE_EPSILON};
pub use quad::Quadrilateral;
pub use resample::{
    build_resampling_params, default_destination, resampling_params_for_image, CanvasSize,
    ResamplingParams,
};
pub use warp::{rectify_view, warp_perspective, FILL_VALUE};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
