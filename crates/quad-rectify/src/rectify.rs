use crate::core::{
    rectify_view, resampling_params_for_image, ImageView, Interpolation, Quadrilateral,
    RectifyError, ResamplingParams,
};
use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageReader, RgbImage, RgbaImage};
use std::borrow::Cow;
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced when rectifying `image` crate buffers.
#[derive(thiserror::Error, Debug)]
pub enum RectifyImageError {
    #[error(transparent)]
    Rectify(#[from] RectifyError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("cannot build a {width}x{height} image with {channels} channel(s)")]
    InvalidBuffer {
        width: usize,
        height: usize,
        channels: usize,
    },
}

/// A rectified image together with the maps used to produce it.
#[derive(Clone, Debug)]
pub struct RectifiedImage {
    pub image: DynamicImage,
    pub params: ResamplingParams,
}

/// Decode an image from disk.
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage, RectifyImageError> {
    Ok(ImageReader::open(path)?.decode()?)
}

/// Convert to single-channel 8-bit luma.
pub fn to_gray_scale(img: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(img.to_luma8())
}

/// Borrow the pixels of `img` as interleaved 8-bit data.
///
/// 8-bit gray, gray+alpha, RGB and RGBA are used in place; any other layout
/// is converted to RGBA if it carries alpha, RGB otherwise.
fn pixels(img: &DynamicImage) -> (usize, Cow<'_, [u8]>) {
    match img {
        DynamicImage::ImageLuma8(b) => (1, Cow::Borrowed(b.as_raw().as_slice())),
        DynamicImage::ImageLumaA8(b) => (2, Cow::Borrowed(b.as_raw().as_slice())),
        DynamicImage::ImageRgb8(b) => (3, Cow::Borrowed(b.as_raw().as_slice())),
        DynamicImage::ImageRgba8(b) => (4, Cow::Borrowed(b.as_raw().as_slice())),
        other if other.color().has_alpha() => (4, Cow::Owned(other.to_rgba8().into_raw())),
        other => (3, Cow::Owned(other.to_rgb8().into_raw())),
    }
}

fn into_dynamic(
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
) -> Result<DynamicImage, RectifyImageError> {
    let invalid = RectifyImageError::InvalidBuffer {
        width,
        height,
        channels,
    };
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(invalid);
    };
    let img = match channels {
        1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        _ => None,
    };
    img.ok_or(invalid)
}

/// Resample `img` with previously estimated parameters.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, params),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn warp_image(
    img: &DynamicImage,
    params: &ResamplingParams,
    interpolation: Interpolation,
) -> Result<DynamicImage, RectifyImageError> {
    let (channels, data) = pixels(img);
    let view = ImageView::new(
        img.width() as usize,
        img.height() as usize,
        channels,
        &data,
    )?;
    let out = rectify_view(&view, params, interpolation);
    into_dynamic(out.width, out.height, out.channels, out.data)
}

/// Map the `origin` region of `img` onto `destination` (default: the full
/// frame of `img`) and resample it into a new image sized to the destination
/// bounding box.
pub fn rectify_image(
    img: &DynamicImage,
    origin: &Quadrilateral,
    destination: Option<&Quadrilateral>,
    interpolation: Interpolation,
) -> Result<RectifiedImage, RectifyImageError> {
    let params = resampling_params_for_image(origin, destination, img.width(), img.height())?;
    let image = warp_image(img, &params, interpolation)?;
    Ok(RectifiedImage { image, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, Luma, Rgb};

    fn quad(pts: [[f64; 2]; 4]) -> Quadrilateral {
        Quadrilateral::from_array(pts).expect("quad")
    }

    #[test]
    fn keeps_8bit_color_layouts() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([10, 20, 30])));
        let origin = quad([[0.0, 0.0], [0.0, 6.0], [8.0, 6.0], [8.0, 0.0]]);
        let out = rectify_image(&rgb, &origin, None, Interpolation::Bilinear).expect("rectify");
        assert_eq!(out.image.color(), ColorType::Rgb8);
        assert_eq!((out.image.width(), out.image.height()), (8, 6));
        assert_eq!(out.image.to_rgb8().get_pixel(3, 2), &Rgb([10, 20, 30]));
    }

    #[test]
    fn converts_wide_layouts_to_8bit() {
        let img = DynamicImage::new_rgb16(4, 4);
        let (channels, data) = pixels(&img);
        assert_eq!(channels, 3);
        assert_eq!(data.len(), 4 * 4 * 3);

        let img = DynamicImage::new_rgba32f(2, 2);
        assert_eq!(pixels(&img).0, 4);
    }

    #[test]
    fn gray_scale_conversion_is_single_channel() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([255, 255, 255])));
        let gray = to_gray_scale(&rgb);
        assert_eq!(gray.color(), ColorType::L8);
        assert_eq!(gray.to_luma8().get_pixel(1, 1), &Luma([255]));
    }

    #[test]
    fn explicit_destination_sets_output_size() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([90])));
        let origin = quad([[5.0, 5.0], [4.0, 25.0], [35.0, 27.0], [33.0, 3.0]]);
        let dst = quad([[0.0, 0.0], [0.0, 12.0], [20.0, 12.0], [20.0, 0.0]]);
        let out =
            rectify_image(&gray, &origin, Some(&dst), Interpolation::Bicubic).expect("rectify");
        assert_eq!((out.image.width(), out.image.height()), (20, 12));
        assert_eq!(out.image.to_luma8().get_pixel(10, 6), &Luma([90]));
    }

    #[test]
    fn degenerate_origin_surfaces_core_error() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        let origin = quad([[0.0, 0.0], [2.0, 2.0], [4.0, 4.0], [9.0, 0.0]]);
        let err = rectify_image(&gray, &origin, None, Interpolation::Bicubic).unwrap_err();
        assert!(matches!(
            err,
            RectifyImageError::Rectify(RectifyError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn invalid_channel_count_is_rejected() {
        assert!(matches!(
            into_dynamic(2, 2, 5, vec![0; 20]),
            Err(RectifyImageError::InvalidBuffer { channels: 5, .. })
        ));
    }
}
