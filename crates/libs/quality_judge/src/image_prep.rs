use common_types::PreparedImage;
use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, Resizer};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, Rgb, RgbImage, Rgba};
use std::io::Cursor;
use thiserror::Error;

pub const JPEG_QUALITY: u8 = 85;

#[derive(Error, Debug)]
pub enum ImagePrepError {
    #[error("could not read image data: {0}")]
    Io(#[from] std::io::Error),
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("image has no pixels")]
    Empty,
    #[error("resize buffer error: {0}")]
    Buffer(#[from] fast_image_resize::ImageBufferError),
    #[error("resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),
}

/// Decodes `bytes`, shrinks the longest side to `max_dimension` and re-encodes as JPEG.
/// Transparent areas become white. A `max_dimension` of 0 keeps the original size.
pub fn prepare_image(bytes: &[u8], max_dimension: u32) -> Result<PreparedImage, ImagePrepError> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(ImagePrepError::Empty);
    }

    let mut rgb = flatten_onto_white(img);
    let (target_w, target_h) = target_dimensions(width, height, max_dimension);
    if (target_w, target_h) != (width, height) {
        rgb = resize(rgb, target_w, target_h)?;
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(&rgb)?;

    Ok(PreparedImage {
        bytes: jpeg,
        mime_type: "image/jpeg",
        width: target_w,
        height: target_h,
    })
}

/// Size after fitting the longest side into `max_dimension`, keeping the aspect ratio.
#[must_use]
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if max_dimension == 0 || longest <= max_dimension {
        return (width, height);
    }
    let scale = |side: u32| {
        let scaled = (u64::from(side) * u64::from(max_dimension) + u64::from(longest) / 2)
            / u64::from(longest);
        (scaled as u32).max(1)
    };
    (scale(width), scale(height))
}

fn flatten_onto_white(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn resize(rgb: RgbImage, width: u32, height: u32) -> Result<RgbImage, ImagePrepError> {
    let (src_w, src_h) = rgb.dimensions();
    let src_image = Image::from_vec_u8(src_w, src_h, rgb.into_raw(), PixelType::U8x3)?;
    let mut dst_image = Image::new(width, height, PixelType::U8x3);

    let mut resizer = Resizer::new();
    resizer.resize(&src_image, &mut dst_image, None)?;

    RgbImage::from_raw(width, height, dst_image.into_vec()).ok_or(ImagePrepError::Empty)
}
