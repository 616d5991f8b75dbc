//! Resize and re-encode images.

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, Rgb, RgbImage};

use crate::config::{OutputFormat, RenderConfig};
use crate::metadata::set_png_dpi;

/// Decode `data`, fit it into the configured bounds and encode it in the
/// configured format with the configured DPI.
pub(crate) fn normalize(data: &[u8], config: &RenderConfig) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(data)?;
    let img = resize(img, config);
    encode(&img, config)
}

fn resize(img: DynamicImage, config: &RenderConfig) -> DynamicImage {
    let max_width = config.max_width.max(1);
    let max_height = config.max_height.max(1);
    let (width, height) = (img.width(), img.height());

    if config.preserve_aspect_ratio {
        // Only shrink
        if width <= max_width && height <= max_height {
            return img;
        }
        tracing::debug!(width, height, max_width, max_height, "shrinking image");
        img.resize(max_width, max_height, FilterType::Lanczos3)
    } else if (width, height) == (max_width, max_height) {
        img
    } else {
        img.resize_exact(max_width, max_height, FilterType::Lanczos3)
    }
}

fn encode(img: &DynamicImage, config: &RenderConfig) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    match config.output_format {
        OutputFormat::Png => {
            let compression = if config.optimize {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                compression,
                PngFilter::Adaptive,
            ))?;
            Ok(set_png_dpi(&buf, config.dpi))
        }
        OutputFormat::Jpeg => {
            let rgb = if img.color().has_alpha() {
                flatten_onto_white(img)
            } else {
                img.to_rgb8()
            };
            {
                let mut encoder =
                    JpegEncoder::new_with_quality(&mut buf, config.quality.clamp(1, 100));
                encoder.set_pixel_density(PixelDensity::dpi(dpi_u16(config.dpi)));
                encoder.encode_image(&rgb)?;
            }
            Ok(buf)
        }
    }
}

/// Composite every pixel over an opaque white background.
#[allow(clippy::cast_possible_truncation)]
fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

fn dpi_u16(dpi: u32) -> u16 {
    u16::try_from(dpi.max(1)).unwrap_or(u16::MAX)
}
