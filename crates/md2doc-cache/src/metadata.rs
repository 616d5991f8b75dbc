//! Pixel dimensions and DPI metadata of encoded images.
//!
//! PNG and JPEG headers are read directly: the PNG `IHDR` and `pHYs` chunks
//! and the JPEG JFIF `APP0` segment. Other formats fall back to the `image`
//! crate for dimensions with no DPI.

use std::io::Cursor;

use flate2::Crc;

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const METERS_PER_INCH: f64 = 0.0254;

/// Dimensions and resolution of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Horizontal DPI, if the file declares one.
    pub dpi_x: Option<f64>,
    /// Vertical DPI, if the file declares one.
    pub dpi_y: Option<f64>,
}

impl ImageMetadata {
    /// Read metadata from encoded image bytes.
    #[must_use]
    pub fn read(data: &[u8]) -> Option<Self> {
        read_png(data)
            .or_else(|| read_jpeg(data))
            .or_else(|| read_generic(data))
    }

    /// Physical width in inches, using `fallback_dpi` when none is declared.
    #[must_use]
    pub fn width_inches(&self, fallback_dpi: f64) -> f64 {
        let dpi = self.dpi_x.filter(|d| *d > 0.0).unwrap_or(fallback_dpi);
        f64::from(self.width) / dpi
    }

    /// Physical height in inches, using `fallback_dpi` when none is declared.
    #[must_use]
    pub fn height_inches(&self, fallback_dpi: f64) -> f64 {
        let dpi = self.dpi_y.filter(|d| *d > 0.0).unwrap_or(fallback_dpi);
        f64::from(self.height) / dpi
    }
}

/// Extract width and height from PNG image data.
///
/// PNG format: 8-byte signature, then IHDR chunk with width/height at bytes 16-24.
#[must_use]
pub fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 24 || &data[0..8] != PNG_SIGNATURE {
        return None;
    }

    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}

fn read_png(data: &[u8]) -> Option<ImageMetadata> {
    let (width, height) = png_dimensions(data)?;
    let mut meta = ImageMetadata {
        width,
        height,
        dpi_x: None,
        dpi_y: None,
    };

    for (kind, body) in png_chunks(data) {
        match kind {
            b"pHYs" if body.len() == 9 => {
                // Unit 1 is pixels per meter; unit 0 is aspect ratio only.
                if body[8] == 1 {
                    let ppm_x = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                    let ppm_y = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
                    meta.dpi_x = Some(f64::from(ppm_x) * METERS_PER_INCH);
                    meta.dpi_y = Some(f64::from(ppm_y) * METERS_PER_INCH);
                }
                break;
            }
            b"IDAT" | b"IEND" => break,
            _ => {}
        }
    }
    Some(meta)
}

/// Iterate `(type, data)` pairs of PNG chunks.
fn png_chunks(data: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
    let mut offset = PNG_SIGNATURE.len();
    std::iter::from_fn(move || {
        let header = data.get(offset..offset + 8)?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let body = data.get(offset + 8..offset + 8 + len)?;
        let kind = &header[4..8];
        offset += 12 + len;
        Some((kind, body))
    })
}

/// Insert a `pHYs` chunk declaring `dpi` right after `IHDR`.
///
/// Any existing `pHYs` chunk is dropped. Returns the input unchanged if it is
/// not a PNG.
#[must_use]
pub fn set_png_dpi(data: &[u8], dpi: u32) -> Vec<u8> {
    // Signature (8) + IHDR length/type (8) + IHDR data (13) + CRC (4)
    const IHDR_END: usize = 33;
    if png_dimensions(data).is_none() || data.len() < IHDR_END {
        return data.to_vec();
    }

    let ppm = dots_per_meter(dpi);
    let mut body = Vec::with_capacity(9);
    body.extend_from_slice(&ppm.to_be_bytes());
    body.extend_from_slice(&ppm.to_be_bytes());
    body.push(1);

    let mut out = Vec::with_capacity(data.len() + 21);
    out.extend_from_slice(&data[..IHDR_END]);
    write_png_chunk(&mut out, b"pHYs", &body);

    let mut offset = IHDR_END;
    while let Some(header) = data.get(offset..offset + 8) {
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let end = (offset + 12 + len).min(data.len());
        if &header[4..8] != b"pHYs" {
            out.extend_from_slice(&data[offset..end]);
        }
        offset = end;
    }
    out
}

fn write_png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], body: &[u8]) {
    let len = u32::try_from(body.len()).unwrap_or(u32::MAX);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(body);
    out.extend_from_slice(&crc.sum().to_be_bytes());
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn dots_per_meter(dpi: u32) -> u32 {
    (f64::from(dpi) / METERS_PER_INCH).round() as u32
}

fn read_jpeg(data: &[u8]) -> Option<ImageMetadata> {
    if data.len() < 4 || data[0..2] != [0xFF, 0xD8] {
        return None;
    }
    let (width, height) = read_generic(data).map(|m| (m.width, m.height))?;
    let mut meta = ImageMetadata {
        width,
        height,
        dpi_x: None,
        dpi_y: None,
    };

    // APP0 JFIF: "JFIF\0", version (2), units (1), x density (2), y density (2)
    if data.get(2..4) == Some(&[0xFF, 0xE0][..]) && data.get(6..11) == Some(&b"JFIF\0"[..]) {
        let units = *data.get(13)?;
        let x = f64::from(u16::from_be_bytes([*data.get(14)?, *data.get(15)?]));
        let y = f64::from(u16::from_be_bytes([*data.get(16)?, *data.get(17)?]));
        let scale = match units {
            1 => Some(1.0),
            2 => Some(2.54),
            _ => None,
        };
        if let Some(scale) = scale {
            meta.dpi_x = Some(x * scale);
            meta.dpi_y = Some(y * scale);
        }
    }
    Some(meta)
}

fn read_generic(data: &[u8]) -> Option<ImageMetadata> {
    let (width, height) = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(ImageMetadata {
        width,
        height,
        dpi_x: None,
        dpi_y: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_png_dimensions() {
        let data = png_bytes(40, 30);
        assert_eq!(png_dimensions(&data), Some((40, 30)));
        assert_eq!(png_dimensions(b"not a png at all, definitely"), None);
        assert_eq!(png_dimensions(b"short"), None);
    }

    #[test]
    fn test_png_without_phys_has_no_dpi() {
        let meta = ImageMetadata::read(&png_bytes(10, 20)).unwrap();
        assert_eq!((meta.width, meta.height), (10, 20));
        assert_eq!(meta.dpi_x, None);
        assert!((meta.width_inches(96.0) - 10.0 / 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_png_dpi_roundtrip() {
        let data = set_png_dpi(&png_bytes(192, 96), 192);
        let meta = ImageMetadata::read(&data).unwrap();

        let dpi = meta.dpi_x.unwrap();
        assert!((dpi - 192.0).abs() < 0.1, "dpi was {dpi}");
        assert!((meta.width_inches(96.0) - 1.0).abs() < 0.01);

        // Still a decodable PNG
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.width(), 192);
    }

    #[test]
    fn test_set_png_dpi_replaces_existing_chunk() {
        let once = set_png_dpi(&png_bytes(8, 8), 96);
        let twice = set_png_dpi(&once, 300);
        assert_eq!(once.len(), twice.len());

        let dpi = ImageMetadata::read(&twice).unwrap().dpi_x.unwrap();
        assert!((dpi - 300.0).abs() < 0.1, "dpi was {dpi}");
    }

    #[test]
    fn test_set_png_dpi_ignores_non_png() {
        assert_eq!(set_png_dpi(b"GIF89a", 96), b"GIF89a".to_vec());
    }

    #[test]
    fn test_jpeg_density() {
        use image::codecs::jpeg::{JpegEncoder, PixelDensity};

        let img = RgbImage::new(150, 75);
        let mut buf = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
            encoder.set_pixel_density(PixelDensity::dpi(150));
            encoder.encode_image(&img).unwrap();
        }

        let meta = ImageMetadata::read(&buf).unwrap();
        assert_eq!((meta.width, meta.height), (150, 75));
        assert_eq!(meta.dpi_x, Some(150.0));
        assert!((meta.width_inches(96.0) - 1.0).abs() < 1e-9);
    }
}
