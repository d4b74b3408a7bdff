//! PNG interchange for image content at the broker boundary.

use std::io::Cursor;

use clipkit_bitmap::Pixmap;
use image::{ColorType, ImageFormat};

use crate::{ClipboardError, Result};

/// Decode PNG bytes into an RGBA pixmap.
///
/// # Errors
///
/// Returns [`ClipboardError::Image`] if `bytes` is not a decodable PNG.
pub fn decode(bytes: &[u8]) -> Result<Pixmap> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|err| ClipboardError::Image(err.to_string()))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    Ok(Pixmap::new(width, height, image.into_raw())?)
}

/// Encode a pixmap as PNG.
///
/// # Errors
///
/// Returns [`ClipboardError::Image`] if the encoder fails.
pub fn encode(pixmap: &Pixmap) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image::write_buffer_with_format(
        &mut out,
        pixmap.data(),
        pixmap.width(),
        pixmap.height(),
        ColorType::Rgba8,
        ImageFormat::Png,
    )
    .map_err(|err| ClipboardError::Image(err.to_string()))?;
    Ok(out.into_inner())
}

/// Convert any supported container (PNG, TIFF, BMP) to PNG.
///
/// PNG input is returned unchanged.
///
/// # Errors
///
/// Returns [`ClipboardError::Image`] if the container cannot be decoded.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok(bytes.to_vec()),
        _ => {
            let image = image::load_from_memory(bytes)
                .map_err(|err| ClipboardError::Image(err.to_string()))?
                .into_rgba8();
            let (width, height) = image.dimensions();
            encode(&Pixmap::new(width, height, image.into_raw())?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Pixmap {
        let data = [[255, 0, 0, 255], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 255, 255]].concat();
        Pixmap::new(2, 2, data).unwrap()
    }

    #[test]
    fn round_trips_through_png() {
        let pixmap = checker();
        let png = encode(&pixmap).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(decode(&png).unwrap(), pixmap);
    }

    #[test]
    fn png_passes_through_normalize() {
        let png = encode(&checker()).unwrap();
        assert_eq!(normalize(&png).unwrap(), png);
    }

    #[test]
    fn bmp_normalizes_to_png() {
        let data = [[255, 0, 0, 255], [0, 255, 0, 255]].concat();
        let pixmap = Pixmap::new(1, 2, data).unwrap();
        let (_, dib) = clipkit_bitmap::encode(&pixmap);
        let bmp = clipkit_bitmap::file::wrap(&dib).unwrap();
        let png = normalize(&bmp).unwrap();
        assert_eq!(decode(&png).unwrap(), pixmap);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode(b"definitely not a png"),
            Err(ClipboardError::Image(_))
        ));
    }
}
