use crate::{BitmapError, Result};

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest width or height a DIB header can carry.
pub const MAX_DIMENSION: u32 = i32::MAX.unsigned_abs();

/// Largest pixel buffer whose 32-bit DIB size fits the header's `biSizeImage`.
pub const MAX_BYTES: usize = u32::MAX as usize;

/// A portable RGBA image: top-down rows, no padding, 8 bits per channel.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Wrap an RGBA buffer of `width * height * 4` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::InvalidPixmap`] if either dimension is zero,
    /// a dimension exceeds [`MAX_DIMENSION`], the buffer would exceed
    /// [`MAX_BYTES`], or the buffer length does not match the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BitmapError::InvalidPixmap(format!(
                "dimensions must be non-zero, got {width}x{height}"
            )));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(BitmapError::InvalidPixmap(format!(
                "{width}x{height} exceeds the {MAX_DIMENSION} pixel limit"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| {
                BitmapError::InvalidPixmap(format!("{width}x{height} overflows the address space"))
            })?;
        if expected > MAX_BYTES {
            return Err(BitmapError::InvalidPixmap(format!(
                "{width}x{height} needs {expected} bytes, over the {MAX_BYTES} byte limit"
            )));
        }
        if data.len() != expected {
            return Err(BitmapError::InvalidPixmap(format!(
                "{width}x{height} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major and top-down.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the pixmap and return its RGBA bytes.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// RGBA bytes of row `y`, counted from the top.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// The `[r, g, b, a]` value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = x as usize * BYTES_PER_PIXEL;
        let row = self.row(y);
        [row[offset], row[offset + 1], row[offset + 2], row[offset + 3]]
    }
}

impl std::fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pixmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = Pixmap::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, BitmapError::InvalidPixmap(_)));
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(Pixmap::new(0, 4, Vec::new()).is_err());
        assert!(Pixmap::new(4, 0, Vec::new()).is_err());
    }

    #[test]
    fn rejects_sizes_a_header_cannot_describe() {
        let err = Pixmap::new(MAX_DIMENSION + 1, 1, Vec::new()).unwrap_err();
        assert!(matches!(err, BitmapError::InvalidPixmap(msg) if msg.contains("pixel limit")));

        let err = Pixmap::new(1 << 16, 1 << 14, Vec::new()).unwrap_err();
        assert!(matches!(err, BitmapError::InvalidPixmap(msg) if msg.contains("byte limit")));
    }

    #[test]
    fn indexes_rows_top_down() {
        let data = (0u8..16).collect();
        let pixmap = Pixmap::new(2, 2, data).unwrap();
        assert_eq!(pixmap.row(1), &[8, 9, 10, 11, 12, 13, 14, 15]);
        assert_eq!(pixmap.pixel(1, 0), [4, 5, 6, 7]);
    }
}
