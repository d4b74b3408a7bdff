//! # Clipkit Bitmap
//!
//! Device-independent bitmap (DIB) codec used by the clipboard broker.
//!
//! A DIB is a `BITMAPINFOHEADER` (or one of its V2-V5 extensions) followed by
//! optional mask words and the pixel rows. Rows are padded to 4-byte
//! boundaries and stored bottom-up unless the header height is negative.
//!
//! [`decode`] accepts 24-bit and 32-bit layouts with `BI_RGB`, `BI_BITFIELDS`
//! and `BI_ALPHABITFIELDS` compression. [`encode`] always produces a 40-byte
//! header, 32 bits per pixel, bottom-up rows.
//!
//! ```
//! use clipkit_bitmap::Pixmap;
//!
//! let pixmap = Pixmap::new(1, 1, vec![255, 0, 0, 255])?;
//! let (_, dib) = clipkit_bitmap::encode(&pixmap);
//! assert_eq!(clipkit_bitmap::decode(&dib)?, pixmap);
//! # Ok::<(), clipkit_bitmap::BitmapError>(())
//! ```

mod error;
pub mod file;
mod header;
mod pixmap;

pub use error::{BitmapError, Result};
pub use header::{
    BI_ALPHABITFIELDS, BI_BITFIELDS, BI_RGB, BitmapHeader, ChannelMasks, INFO_HEADER_SIZE,
    V4_HEADER_SIZE, V5_HEADER_SIZE, row_stride,
};
pub use pixmap::{BYTES_PER_PIXEL, MAX_BYTES, MAX_DIMENSION, Pixmap};

use byteorder::{ByteOrder, LittleEndian};

/// Pixel layouts [`encode_with`] can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// 24 bits per pixel, B,G,R, alpha dropped.
    Bgr24,
    /// 32 bits per pixel, B,G,R,A.
    #[default]
    Bgra32,
}

impl BitDepth {
    const fn bits(self) -> u16 {
        match self {
            Self::Bgr24 => 24,
            Self::Bgra32 => 32,
        }
    }
}

/// Decode a DIB into an RGBA pixmap.
///
/// # Errors
///
/// Returns an error if the header is malformed, uses an unsupported bit
/// depth, or the buffer is shorter than the rows the header declares.
pub fn decode(bytes: &[u8]) -> Result<Pixmap> {
    let header = BitmapHeader::parse(bytes)?;
    let offset = header.pixel_offset();
    let pixels = bytes.get(offset..).ok_or(BitmapError::Truncated {
        expected: offset,
        actual: bytes.len(),
    })?;
    decode_pixels(&header, pixels)
}

/// Decode pixel rows laid out as `header` describes.
///
/// # Errors
///
/// Returns [`BitmapError::Truncated`] if `pixels` is shorter than
/// `stride * rows`.
#[allow(clippy::cast_sign_loss)]
pub fn decode_pixels(header: &BitmapHeader, pixels: &[u8]) -> Result<Pixmap> {
    let width = header.width.max(0) as u32;
    let height = header.rows();
    let stride = header.stride()?;
    let expected = stride
        .checked_mul(height as usize)
        .ok_or_else(|| BitmapError::MalformedHeader("image size overflows".into()))?;
    if pixels.len() < expected {
        return Err(BitmapError::Truncated {
            expected,
            actual: pixels.len(),
        });
    }

    let masks = header.channel_masks();
    let mut data = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
    for y in 0..height as usize {
        let source = if header.is_top_down() {
            y
        } else {
            height as usize - 1 - y
        };
        let row = &pixels[source * stride..source * stride + stride];
        match header.bit_count {
            24 => {
                for bgr in row.chunks_exact(3).take(width as usize) {
                    data.extend_from_slice(&[bgr[2], bgr[1], bgr[0], u8::MAX]);
                }
            }
            _ => {
                for word in row.chunks_exact(4).take(width as usize) {
                    data.extend_from_slice(&masks.unpack(LittleEndian::read_u32(word)));
                }
            }
        }
    }

    Pixmap::new(width, height, data)
}

/// Encode a pixmap as a 32-bit bottom-up DIB.
///
/// Returns the header alongside the serialized bitmap (header followed by
/// pixel rows).
#[must_use]
pub fn encode(pixmap: &Pixmap) -> (BitmapHeader, Vec<u8>) {
    encode_with(pixmap, BitDepth::Bgra32)
}

/// Encode a pixmap as a bottom-up DIB with the given pixel layout.
///
/// The header fields cannot truncate: [`Pixmap`] keeps both dimensions within
/// [`MAX_DIMENSION`] and the 32-bit image size within [`MAX_BYTES`], and a
/// 24-bit image is never larger.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn encode_with(pixmap: &Pixmap, depth: BitDepth) -> (BitmapHeader, Vec<u8>) {
    let bits = depth.bits();
    // Pixmap::new bounds width * height * 4, so the stride cannot overflow.
    let stride = row_stride(pixmap.width(), bits).unwrap_or(0);
    let size_image = stride * pixmap.height() as usize;

    let header = BitmapHeader {
        size: INFO_HEADER_SIZE,
        width: pixmap.width() as i32,
        height: pixmap.height() as i32,
        planes: 1,
        bit_count: bits,
        compression: BI_RGB,
        size_image: size_image as u32,
        x_pels_per_meter: 0,
        y_pels_per_meter: 0,
        clr_used: 0,
        clr_important: 0,
        masks: match depth {
            BitDepth::Bgra32 => Some(ChannelMasks::DEFAULT),
            BitDepth::Bgr24 => None,
        },
    };

    let mut out = Vec::with_capacity(INFO_HEADER_SIZE as usize + size_image);
    header.write_to(&mut out);
    for y in (0..pixmap.height()).rev() {
        let start = out.len();
        for rgba in pixmap.row(y).chunks_exact(BYTES_PER_PIXEL) {
            out.extend_from_slice(&[rgba[2], rgba[1], rgba[0]]);
            if depth == BitDepth::Bgra32 {
                out.push(rgba[3]);
            }
        }
        out.resize(start + stride, 0);
    }

    (header, out)
}
