//! The `BITMAPINFOHEADER` family of headers and their channel masks.

use byteorder::{ByteOrder, LittleEndian};

use crate::{BitmapError, Result};

/// Size of `BITMAPINFOHEADER`, the base layout every supported header extends.
pub const INFO_HEADER_SIZE: u32 = 40;
/// Size of `BITMAPV2INFOHEADER` (adds RGB masks).
pub const V2_HEADER_SIZE: u32 = 52;
/// Size of `BITMAPV3INFOHEADER` (adds the alpha mask).
pub const V3_HEADER_SIZE: u32 = 56;
/// Size of `BITMAPV4HEADER`.
pub const V4_HEADER_SIZE: u32 = 108;
/// Size of `BITMAPV5HEADER`.
pub const V5_HEADER_SIZE: u32 = 124;

/// Uncompressed pixels with implied default masks.
pub const BI_RGB: u32 = 0;
/// Uncompressed pixels with explicit RGB masks.
pub const BI_BITFIELDS: u32 = 3;
/// Uncompressed pixels with explicit RGBA masks.
pub const BI_ALPHABITFIELDS: u32 = 6;

/// Bit masks locating each channel inside a 32-bit pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelMasks {
    /// Red channel mask.
    pub red: u32,
    /// Green channel mask.
    pub green: u32,
    /// Blue channel mask.
    pub blue: u32,
    /// Alpha channel mask. Zero means the image has no alpha channel.
    pub alpha: u32,
}

impl ChannelMasks {
    /// The layout implied by `BI_RGB`: B,G,R,A bytes in little-endian order.
    pub const DEFAULT: Self = Self {
        red: 0x00ff_0000,
        green: 0x0000_ff00,
        blue: 0x0000_00ff,
        alpha: 0xff00_0000,
    };

    /// Extract `[r, g, b, a]` from a little-endian pixel word.
    #[must_use]
    pub fn unpack(&self, pixel: u32) -> [u8; 4] {
        let alpha = if self.alpha == 0 {
            u8::MAX
        } else {
            channel(pixel, self.alpha)
        };
        [
            channel(pixel, self.red),
            channel(pixel, self.green),
            channel(pixel, self.blue),
            alpha,
        ]
    }
}

impl Default for ChannelMasks {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Scale the masked bits of `pixel` to an 8-bit channel value.
#[allow(clippy::cast_possible_truncation)]
fn channel(pixel: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 0;
    }
    let bits = mask.count_ones();
    let value = (pixel & mask) >> mask.trailing_zeros();
    match bits.cmp(&8) {
        std::cmp::Ordering::Equal => value as u8,
        std::cmp::Ordering::Greater => (value >> (bits - 8)) as u8,
        std::cmp::Ordering::Less => {
            let max = (1u32 << bits) - 1;
            ((value * 255 + max / 2) / max) as u8
        }
    }
}

/// Bytes per row for `width` pixels at `bit_count` bits, padded to 4 bytes.
///
/// Returns `None` if the computation overflows.
#[must_use]
pub fn row_stride(width: u32, bit_count: u16) -> Option<usize> {
    let bits = (width as usize).checked_mul(usize::from(bit_count))?;
    Some(bits.checked_add(31)? / 32 * 4)
}

/// A parsed `BITMAPINFOHEADER`, optionally extended to V2-V5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapHeader {
    /// Declared header size in bytes.
    pub size: u32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels; negative heights store rows top-down.
    pub height: i32,
    /// Colour planes, always 1.
    pub planes: u16,
    /// Bits per pixel.
    pub bit_count: u16,
    /// Compression mode (`BI_RGB`, `BI_BITFIELDS` or `BI_ALPHABITFIELDS`).
    pub compression: u32,
    /// Size of the pixel data in bytes; may be zero for `BI_RGB`.
    pub size_image: u32,
    /// Horizontal resolution in pixels per meter.
    pub x_pels_per_meter: i32,
    /// Vertical resolution in pixels per meter.
    pub y_pels_per_meter: i32,
    /// Colour table entries in use.
    pub clr_used: u32,
    /// Colour table entries required for display.
    pub clr_important: u32,
    /// Channel masks for 32-bit layouts; `None` means the defaults apply.
    pub masks: Option<ChannelMasks>,
}

impl BitmapHeader {
    /// Parse and validate a header at the start of `bytes`.
    ///
    /// Trailing mask words after a 40-byte header are consumed when the
    /// compression mode calls for them.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::Truncated`] if `bytes` ends inside the header,
    /// [`BitmapError::UnsupportedBitDepth`] for depths other than 24 and 32,
    /// and [`BitmapError::MalformedHeader`] for inconsistent fields.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, INFO_HEADER_SIZE as usize)?;

        let size = LittleEndian::read_u32(&bytes[0..4]);
        if !matches!(
            size,
            INFO_HEADER_SIZE | V2_HEADER_SIZE | V3_HEADER_SIZE | V4_HEADER_SIZE | V5_HEADER_SIZE
        ) {
            return Err(BitmapError::MalformedHeader(format!(
                "unrecognised header size {size}"
            )));
        }
        ensure_len(bytes, size as usize)?;

        let mut header = Self {
            size,
            width: LittleEndian::read_i32(&bytes[4..8]),
            height: LittleEndian::read_i32(&bytes[8..12]),
            planes: LittleEndian::read_u16(&bytes[12..14]),
            bit_count: LittleEndian::read_u16(&bytes[14..16]),
            compression: LittleEndian::read_u32(&bytes[16..20]),
            size_image: LittleEndian::read_u32(&bytes[20..24]),
            x_pels_per_meter: LittleEndian::read_i32(&bytes[24..28]),
            y_pels_per_meter: LittleEndian::read_i32(&bytes[28..32]),
            clr_used: LittleEndian::read_u32(&bytes[32..36]),
            clr_important: LittleEndian::read_u32(&bytes[36..40]),
            masks: None,
        };

        if header.width <= 0 {
            return Err(BitmapError::MalformedHeader(format!(
                "width must be positive, got {}",
                header.width
            )));
        }
        if header.height == 0 {
            return Err(BitmapError::MalformedHeader("height is zero".into()));
        }
        if header.planes != 1 {
            return Err(BitmapError::MalformedHeader(format!(
                "planes must be 1, got {}",
                header.planes
            )));
        }
        if !matches!(header.bit_count, 24 | 32) {
            return Err(BitmapError::UnsupportedBitDepth(header.bit_count));
        }

        match header.compression {
            BI_RGB => {}
            BI_BITFIELDS | BI_ALPHABITFIELDS if header.bit_count == 32 => {
                header.masks = Some(header.read_masks(bytes)?);
            }
            BI_BITFIELDS | BI_ALPHABITFIELDS => {
                return Err(BitmapError::MalformedHeader(format!(
                    "bit fields require 32 bits per pixel, got {}",
                    header.bit_count
                )));
            }
            other => {
                return Err(BitmapError::MalformedHeader(format!(
                    "unsupported compression {other}"
                )));
            }
        }

        Ok(header)
    }

    fn read_masks(&self, bytes: &[u8]) -> Result<ChannelMasks> {
        // Masks follow the base fields whether trailing or inside a V2+ header.
        let base = INFO_HEADER_SIZE as usize;
        let words = self.mask_words();
        ensure_len(bytes, base + words * 4)?;

        let word = |i: usize| LittleEndian::read_u32(&bytes[base + i * 4..base + i * 4 + 4]);
        let masks = ChannelMasks {
            red: word(0),
            green: word(1),
            blue: word(2),
            alpha: if words == 4 {
                word(3)
            } else {
                ChannelMasks::DEFAULT.alpha
            },
        };
        if masks.red == 0 || masks.green == 0 || masks.blue == 0 {
            return Err(BitmapError::MalformedHeader(format!(
                "colour masks must be non-zero, got {masks:?}"
            )));
        }
        Ok(masks)
    }

    /// Mask words stored after a bare 40-byte header.
    #[must_use]
    pub const fn trailing_mask_words(&self) -> usize {
        if self.size != INFO_HEADER_SIZE {
            return 0;
        }
        match self.compression {
            BI_BITFIELDS => 3,
            BI_ALPHABITFIELDS => 4,
            _ => 0,
        }
    }

    const fn mask_words(&self) -> usize {
        match self.size {
            INFO_HEADER_SIZE => self.trailing_mask_words(),
            V2_HEADER_SIZE => 3,
            _ => 4,
        }
    }

    /// Offset of the first pixel row from the start of the header.
    #[must_use]
    pub const fn pixel_offset(&self) -> usize {
        self.size as usize + self.trailing_mask_words() * 4 + self.clr_used as usize * 4
    }

    /// Whether rows are stored top-down (negative height).
    #[must_use]
    pub const fn is_top_down(&self) -> bool {
        self.height < 0
    }

    /// Number of pixel rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.height.unsigned_abs()
    }

    /// Bytes per stored row, including alignment padding.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::MalformedHeader`] if the width overflows.
    #[allow(clippy::cast_sign_loss)]
    pub fn stride(&self) -> Result<usize> {
        row_stride(self.width.max(0) as u32, self.bit_count)
            .ok_or_else(|| BitmapError::MalformedHeader("row stride overflows".into()))
    }

    /// Masks to apply when unpacking 32-bit pixels.
    #[must_use]
    pub fn channel_masks(&self) -> ChannelMasks {
        self.masks.unwrap_or_default()
    }

    /// Serialize the header, plus any mask words its layout carries.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let start = out.len();
        let mut base = [0u8; INFO_HEADER_SIZE as usize];
        LittleEndian::write_u32(&mut base[0..4], self.size);
        LittleEndian::write_i32(&mut base[4..8], self.width);
        LittleEndian::write_i32(&mut base[8..12], self.height);
        LittleEndian::write_u16(&mut base[12..14], self.planes);
        LittleEndian::write_u16(&mut base[14..16], self.bit_count);
        LittleEndian::write_u32(&mut base[16..20], self.compression);
        LittleEndian::write_u32(&mut base[20..24], self.size_image);
        LittleEndian::write_i32(&mut base[24..28], self.x_pels_per_meter);
        LittleEndian::write_i32(&mut base[28..32], self.y_pels_per_meter);
        LittleEndian::write_u32(&mut base[32..36], self.clr_used);
        LittleEndian::write_u32(&mut base[36..40], self.clr_important);
        out.extend_from_slice(&base);

        let masks = self.channel_masks();
        let words = self.mask_words();
        for mask in [masks.red, masks.green, masks.blue, masks.alpha]
            .into_iter()
            .take(words)
        {
            out.extend_from_slice(&mask.to_le_bytes());
        }
        // V4/V5 colour space fields stay zeroed.
        let header_end = start + self.size as usize;
        if out.len() < header_end {
            out.resize(header_end, 0);
        }
    }
}

fn ensure_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(BitmapError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_header(bit_count: u16, compression: u32) -> BitmapHeader {
        BitmapHeader {
            size: INFO_HEADER_SIZE,
            width: 3,
            height: 2,
            planes: 1,
            bit_count,
            compression,
            size_image: 0,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            clr_used: 0,
            clr_important: 0,
            masks: None,
        }
    }

    #[test]
    fn parses_what_it_writes() {
        let header = info_header(32, BI_RGB);
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        assert_eq!(bytes.len(), 40);
        assert_eq!(BitmapHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn short_buffer_is_truncated() {
        let err = BitmapHeader::parse(&[40, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            BitmapError::Truncated {
                expected: 40,
                actual: 4
            }
        );
    }

    #[test]
    fn rejects_core_header() {
        let mut bytes = Vec::new();
        info_header(24, BI_RGB).write_to(&mut bytes);
        bytes[0] = 12;
        assert!(matches!(
            BitmapHeader::parse(&bytes),
            Err(BitmapError::MalformedHeader(_))
        ));
    }

    #[test]
    fn rejects_other_bit_depths() {
        let mut bytes = Vec::new();
        info_header(8, BI_RGB).write_to(&mut bytes);
        assert_eq!(
            BitmapHeader::parse(&bytes),
            Err(BitmapError::UnsupportedBitDepth(8))
        );
    }

    #[test]
    fn reads_trailing_bitfield_masks() {
        let mut header = info_header(32, BI_BITFIELDS);
        header.masks = Some(ChannelMasks {
            red: 0x0000_00ff,
            green: 0x0000_ff00,
            blue: 0x00ff_0000,
            alpha: ChannelMasks::DEFAULT.alpha,
        });
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        assert_eq!(bytes.len(), 52);
        assert_eq!(header.pixel_offset(), 52);
        assert_eq!(BitmapHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn reads_masks_inside_v5_header() {
        let mut header = info_header(32, BI_BITFIELDS);
        header.size = V5_HEADER_SIZE;
        header.masks = Some(ChannelMasks::DEFAULT);
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        assert_eq!(bytes.len(), 124);
        assert_eq!(header.pixel_offset(), 124);
        assert_eq!(BitmapHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn zero_colour_mask_is_malformed() {
        let mut header = info_header(32, BI_BITFIELDS);
        header.masks = Some(ChannelMasks {
            red: 0,
            ..ChannelMasks::DEFAULT
        });
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        assert!(matches!(
            BitmapHeader::parse(&bytes),
            Err(BitmapError::MalformedHeader(_))
        ));
    }

    #[test]
    fn narrow_masks_scale_to_full_range() {
        // 5-6-5 style masks packed into a 32-bit word.
        let masks = ChannelMasks {
            red: 0xf800,
            green: 0x07e0,
            blue: 0x001f,
            alpha: 0,
        };
        assert_eq!(masks.unpack(0xffff), [255, 255, 255, 255]);
        assert_eq!(masks.unpack(0x0000), [0, 0, 0, 255]);
    }

    #[test]
    fn stride_is_word_aligned() {
        assert_eq!(row_stride(1, 24), Some(4));
        assert_eq!(row_stride(2, 24), Some(8));
        assert_eq!(row_stride(4, 24), Some(12));
        assert_eq!(row_stride(3, 32), Some(12));
    }
}
