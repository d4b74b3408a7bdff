//! `.bmp` file framing around a DIB.
//!
//! A BMP file is a 14-byte `BITMAPFILEHEADER` followed by the DIB. Some
//! clipboard owners (and most image viewers) exchange bitmaps this way.

use byteorder::{ByteOrder, LittleEndian};

use crate::{BitmapError, BitmapHeader, Result};

/// Size of `BITMAPFILEHEADER`.
pub const FILE_HEADER_SIZE: usize = 14;

const MAGIC: &[u8; 2] = b"BM";

/// Prefix a DIB with a `BITMAPFILEHEADER`.
///
/// # Errors
///
/// Returns an error if `dib` does not start with a valid header, or if the
/// resulting file would exceed 4 GiB.
pub fn wrap(dib: &[u8]) -> Result<Vec<u8>> {
    let header = BitmapHeader::parse(dib)?;
    let too_large = || BitmapError::MalformedHeader("bitmap exceeds 4 GiB".into());
    let file_size = u32::try_from(FILE_HEADER_SIZE + dib.len()).map_err(|_| too_large())?;
    let offset = u32::try_from(FILE_HEADER_SIZE + header.pixel_offset()).map_err(|_| too_large())?;

    let mut out = Vec::with_capacity(FILE_HEADER_SIZE + dib.len());
    out.extend_from_slice(MAGIC);
    let mut fields = [0u8; 12];
    LittleEndian::write_u32(&mut fields[0..4], file_size);
    // bytes 4..8 are reserved
    LittleEndian::write_u32(&mut fields[8..12], offset);
    out.extend_from_slice(&fields);
    out.extend_from_slice(dib);
    Ok(out)
}

/// Whether `bytes` start with the `BM` file signature. A bare DIB never does:
/// its first word is the info header size.
#[must_use]
pub fn is_framed(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}

/// Strip the `BITMAPFILEHEADER` from a `.bmp` file, returning the DIB.
///
/// # Errors
///
/// Returns [`BitmapError::MalformedHeader`] if the magic is missing and
/// [`BitmapError::Truncated`] if the file is shorter than its header claims.
pub fn unwrap(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < FILE_HEADER_SIZE {
        return Err(BitmapError::Truncated {
            expected: FILE_HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    if &bytes[0..2] != MAGIC {
        return Err(BitmapError::MalformedHeader("missing BM signature".into()));
    }
    let declared = LittleEndian::read_u32(&bytes[2..6]) as usize;
    if declared > bytes.len() {
        return Err(BitmapError::Truncated {
            expected: declared,
            actual: bytes.len(),
        });
    }
    Ok(&bytes[FILE_HEADER_SIZE..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pixmap, decode, encode};

    #[test]
    fn wraps_and_unwraps() {
        let pixmap = Pixmap::new(1, 2, vec![1, 2, 3, 255, 4, 5, 6, 255]).unwrap();
        let (_, dib) = encode(&pixmap);
        let file = wrap(&dib).unwrap();

        assert_eq!(&file[0..2], b"BM");
        assert!(is_framed(&file));
        assert!(!is_framed(&dib));
        assert_eq!(LittleEndian::read_u32(&file[2..6]) as usize, file.len());
        assert_eq!(LittleEndian::read_u32(&file[10..14]), 54);
        assert_eq!(decode(unwrap(&file).unwrap()).unwrap(), pixmap);
    }

    #[test]
    fn rejects_foreign_magic() {
        let err = unwrap(b"PK\x03\x04 not a bitmap").unwrap_err();
        assert!(matches!(err, BitmapError::MalformedHeader(_)));
    }
}
