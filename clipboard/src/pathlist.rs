//! File-path list marshalling.
//!
//! On the broker boundary a path list is a JSON array of strings. Windows
//! stores lists natively as a `DROPFILES` structure followed by a
//! double-NUL-terminated string list, handled by [`to_drop_files`] and
//! [`from_drop_files`].

use byteorder::{ByteOrder, LittleEndian};

use crate::{ClipboardError, Result};

/// Size of the `DROPFILES` header.
pub const DROP_FILES_HEADER_SIZE: usize = 20;

/// Encode paths as the wire JSON array. An empty list encodes as no bytes.
#[must_use]
pub fn encode<S: AsRef<str>>(paths: &[S]) -> Vec<u8> {
    if paths.is_empty() {
        return Vec::new();
    }
    let array = paths
        .iter()
        .map(|path| serde_json::Value::from(path.as_ref()))
        .collect::<Vec<_>>();
    serde_json::Value::Array(array).to_string().into_bytes()
}

/// Decode the wire JSON array. Empty or blank input decodes as an empty list.
///
/// # Errors
///
/// Returns [`ClipboardError::PathList`] if the bytes are not a JSON array of
/// strings.
pub fn decode(bytes: &[u8]) -> Result<Vec<String>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes).map_err(|err| ClipboardError::PathList(err.to_string()))
}

/// Build a wide-character `DROPFILES` block for `paths`.
#[must_use]
pub fn to_drop_files<S: AsRef<str>>(paths: &[S]) -> Vec<u8> {
    let mut out = vec![0u8; DROP_FILES_HEADER_SIZE];
    LittleEndian::write_u32(&mut out[0..4], DROP_FILES_HEADER_SIZE as u32);
    // pt.x, pt.y and fNC stay zero
    LittleEndian::write_u32(&mut out[16..20], 1);

    for path in paths {
        for unit in path.as_ref().encode_utf16().chain(Some(0)) {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    }
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Parse a `DROPFILES` block into paths.
///
/// # Errors
///
/// Returns [`ClipboardError::PathList`] if the header is short, the file
/// offset points outside the block, or the list is not terminated.
pub fn from_drop_files(bytes: &[u8]) -> Result<Vec<String>> {
    if bytes.len() < DROP_FILES_HEADER_SIZE {
        return Err(ClipboardError::PathList(format!(
            "DROPFILES header needs {DROP_FILES_HEADER_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    let offset = LittleEndian::read_u32(&bytes[0..4]) as usize;
    let wide = LittleEndian::read_u32(&bytes[16..20]) != 0;
    if offset < DROP_FILES_HEADER_SIZE || offset > bytes.len() {
        return Err(ClipboardError::PathList(format!(
            "file list offset {offset} outside block of {} bytes",
            bytes.len()
        )));
    }
    let list = &bytes[offset..];

    if wide {
        let units = list
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .collect::<Vec<_>>();
        split_list(&units, |path| {
            String::from_utf16(path).map_err(|err| ClipboardError::PathList(err.to_string()))
        })
    } else {
        split_list(list, |path| Ok(String::from_utf8_lossy(path).into_owned()))
    }
}

/// Split a double-NUL-terminated list of NUL-terminated strings.
fn split_list<T, F>(units: &[T], mut convert: F) -> Result<Vec<String>>
where
    T: Copy + Default + PartialEq,
    F: FnMut(&[T]) -> Result<String>,
{
    let nul = T::default();
    let mut paths = Vec::new();
    let mut rest = units;
    loop {
        let Some(end) = rest.iter().position(|unit| *unit == nul) else {
            return Err(ClipboardError::PathList("file list is not terminated".into()));
        };
        if end == 0 {
            return Ok(paths);
        }
        paths.push(convert(&rest[..end])?);
        rest = &rest[end + 1..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_is_a_json_array() {
        let bytes = encode(&["/tmp/a.txt", "/tmp/b c.txt"]);
        assert_eq!(bytes, br#"["/tmp/a.txt","/tmp/b c.txt"]"#);
        assert_eq!(decode(&bytes).unwrap(), vec!["/tmp/a.txt", "/tmp/b c.txt"]);
    }

    #[test]
    fn empty_lists_have_empty_wire() {
        assert!(encode::<&str>(&[]).is_empty());
        assert!(decode(b"").unwrap().is_empty());
        assert!(decode(b"[]").unwrap().is_empty());
    }

    #[test]
    fn keeps_order_and_duplicates() {
        let paths = ["b", "a", "b"];
        assert_eq!(decode(&encode(&paths)).unwrap(), paths);
    }

    #[test]
    fn rejects_non_string_arrays() {
        assert!(matches!(decode(b"[1, 2]"), Err(ClipboardError::PathList(_))));
        assert!(matches!(decode(b"{\"a\":1}"), Err(ClipboardError::PathList(_))));
    }

    #[test]
    fn drop_files_layout() {
        let block = to_drop_files(&["C:\\a"]);
        assert_eq!(LittleEndian::read_u32(&block[0..4]), 20);
        assert_eq!(LittleEndian::read_u32(&block[16..20]), 1);
        // "C:\a" + NUL + final NUL, two bytes each
        assert_eq!(block.len(), 20 + (4 + 1 + 1) * 2);
        assert_eq!(&block[20..22], &[b'C', 0]);
        assert_eq!(&block[block.len() - 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn drop_files_round_trip() {
        let paths = ["C:\\Users\\me\\naïve.txt", "D:\\日本語\\file"];
        assert_eq!(from_drop_files(&to_drop_files(&paths)).unwrap(), paths);
        assert!(from_drop_files(&to_drop_files::<&str>(&[])).unwrap().is_empty());
    }

    #[test]
    fn reads_ansi_drop_files() {
        let mut block = vec![0u8; DROP_FILES_HEADER_SIZE];
        block[0] = 20;
        block.extend_from_slice(b"C:\\one\0C:\\two\0\0");
        assert_eq!(from_drop_files(&block).unwrap(), ["C:\\one", "C:\\two"]);
    }

    #[test]
    fn rejects_truncated_drop_files() {
        assert!(from_drop_files(&[20, 0, 0]).is_err());

        let block = to_drop_files(&["C:\\a"]);
        assert!(from_drop_files(&block[..block.len() - 2]).is_err());
        assert!(from_drop_files(&block[..24]).is_err());

        let mut bad_offset = block;
        bad_offset[0] = 200;
        assert!(from_drop_files(&bad_offset).is_err());
    }
}
