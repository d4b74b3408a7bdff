//! Codec properties over arbitrary pixmaps.

use byteorder::{ByteOrder, LittleEndian};
use clipkit_bitmap::{BitDepth, Pixmap, decode, encode, encode_with};
use proptest::prelude::*;

fn pixmaps() -> impl Strategy<Value = Pixmap> {
    (1u32..=17, 1u32..=9).prop_flat_map(|(width, height)| {
        proptest::collection::vec(any::<u8>(), (width * height * 4) as usize)
            .prop_map(move |data| Pixmap::new(width, height, data).unwrap())
    })
}

fn opaque(pixmap: &Pixmap) -> Pixmap {
    let mut data = pixmap.data().to_vec();
    for pixel in data.chunks_exact_mut(4) {
        pixel[3] = u8::MAX;
    }
    Pixmap::new(pixmap.width(), pixmap.height(), data).unwrap()
}

/// Reverse the stored rows and negate the height.
fn top_down(dib: &[u8], stride: usize) -> Vec<u8> {
    let (header, rows) = dib.split_at(40);
    let mut flipped = header.to_vec();
    for row in rows.chunks_exact(stride).rev() {
        flipped.extend_from_slice(row);
    }
    let height = LittleEndian::read_i32(&flipped[8..12]);
    LittleEndian::write_i32(&mut flipped[8..12], -height);
    flipped
}

proptest! {
    #[test]
    fn bgra_round_trips(pixmap in pixmaps()) {
        let (_, dib) = encode(&pixmap);
        prop_assert_eq!(decode(&dib).unwrap(), pixmap);
    }

    #[test]
    fn bgr_round_trips_opaque(pixmap in pixmaps()) {
        let (header, dib) = encode_with(&pixmap, BitDepth::Bgr24);
        prop_assert_eq!(header.stride().unwrap() % 4, 0);
        prop_assert_eq!(decode(&dib).unwrap(), opaque(&pixmap));
    }

    #[test]
    fn row_order_follows_height_sign(pixmap in pixmaps(), bgr in any::<bool>()) {
        let depth = if bgr { BitDepth::Bgr24 } else { BitDepth::Bgra32 };
        let (header, dib) = encode_with(&pixmap, depth);
        let flipped = top_down(&dib, header.stride().unwrap());

        prop_assert_eq!(decode(&flipped).unwrap(), decode(&dib).unwrap());
    }
}
