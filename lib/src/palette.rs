//! Expansion of packed 2-bit palette indices into RGB pixels.

use image::{Rgb, RgbImage};

use crate::Geometry;

pub const BLACK: Rgb<u8> = Rgb([0x00, 0x00, 0x00]);
pub const ACCENT: Rgb<u8> = Rgb([0xFF, 0xFF, 0x00]);
pub const WHITE: Rgb<u8> = Rgb([0xFF, 0xFF, 0xFF]);

/// Index 3 is never produced by the service; it renders as background.
pub const PALETTE: [Rgb<u8>; 4] = [BLACK, ACCENT, WHITE, WHITE];

/// A packed byte whose four pixels are all white.
pub const BLANK: u8 = 0b1010_1010;

/// Split a packed byte into its four palette indices, least significant pair first.
pub fn unpack(byte: u8) -> [u8; 4] {
    [byte & 3, (byte >> 2) & 3, (byte >> 4) & 3, (byte >> 6) & 3]
}

pub fn color(index: u8) -> Rgb<u8> {
    PALETTE[(index & 3) as usize]
}

/// Expand packed indices into a `geometry`-sized image in row-major order.
/// Pixels beyond the end of `packed` are left white.
pub fn expand(packed: &[u8], geometry: Geometry) -> RgbImage {
    let width = geometry.width as usize;
    RgbImage::from_fn(geometry.width, geometry.height, |x, y| {
        let pixel = y as usize * width + x as usize;
        match packed.get(pixel / 4) {
            Some(&byte) => color(unpack(byte)[pixel % 4]),
            None => WHITE,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_order() {
        assert_eq!(unpack(0b00_01_10_00), [0, 2, 1, 0]);
        assert_eq!(unpack(BLANK), [2, 2, 2, 2]);
        assert_eq!(unpack(0xFF), [3, 3, 3, 3]);
    }

    #[test]
    fn test_reserved_index_is_white() {
        assert_eq!(color(3), WHITE);
    }

    #[test]
    fn test_expand_row_major() {
        // 4x2 image: first row black, accent, white, black; second row all white.
        let packed = [0b00_10_01_00, BLANK];
        let image = expand(&packed, Geometry::new(4, 2));
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(*image.get_pixel(0, 0), BLACK);
        assert_eq!(*image.get_pixel(1, 0), ACCENT);
        assert_eq!(*image.get_pixel(2, 0), WHITE);
        assert_eq!(*image.get_pixel(3, 0), BLACK);
        assert!(image.enumerate_rows().nth(1).unwrap().1.all(|(_, _, p)| *p == WHITE));
    }

    #[test]
    fn test_expand_pixel_count() {
        let geometry = Geometry::REFERENCE;
        let image = expand(&vec![0u8; geometry.packed_len()], geometry);
        assert_eq!(image.pixels().len(), geometry.pixel_count());
        assert!(image.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn test_expand_short_input_is_white() {
        let image = expand(&[0x00], Geometry::new(3, 3));
        assert_eq!(*image.get_pixel(0, 1), BLACK);
        assert_eq!(*image.get_pixel(1, 1), WHITE);
        assert_eq!(*image.get_pixel(2, 2), WHITE);
    }
}
