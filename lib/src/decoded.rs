use image::RgbImage;

use crate::{Geometry, palette};

/// One fully decoded image, still in packed 2-bit form. Kept packed so that
/// comparing the shown and requested images stays cheap; expand with
/// [`DecodedImage::to_rgb`] when it is time to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    geometry: Geometry,
    packed: Vec<u8>,
}

impl DecodedImage {
    /// Wrap packed pixel data, padding with white up to `geometry.packed_len()`
    /// and dropping anything beyond it.
    pub fn new(geometry: Geometry, mut packed: Vec<u8>) -> Self {
        packed.resize(geometry.packed_len(), palette::BLANK);
        Self { geometry, packed }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn packed(&self) -> &[u8] {
        &self.packed
    }

    pub fn to_rgb(&self) -> RgbImage {
        palette::expand(&self.packed, self.geometry)
    }
}
