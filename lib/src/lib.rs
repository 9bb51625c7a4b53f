/// Initialize logging with the given default level. Respects `RUST_LOG` overrides.
pub fn init_logging(default_level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(default_level)
        // reqwest's connection pool is chatty at debug level and drowns out the decode log
        .filter_module("hyper_util", log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

pub mod decoded;
pub mod envelope;
pub mod identity;
pub mod palette;
pub mod rle;
pub mod seal;
pub mod update;

pub use decoded::DecodedImage;
pub use identity::DeviceIdentity;
pub use update::{TruncatedImagePolicy, Update, UpdateError, decode_update};

/// Width and height, in pixels, of the images carried by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    /// The panel the update service renders for.
    pub const REFERENCE: Geometry = Geometry {
        width: 640,
        height: 384,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of packed bytes (four 2-bit pixels each) needed to cover every pixel.
    pub fn packed_len(&self) -> usize {
        self.pixel_count().div_ceil(4)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::REFERENCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_packed_len() {
        assert_eq!(Geometry::REFERENCE.pixel_count(), 245_760);
        assert_eq!(Geometry::REFERENCE.packed_len(), 61_440);
    }

    #[test]
    fn test_packed_len_rounds_up() {
        assert_eq!(Geometry::new(3, 3).packed_len(), 3);
        assert_eq!(Geometry::new(1, 1).packed_len(), 1);
        assert_eq!(Geometry::new(0, 10).packed_len(), 0);
    }
}
