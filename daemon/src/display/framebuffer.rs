use std::path::PathBuf;

use async_trait::async_trait;
use image::RgbImage;

use crate::display::{Dimensions, DisplayDriver, blank_canvas};
use crate::error::StatusPanelError;

/// Linux framebuffer device taking little-endian RGB565 pixels.
pub struct FramebufferDisplay {
    path: PathBuf,
    resolution: Dimensions,
    staged: Option<RgbImage>,
}

impl FramebufferDisplay {
    pub fn new(path: PathBuf, resolution: Dimensions) -> Self {
        Self {
            path,
            resolution,
            staged: None,
        }
    }
}

fn to_rgb565(image: &RgbImage) -> Vec<u8> {
    let mut raw = Vec::with_capacity(image.as_raw().len() / 3 * 2);
    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        let mut rgb565: u16 = (r as u16 & 0b11111000) << 8;
        rgb565 |= (g as u16 & 0b11111100) << 3;
        rgb565 |= (b as u16) >> 3;
        raw.extend(rgb565.to_le_bytes());
    }
    raw
}

#[async_trait]
impl DisplayDriver for FramebufferDisplay {
    fn resolution(&self) -> Dimensions {
        self.resolution
    }

    fn set_image(&mut self, image: RgbImage) {
        self.staged = Some(image);
    }

    async fn show(&mut self) -> Result<(), StatusPanelError> {
        let raw = match &self.staged {
            Some(image) => to_rgb565(image),
            None => to_rgb565(&blank_canvas(self.resolution)),
        };
        tokio::fs::write(&self.path, &raw)
            .await
            .map_err(|source| StatusPanelError::FramebufferWriteError {
                path: self.path.clone(),
                source,
            })
    }
}
