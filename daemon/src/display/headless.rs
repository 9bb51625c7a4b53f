use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use log::debug;

use crate::display::{Dimensions, DisplayDriver, blank_canvas};
use crate::error::StatusPanelError;

/// Stand-in for a panel when running on a desktop: each shown frame replaces
/// a PNG on disk.
pub struct HeadlessDisplay {
    output: PathBuf,
    resolution: Dimensions,
    staged: Option<RgbImage>,
}

impl HeadlessDisplay {
    pub fn new(output: PathBuf, resolution: Dimensions) -> Self {
        Self {
            output,
            resolution,
            staged: None,
        }
    }
}

#[async_trait]
impl DisplayDriver for HeadlessDisplay {
    fn resolution(&self) -> Dimensions {
        self.resolution
    }

    fn set_image(&mut self, image: RgbImage) {
        self.staged = Some(image);
    }

    async fn show(&mut self) -> Result<(), StatusPanelError> {
        let mut png = Cursor::new(Vec::new());
        match &self.staged {
            Some(image) => image.write_to(&mut png, ImageFormat::Png)?,
            None => blank_canvas(self.resolution).write_to(&mut png, ImageFormat::Png)?,
        }
        tokio::fs::write(&self.output, png.into_inner())
            .await
            .map_err(|source| StatusPanelError::ImageWriteError {
                path: self.output.clone(),
                source,
            })?;
        debug!("wrote frame to {}", self.output.display());
        Ok(())
    }
}
