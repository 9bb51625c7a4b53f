//! What the panel is showing, and what it should be showing.
//!
//! The scheduler asks for changes (new images, a toggle, a failed fetch) and
//! then for a redraw; the panel is only touched when the requested frame
//! differs from the one last drawn, because every refresh of a bistable
//! display is slow and visible.

use std::sync::Arc;

use log::{debug, info, warn};
use statuspanel::DecodedImage;
use tokio::sync::Mutex;

use crate::display::{DisplayDriver, compose};
use crate::error::StatusPanelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Nothing has been drawn yet.
    Unknown,
    /// Showing images from the last successful update.
    Normal,
    /// The service has no update for us; the pairing screen is up.
    Pairing,
    /// The last update attempt failed; the error screen is up.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    MissingUpdate,
    ConnectionError,
    InvalidUpdate,
}

/// A set of images plus which one is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    images: Arc<[DecodedImage]>,
    index: usize,
}

impl DisplayState {
    pub fn images(&self) -> &[DecodedImage] {
        &self.images
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image(&self) -> &DecodedImage {
        &self.images[self.index]
    }
}

struct Frames {
    mode: Mode,
    current: Option<DisplayState>,
    requested: Option<DisplayState>,
    /// Something other than `current` was put on the panel since it was drawn.
    overwritten: bool,
    /// The failure screen currently on the panel, if any.
    screen: Option<Mode>,
}

#[derive(Clone)]
pub struct Panel {
    inner: Arc<Mutex<Frames>>,
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Frames {
                mode: Mode::Unknown,
                current: None,
                requested: None,
                overwritten: false,
                screen: None,
            })),
        }
    }

    /// Replace the requested images, keeping the selection where possible.
    /// Returns whether the requested frame changed.
    pub async fn fetch_succeeded(&self, images: Vec<DecodedImage>) -> bool {
        if images.is_empty() {
            warn!("ignoring update without images");
            return false;
        }
        let mut frames = self.inner.lock().await;
        let index = match &frames.requested {
            Some(old) => old.index % images.len(),
            None => 0,
        };
        let requested = DisplayState {
            images: images.into(),
            index,
        };
        frames.mode = Mode::Normal;
        let changed = frames.requested.as_ref() != Some(&requested);
        frames.requested = Some(requested);
        changed
    }

    /// Record a failed update. Returns whether the matching screen has to be
    /// put up, which is the case unless it is still on the panel.
    pub async fn fetch_failed(&self, failure: FetchFailure) -> bool {
        let mode = match failure {
            FetchFailure::MissingUpdate => Mode::Pairing,
            FetchFailure::ConnectionError | FetchFailure::InvalidUpdate => Mode::Error,
        };
        let mut frames = self.inner.lock().await;
        frames.mode = mode;
        frames.screen != Some(mode)
    }

    /// Select the next image, wrapping around. Returns false if there is
    /// nothing to toggle between.
    pub async fn toggle(&self) -> bool {
        let mut frames = self.inner.lock().await;
        match frames.requested.as_mut() {
            Some(requested) => {
                requested.index = (requested.index + 1) % requested.images.len();
                debug!(
                    "selected image {}/{}",
                    requested.index + 1,
                    requested.images.len()
                );
                true
            }
            None => false,
        }
    }

    /// Draw the requested frame if it isn't already on the panel. Returns
    /// whether the display was touched.
    pub async fn redraw<D: DisplayDriver + ?Sized>(
        &self,
        display: &mut D,
    ) -> Result<bool, StatusPanelError> {
        let target = {
            let mut frames = self.inner.lock().await;
            let Some(requested) = frames.requested.clone() else {
                return Ok(false);
            };
            if !frames.overwritten && frames.current.as_ref() == Some(&requested) {
                return Ok(false);
            }
            frames.current = Some(requested.clone());
            frames.overwritten = false;
            frames.screen = None;
            requested
        };

        info!(
            "drawing image {}/{}",
            target.index + 1,
            target.images.len()
        );
        let canvas = compose(&target.image().to_rgb(), display.resolution());
        display.set_image(canvas);
        if let Err(e) = display.show().await {
            // Whatever is on the panel now, it isn't `current`.
            self.inner.lock().await.overwritten = true;
            return Err(e);
        }
        Ok(true)
    }

    /// Put the screen for the current mode (pairing or error) up in place of
    /// the requested frame.
    pub async fn show_screen<D: DisplayDriver + ?Sized>(
        &self,
        display: &mut D,
        screen: image::RgbImage,
    ) -> Result<(), StatusPanelError> {
        {
            let mut frames = self.inner.lock().await;
            frames.overwritten = true;
            frames.screen = Some(frames.mode);
        }
        display.set_image(screen);
        if let Err(e) = display.show().await {
            self.inner.lock().await.screen = None;
            return Err(e);
        }
        Ok(())
    }

    pub async fn mode(&self) -> Mode {
        self.inner.lock().await.mode
    }

    pub async fn requested(&self) -> Option<DisplayState> {
        self.inner.lock().await.requested.clone()
    }

    pub async fn current(&self) -> Option<DisplayState> {
        self.inner.lock().await.current.clone()
    }
}
