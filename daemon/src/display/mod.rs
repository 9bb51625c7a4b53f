use async_trait::async_trait;
use image::{Rgb, RgbImage, imageops};
use qrcode::{Color, QrCode};
use statuspanel::palette::WHITE;

use crate::error::StatusPanelError;

pub mod framebuffer;
pub mod headless;

const ERROR_COLOR: Rgb<u8> = Rgb([0xFF, 0x00, 0xFF]);
const QR_MODULE_SIZE: u32 = 4;
const QR_QUIET_ZONE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A physical (or pretend) panel. Drawing is two-step: stage a full-panel
/// image with `set_image`, then push it out with `show`.
#[async_trait]
pub trait DisplayDriver: Send {
    fn resolution(&self) -> Dimensions;

    fn set_image(&mut self, image: RgbImage);

    async fn show(&mut self) -> Result<(), StatusPanelError>;
}

pub fn blank_canvas(resolution: Dimensions) -> RgbImage {
    RgbImage::from_pixel(resolution.width, resolution.height, WHITE)
}

/// Place `image` at the top left of a white panel-sized canvas. Anything that
/// doesn't fit is clipped, never scaled.
pub fn compose(image: &RgbImage, resolution: Dimensions) -> RgbImage {
    let mut canvas = blank_canvas(resolution);
    imageops::replace(&mut canvas, image, 0, 0);
    canvas
}

/// Shown when the service has no update for us: the pairing URL as a QR code.
pub fn pairing_screen(
    pairing_url: &str,
    resolution: Dimensions,
) -> Result<RgbImage, StatusPanelError> {
    let code = QrCode::new(pairing_url.as_bytes()).map_err(StatusPanelError::PairingCodeError)?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let size = (modules + 2 * QR_QUIET_ZONE) * QR_MODULE_SIZE;
    let qr = RgbImage::from_fn(size, size, |x, y| {
        let module_x = (x / QR_MODULE_SIZE).checked_sub(QR_QUIET_ZONE);
        let module_y = (y / QR_MODULE_SIZE).checked_sub(QR_QUIET_ZONE);
        match (module_x, module_y) {
            (Some(mx), Some(my)) if mx < modules && my < modules => {
                match colors[(my * modules + mx) as usize] {
                    Color::Dark => Rgb([0x00, 0x00, 0x00]),
                    Color::Light => WHITE,
                }
            }
            _ => WHITE,
        }
    });

    let mut canvas = blank_canvas(resolution);
    let origin_x = (resolution.width as i64 - size as i64) / 2;
    let origin_y = (resolution.height as i64 - size as i64) / 2;
    imageops::replace(&mut canvas, &qr, origin_x, origin_y);
    Ok(canvas)
}

/// Shown while updates are failing for any reason other than a missing update.
pub fn error_screen(resolution: Dimensions) -> RgbImage {
    RgbImage::from_pixel(resolution.width, resolution.height, ERROR_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statuspanel::palette::{ACCENT, BLACK};

    const PANEL: Dimensions = Dimensions {
        width: 12,
        height: 6,
    };

    #[test]
    fn test_compose_pads_smaller_image() {
        let image = RgbImage::from_pixel(4, 2, BLACK);
        let canvas = compose(&image, PANEL);
        assert_eq!(canvas.dimensions(), (12, 6));
        assert_eq!(*canvas.get_pixel(3, 1), BLACK);
        assert_eq!(*canvas.get_pixel(4, 1), WHITE);
        assert_eq!(*canvas.get_pixel(3, 2), WHITE);
    }

    #[test]
    fn test_compose_clips_larger_image() {
        let image = RgbImage::from_pixel(20, 20, ACCENT);
        let canvas = compose(&image, PANEL);
        assert_eq!(canvas.dimensions(), (12, 6));
        assert!(canvas.pixels().all(|p| *p == ACCENT));
    }

    #[test]
    fn test_pairing_screen_is_centered_qr() {
        let resolution = Dimensions {
            width: 640,
            height: 400,
        };
        let screen = pairing_screen("statuspanel:r2?id=abc&pk=def", resolution).unwrap();
        assert_eq!(screen.dimensions(), (640, 400));
        // Corners stay white, the middle has some dark modules.
        assert_eq!(*screen.get_pixel(0, 0), WHITE);
        assert_eq!(*screen.get_pixel(639, 399), WHITE);
        let dark = screen.pixels().filter(|p| **p == BLACK).count();
        assert!(dark > 0);

        let code = QrCode::new(b"statuspanel:r2?id=abc&pk=def").unwrap();
        let size = (code.width() as u32 + 2 * QR_QUIET_ZONE) * QR_MODULE_SIZE;
        // The top-left finder pattern is dark at its outer corner.
        let first_module_x = (640 - size) / 2 + QR_QUIET_ZONE * QR_MODULE_SIZE;
        let first_module_y = (400 - size) / 2 + QR_QUIET_ZONE * QR_MODULE_SIZE;
        assert_eq!(*screen.get_pixel(first_module_x, first_module_y), BLACK);
        assert_eq!(*screen.get_pixel(first_module_x - 1, first_module_y), WHITE);
    }

    #[test]
    fn test_error_screen() {
        let screen = error_screen(PANEL);
        assert!(screen.pixels().all(|p| *p == ERROR_COLOR));
    }
}
