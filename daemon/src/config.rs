use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use statuspanel::{Geometry, TruncatedImagePolicy};

use crate::error::StatusPanelError;

pub const DEFAULT_UPDATE_URL: &str = "https://api.statuspanel.io/api/v3/status/";

/// KEY_A and KEY_D, which is what the gpio-keys overlay for the panel's
/// A and D buttons reports.
const DEFAULT_TOGGLE_KEY: u16 = 30;
const DEFAULT_SHUTDOWN_KEY: u16 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    /// A Linux framebuffer device, written as RGB565.
    #[default]
    Framebuffer,
    /// No panel; every frame is written out as a PNG.
    Headless,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub update_url: String,
    pub identity_path: PathBuf,
    pub image_width: u32,
    pub image_height: u32,
    pub display: DisplayKind,
    pub framebuffer_path: PathBuf,
    pub panel_width: u32,
    pub panel_height: u32,
    pub headless_output: PathBuf,
    pub update_interval_secs: u64,
    pub retry_interval_secs: u64,
    pub truncated_images: TruncatedImagePolicy,
    pub button_device: Option<PathBuf>,
    pub toggle_key: u16,
    pub shutdown_key: u16,
    pub power_off_on_shutdown: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            update_url: DEFAULT_UPDATE_URL.to_string(),
            identity_path: "/var/lib/statuspanel/identity.json".into(),
            image_width: Geometry::REFERENCE.width,
            image_height: Geometry::REFERENCE.height,
            display: DisplayKind::default(),
            framebuffer_path: "/dev/fb0".into(),
            panel_width: 640,
            panel_height: 400,
            headless_output: "/tmp/statuspanel.png".into(),
            update_interval_secs: 30,
            retry_interval_secs: 10,
            truncated_images: TruncatedImagePolicy::default(),
            button_device: None,
            toggle_key: DEFAULT_TOGGLE_KEY,
            shutdown_key: DEFAULT_SHUTDOWN_KEY,
            power_off_on_shutdown: false,
        }
    }
}

impl Config {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.image_width, self.image_height)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

pub async fn parse_config<P>(path: P) -> Result<Config, StatusPanelError>
where
    P: AsRef<Path>,
{
    if let Ok(config_file) = tokio::fs::read_to_string(&path).await {
        Ok(toml::from_str(&config_file).map_err(StatusPanelError::ConfigFileParsingError)?)
    } else {
        warn!(
            "unable to read config file {}, using default config",
            path.as_ref().display()
        );
        Ok(Config::default())
    }
}
