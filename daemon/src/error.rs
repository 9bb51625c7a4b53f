use std::path::PathBuf;

use statuspanel::identity::IdentityError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusPanelError {
    #[error("Config file parsing error: {0}")]
    ConfigFileParsingError(#[from] toml::de::Error),
    #[error("No identity stored at {0}")]
    IdentityNotFound(PathBuf),
    #[error("Failed to read identity from {path}: {source}")]
    IdentityReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write identity to {path}: {source}")]
    IdentityWriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Identity file parsing error: {0}")]
    IdentityParsingError(#[from] serde_json::Error),
    #[error("Identity key encoding error: {0}")]
    IdentityEncodingError(#[from] base64::DecodeError),
    #[error("Invalid identity: {0}")]
    InvalidIdentity(#[from] IdentityError),
    #[error("Failed to render pairing code: {0}")]
    PairingCodeError(qrcode::types::QrError),
    #[error("Failed to write framebuffer {path}: {source}")]
    FramebufferWriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode display image: {0}")]
    ImageEncodingError(#[from] image::ImageError),
    #[error("Failed to write display image to {path}: {source}")]
    ImageWriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}
