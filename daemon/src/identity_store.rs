//! Persists the device identity as a small JSON file next to the config.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{error, info};
use serde::{Deserialize, Serialize};
use statuspanel::DeviceIdentity;
use tokio::io::AsyncWriteExt;

use crate::error::StatusPanelError;

#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    id: String,
    public_key: String,
    secret_key: String,
}

pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub async fn load(&self) -> Result<DeviceIdentity, StatusPanelError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StatusPanelError::IdentityNotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(StatusPanelError::IdentityReadError {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let stored: StoredIdentity = serde_json::from_str(&contents)?;
        let public_key = STANDARD.decode(stored.public_key)?;
        let secret_key = STANDARD.decode(stored.secret_key)?;
        Ok(DeviceIdentity::from_parts(
            stored.id,
            &public_key,
            &secret_key,
        )?)
    }

    pub async fn save(&self, identity: &DeviceIdentity) -> Result<(), StatusPanelError> {
        let stored = StoredIdentity {
            id: identity.id.clone(),
            public_key: STANDARD.encode(identity.public_key.as_bytes()),
            secret_key: STANDARD.encode(identity.secret_key.to_bytes()),
        };
        let contents = serde_json::to_string(&stored)?;
        let write_error = |source| StatusPanelError::IdentityWriteError {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        // Staged with owner-only permissions, then renamed over the old file.
        let staging = self.path.with_extension("json.tmp");
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&staging).await.map_err(write_error)?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        drop(file);
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(write_error)?;
        Ok(())
    }

    /// Load the stored identity, or mint and persist a fresh one if there is
    /// no usable identity on disk. A fresh identity has to be paired again.
    pub async fn load_or_generate(&self) -> Result<DeviceIdentity, StatusPanelError> {
        match self.load().await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                error!("{e}");
                let identity = DeviceIdentity::generate();
                self.save(&identity).await?;
                info!(
                    "generated new device identity {} at {}",
                    identity.id,
                    self.path.display()
                );
                Ok(identity)
            }
        }
    }
}
