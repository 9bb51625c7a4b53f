use async_trait::async_trait;
use log::{info, warn};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    /// The service has nothing for this device, usually because it has not
    /// been paired yet.
    #[error("no update available (HTTP {status})")]
    NotFound { status: u16 },
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Connection(Box::new(e))
    }
}

/// Source of raw update envelopes.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, device_id: &str) -> Result<Self, reqwest::Error> {
        // No request timeout: a hung fetch only delays the next scheduled update.
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: update_url(base_url, device_id),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        info!("fetching update '{}'...", self.url);
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!("failed to fetch update with status code '{status}'");
            return Err(FetchError::NotFound {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn update_url(base_url: &str, device_id: &str) -> String {
    format!("{}/{device_id}", base_url.trim_end_matches('/'))
}
