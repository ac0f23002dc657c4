// sfp-net/src/manifest.rs
use reqwest::Client;
use sfp_common::error::{Result, SfpError};
use sfp_common::model::VersionManifest;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::http::classify_request_error;

/// Fetches the version manifest at most once per fetcher.
#[derive(Debug)]
pub struct ManifestFetcher {
    url: String,
    client: Client,
    cached: OnceCell<VersionManifest>,
}

impl ManifestFetcher {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
            cached: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn get_manifest(&self) -> Result<&VersionManifest> {
        self.cached.get_or_try_init(|| self.fetch()).await
    }

    pub async fn version(&self) -> Result<&str> {
        Ok(self.get_manifest().await?.version.as_str())
    }

    async fn fetch(&self) -> Result<VersionManifest> {
        debug!("Fetching version manifest from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| classify_request_error(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SfpError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(&self.url, e))?;
        let manifest: VersionManifest = serde_json::from_str(&body)
            .map_err(|e| SfpError::Parse("version manifest", e.to_string()))?;
        debug!("Manifest lists version {}", manifest.version);
        Ok(manifest)
    }
}
