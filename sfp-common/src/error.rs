// sfp-common/src/error.rs
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Where users are asked to send logs for failures we cannot explain.
pub const ISSUE_URL: &str = "https://github.com/coveo/sfdx-prebuilt";

#[derive(Error, Debug, Clone)]
pub enum SfpError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Network Error: {0}")]
    Network(String),

    #[error("HTTP status {status} while requesting {url}. Make sure your network and proxy settings are correct")]
    HttpStatus { url: String, status: u16 },

    #[error("Certificate trust error while requesting {0}: the server presented a self-signed certificate in its chain. A corporate proxy is likely intercepting TLS; set npm_config_cafile to its CA bundle")]
    CertificateTrust(String),

    #[error("Parsing Error in {0}: {1}")]
    Parse(&'static str, String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Checksum Mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Unexpected platform or architecture: {platform}/{arch}. There is no binary available for your platform/architecture; try to install sfdx globally")]
    UnsupportedPlatform { platform: String, arch: String },

    #[error("Can not find a writable tmp directory (tried: {0})")]
    NoWritableTempDir(String),

    #[error("Extraction Error: {0}")]
    Extraction(String),

    #[error("Could not find extracted directory for version {version} in {dir}")]
    ExtractionLayout { dir: PathBuf, version: String },

    #[error("chmod failed: sfdx was not successfully copied to {0}")]
    MissingBinary(PathBuf),

    #[error("Failed to execute command: {0}")]
    CommandExec(String),
}

impl SfpError {
    /// Whether the failure is worth a bug report, as opposed to a problem
    /// with the user's platform or network that they can fix themselves.
    pub fn is_reportable(&self) -> bool {
        !matches!(
            self,
            SfpError::UnsupportedPlatform { .. } | SfpError::CertificateTrust(_)
        )
    }
}

impl From<std::io::Error> for SfpError {
    fn from(err: std::io::Error) -> Self {
        SfpError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for SfpError {
    fn from(err: reqwest::Error) -> Self {
        SfpError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for SfpError {
    fn from(err: serde_json::Error) -> Self {
        SfpError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, SfpError>;
