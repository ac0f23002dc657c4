// sfp-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use sfp_common::error::{Result, SfpError};
use url::Url;

/// Hex-encoded SHA-256 of the file at `path`.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut file, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    tracing::debug!(
        "Calculated SHA256 of {}: {} ({} bytes read)",
        path.display(),
        actual,
        bytes_copied
    );
    Ok(actual)
}

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let actual = sha256_file(path)?;
    tracing::debug!("Expected SHA256:   {}", expected);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(SfpError::ChecksumMismatch(format!(
            "Checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        )))
    }
}

/// Probe form of [`verify_checksum`]: unreadable files and mismatches are
/// both `false`.
pub fn checksum_matches(path: &Path, expected: &str) -> bool {
    match verify_checksum(path, expected) {
        Ok(()) => {
            tracing::info!("Verified checksum of previously downloaded file");
            true
        }
        Err(SfpError::ChecksumMismatch(msg)) => {
            tracing::info!("Checksum did not match: {}", msg);
            false
        }
        Err(e) => {
            tracing::warn!("Failed to verify checksum of {}: {}", path.display(), e);
            false
        }
    }
}

/// Validates a download URL and returns its trailing file name.
pub fn validate_url(url_str: &str) -> Result<String> {
    let url = Url::parse(url_str)
        .map_err(|e| SfpError::Validation(format!("Failed to parse URL '{url_str}': {e}")))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(SfpError::Validation(format!(
            "Invalid URL scheme for '{}': Must be http(s), but got '{}'",
            url_str,
            url.scheme()
        )));
    }
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .ok_or_else(|| {
            SfpError::Validation(format!("URL '{url_str}' does not end in a file name"))
        })
}
