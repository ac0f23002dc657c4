// sfp-net/src/http.rs
use std::error::Error as StdError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use indicatif::ProgressBar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Certificate, Client, Proxy};
use sfp_common::config::Config;
use sfp_common::error::{Result, SfpError};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::validation::verify_checksum;

const CONNECT_TIMEOUT_SECS: u64 = 30;
const CERT_BEGIN_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// Builds the client used for the manifest and the artifact, honouring the
/// npm proxy, CA and strict-ssl settings carried by `config`.
pub fn build_http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    let agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|e| SfpError::Config(format!("Invalid user agent '{}': {e}", config.user_agent)))?;
    headers.insert(USER_AGENT, agent);
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10));

    if let Some(proxy_url) = &config.proxy_url {
        info!("Using proxy {}", mask_proxy_url(proxy_url));
        let proxy = Proxy::all(proxy_url.as_str())
            .map_err(|e| SfpError::Config(format!("Invalid proxy URL: {e}")))?;
        builder = builder.proxy(proxy);
    }

    let pems = ca_certificates(config);
    if !pems.is_empty() {
        info!("Using npmconf ca");
        for pem in pems {
            match Certificate::from_pem(pem.as_bytes()) {
                Ok(cert) => builder = builder.add_root_certificate(cert),
                Err(e) => warn!("Ignoring unparsable CA certificate: {}", e),
            }
        }
    }

    if !config.strict_ssl {
        warn!("Strict SSL disabled; server certificates will not be verified");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| SfpError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Replaces the password of a proxy URL so it can be logged.
pub fn mask_proxy_url(proxy_url: &str) -> String {
    match Url::parse(proxy_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("******"));
            }
            url.to_string()
        }
        Err(_) => "<unparsable proxy url>".to_string(),
    }
}

/// Inline `npm_config_ca` wins; otherwise the bundle file is split into
/// individual PEM blocks.
fn ca_certificates(config: &Config) -> Vec<String> {
    if let Some(ca) = &config.ca_bundle {
        return split_pem_bundle(ca);
    }
    let Some(ca_file) = &config.ca_file else {
        return Vec::new();
    };
    match fs::read_to_string(ca_file) {
        Ok(contents) => split_pem_bundle(&contents),
        Err(e) => {
            error!("Could not read cafile {}: {}", ca_file.display(), e);
            Vec::new()
        }
    }
}

/// Splits a PEM bundle on certificate boundaries. A leading chunk without a
/// certificate (comments at the top of the file) is dropped.
pub(crate) fn split_pem_bundle(bundle: &str) -> Vec<String> {
    let mut bounds: Vec<usize> = std::iter::once(0)
        .chain(
            bundle
                .match_indices(CERT_BEGIN_MARKER)
                .map(|(idx, _)| idx)
                .filter(|&idx| idx > 0),
        )
        .collect();
    bounds.push(bundle.len());
    let mut chunks: Vec<String> = bounds
        .windows(2)
        .map(|w| &bundle[w[0]..w[1]])
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| chunk.to_string())
        .collect();
    if chunks
        .first()
        .is_some_and(|first| !first.contains(CERT_BEGIN_MARKER))
    {
        chunks.remove(0);
    }
    chunks
}

/// Whether an error chain describes an untrusted certificate chain, as
/// reported by either OpenSSL or rustls.
pub(crate) fn is_trust_failure(chain: &str) -> bool {
    let lowered = chain.to_ascii_lowercase();
    [
        "self_signed_cert_in_chain",
        "self signed certificate",
        "self-signed certificate",
        "unknownissuer",
        "unable to get local issuer certificate",
    ]
    .iter()
    .any(|needle| lowered.contains(needle))
}

/// Maps a transport failure to the error the user should see. Trust-chain
/// failures usually mean TLS interception by a corporate proxy and get their
/// own variant.
pub(crate) fn classify_request_error(url: &str, err: reqwest::Error) -> SfpError {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        chain.push_str(": ");
        chain.push_str(&inner.to_string());
        source = inner.source();
    }
    if is_trust_failure(&chain) {
        error!("Error making request to {}: {}", url, chain);
        SfpError::CertificateTrust(url.to_string())
    } else {
        SfpError::Network(format!("Error requesting {url}: {chain}"))
    }
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Streams `url` to `final_path`, verifying `sha256_expected` before the file
/// is renamed into place. The body is written to a uniquely suffixed sibling so
/// concurrent installers never observe a partial file at `final_path`.
pub async fn download_artifact(
    client: &Client,
    url: &str,
    final_path: &Path,
    sha256_expected: &str,
    progress: &ProgressBar,
) -> Result<PathBuf> {
    let temp_path = PathBuf::from(format!(
        "{}-download-{}",
        final_path.display(),
        unique_suffix()
    ));
    debug!("Downloading to temporary path: {}", temp_path.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_request_error(url, e))?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if !status.is_success() {
        error!(
            "Error requesting archive. Status: {}. Response headers: {:?}",
            status,
            response.headers()
        );
        return Err(SfpError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if let Some(total) = response.content_length() {
        progress.set_length(total);
    }
    info!("Receiving...");

    let mut temp_file = fs::File::create(&temp_path).map_err(|e| {
        SfpError::Io(std::sync::Arc::new(std::io::Error::new(
            e.kind(),
            format!("Failed to create temp file {}: {}", temp_path.display(), e),
        )))
    })?;
    let mut received: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path);
                return Err(classify_request_error(url, e));
            }
        };
        temp_file.write_all(&bytes)?;
        received += bytes.len() as u64;
        progress.set_position(received);
    }
    temp_file.flush()?;
    drop(temp_file);
    progress.finish_and_clear();
    info!("Received {}K total.", received / 1024);

    if let Err(e) = verify_checksum(&temp_path, sha256_expected) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, final_path).map_err(|e| {
        SfpError::Io(std::sync::Arc::new(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to move temp file {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            ),
        )))
    })?;
    debug!("Moved verified file to final location: {}", final_path.display());
    Ok(final_path.to_path_buf())
}
