// sfp-core/src/install/acquire.rs
use std::path::PathBuf;

use indicatif::ProgressBar;
use reqwest::Client;
use sfp_common::config::Config;
use sfp_common::error::Result;
use sfp_common::model::{BuildSpec, TargetIdentity, VersionManifest};
use sfp_net::{checksum_matches, download_artifact, validate_url};
use tracing::{debug, info, warn};

use super::tempdir::find_suitable_temp_dir;

/// Picks the manifest build for `target`. `None` means the target has no
/// prebuilt binary.
pub fn resolve_download_spec(
    manifest: &VersionManifest,
    target: &TargetIdentity,
) -> Option<BuildSpec> {
    let Some(build_target) = target.build_target() else {
        debug!("No build target for {}", target);
        return None;
    };
    let spec = manifest.build_spec(build_target);
    if spec.is_none() {
        warn!(
            "Manifest {} lists no build for {}",
            manifest.version,
            build_target.as_str()
        );
    }
    spec
}

/// Makes sure the artifact described by `spec` sits verified in the temp
/// directory and returns its path. A cached copy is reused only when its
/// checksum matches.
pub async fn download(
    config: &Config,
    client: &Client,
    spec: &BuildSpec,
    progress: &ProgressBar,
) -> Result<PathBuf> {
    let tmp_dir = find_suitable_temp_dir(config)?;
    let file_name = validate_url(&spec.download_url)?;
    let artifact = tmp_dir.join(file_name);

    if artifact.is_file() && checksum_matches(&artifact, &spec.expected_checksum) {
        info!("Download already available at {}", artifact.display());
        return Ok(artifact);
    }

    info!(
        "Downloading from {} to {}",
        spec.download_url,
        artifact.display()
    );
    download_artifact(
        client,
        &spec.download_url,
        &artifact,
        &spec.expected_checksum,
        progress,
    )
    .await
}
