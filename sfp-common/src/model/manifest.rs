// sfp-common/src/model/manifest.rs
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::target::BuildTarget;

/// The remote descriptor listing the current version and one build per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionManifest {
    pub version: String,
    #[serde(default)]
    pub builds: HashMap<String, BuildEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEntry {
    pub url: String,
    pub sha256: String,
}

/// What to download for one target and how to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub download_url: String,
    pub expected_checksum: String,
}

impl VersionManifest {
    /// Looks up the build for `target`. A manifest that does not list the
    /// build yields `None`, the same as an unsupported target.
    pub fn build_spec(&self, target: BuildTarget) -> Option<BuildSpec> {
        self.builds.get(target.as_str()).map(|entry| BuildSpec {
            download_url: entry.url.clone(),
            expected_checksum: entry.sha256.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": "7.8.1-8f830784cc",
        "channel": "stable",
        "builds": {
            "linux-amd64": {
                "url": "https://example.com/sfdx-cli-v7.8.1-8f830784cc-linux-x64.tar.xz",
                "sha256": "aa11",
                "bytes": 123
            },
            "darwin-amd64": {
                "url": "https://example.com/sfdx-cli-v7.8.1-8f830784cc-darwin-x64.tar.xz",
                "sha256": "bb22"
            }
        }
    }"#;

    #[test]
    fn parses_manifest_and_ignores_unknown_fields() {
        let manifest: VersionManifest = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(manifest.version, "7.8.1-8f830784cc");
        assert_eq!(manifest.builds.len(), 2);

        let spec = manifest.build_spec(BuildTarget::LinuxAmd64).unwrap();
        assert_eq!(
            spec.download_url,
            "https://example.com/sfdx-cli-v7.8.1-8f830784cc-linux-x64.tar.xz"
        );
        assert_eq!(spec.expected_checksum, "aa11");
    }

    #[test]
    fn missing_build_is_none() {
        let manifest: VersionManifest = serde_json::from_str(SAMPLE).unwrap();
        assert!(manifest.build_spec(BuildTarget::Windows386).is_none());
    }

    #[test]
    fn rejects_manifest_without_version() {
        let result = serde_json::from_str::<VersionManifest>(r#"{"builds": {}}"#);
        assert!(result.is_err());
    }
}
