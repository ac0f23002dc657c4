// sfp-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{Result, SfpError};
use crate::model::TargetIdentity;

pub const DEFAULT_MANIFEST_URL: &str =
    "https://developer.salesforce.com/media/salesforce-cli/manifest.json";
const DEFAULT_PACKAGE_NAME: &str = "sfdxprebuilt";
const BINARY_NAME: &str = "sfdx";
const INSTALL_DIR_NAME: &str = "sfdx";
const LOCATION_FILE_NAME: &str = "location.js";
const TMP_SUBDIR_NAME: &str = "sfdx";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the npm package being installed; the binary lands under `lib/`.
    pub package_dir: PathBuf,
    pub package_name: String,
    pub target: TargetIdentity,
    pub manifest_url: String,
    pub tmp_override: Option<PathBuf>,
    pub proxy_url: Option<String>,
    pub ca_bundle: Option<String>,
    pub ca_file: Option<PathBuf>,
    pub strict_ssl: bool,
    pub user_agent: String,
    pub search_path: Option<String>,
    pub show_progress: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading sfp configuration from the environment");
        let package_dir = env::current_dir().map_err(|e| {
            SfpError::Config(format!("Could not determine the package directory: {e}"))
        })?;
        Ok(Self::from_lookup(package_dir, |key| env::var(key).ok()))
    }

    /// Builds a configuration from an arbitrary variable source. Empty values
    /// count as unset.
    pub fn from_lookup<F>(package_dir: PathBuf, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.is_empty());

        let target = TargetIdentity::from_overrides(
            get("SFDX_PLATFORM").as_deref(),
            get("SFDX_ARCH").as_deref(),
        );
        debug!("Effective target: {}", target);

        let proxy_url = get("npm_config_https_proxy")
            .or_else(|| get("npm_config_http_proxy"))
            .or_else(|| get("npm_config_proxy"));

        let strict_ssl = get("npm_config_strict_ssl")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0"))
            .unwrap_or(true);

        Self {
            package_dir,
            package_name: get("npm_package_name")
                .unwrap_or_else(|| DEFAULT_PACKAGE_NAME.to_string()),
            target,
            manifest_url: get("SFDX_MANIFEST_URL")
                .unwrap_or_else(|| DEFAULT_MANIFEST_URL.to_string()),
            tmp_override: get("npm_config_tmp").map(PathBuf::from),
            proxy_url,
            ca_bundle: get("npm_config_ca"),
            ca_file: get("npm_config_cafile").map(PathBuf::from),
            strict_ssl,
            user_agent: get("npm_config_user_agent").unwrap_or_else(default_user_agent),
            search_path: get("PATH"),
            show_progress: true,
        }
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.package_dir.join("lib")
    }

    /// Final home of the extracted build.
    pub fn install_dir(&self) -> PathBuf {
        self.lib_dir().join(INSTALL_DIR_NAME)
    }

    pub fn location_file(&self) -> PathBuf {
        self.lib_dir().join(LOCATION_FILE_NAME)
    }

    pub fn binary_name(&self) -> &'static str {
        BINARY_NAME
    }

    /// Where the binary is expected inside `install_dir` for the target.
    pub fn binary_path(&self) -> PathBuf {
        let file_name = if self.target.is_windows() {
            format!("{BINARY_NAME}.exe")
        } else {
            BINARY_NAME.to_string()
        };
        self.install_dir().join("bin").join(file_name)
    }

    /// Name of the subdirectory created inside each temp candidate.
    pub fn tmp_subdir_name(&self) -> &'static str {
        TMP_SUBDIR_NAME
    }
}

pub fn location_file_name() -> &'static str {
    LOCATION_FILE_NAME
}

fn default_user_agent() -> String {
    format!("sfp/{}", env!("CARGO_PKG_VERSION"))
}
