// sfp-core/src/resolver.rs
//! Decides where the sfdx binary comes from and drives the install when no
//! usable binary exists yet.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sfp_common::config::Config;
use sfp_common::error::{Result, SfpError};
use sfp_common::model::{BuildSpec, LocationRecord, TargetIdentity};
use sfp_net::{build_http_client, ManifestFetcher};
use tracing::{debug, error, info, warn};

use crate::install::{self, extract_artifact, place_into, resolve_download_spec};
use crate::search_path::{find_on_path, is_own_shim, read_launcher, NPM_INSTALL_MARKER};
use crate::{location_store, locator};

/// How a run ended up with a usable binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The package's own record already points at a valid binary.
    PreviouslyInstalled(PathBuf),
    /// A manually installed binary on PATH reports the right version.
    FoundOnPath(PathBuf),
    /// A global npm install of this package already holds a valid binary.
    LinkedGlobal(PathBuf),
    /// Downloaded and installed into the package.
    Installed(PathBuf),
}

impl Resolution {
    pub fn binary(&self) -> &Path {
        match self {
            Resolution::PreviouslyInstalled(p)
            | Resolution::FoundOnPath(p)
            | Resolution::LinkedGlobal(p)
            | Resolution::Installed(p) => p,
        }
    }
}

#[derive(Debug)]
enum Step {
    CheckingLib,
    CheckingPath,
    Downloading,
    Extracting { artifact: PathBuf },
    Placing { extracted: PathBuf },
    InstallingPostSteps,
    Recording,
    Done(Resolution),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::CheckingLib => "CheckingLib",
            Step::CheckingPath => "CheckingPath",
            Step::Downloading => "Downloading",
            Step::Extracting { .. } => "Extracting",
            Step::Placing { .. } => "Placing",
            Step::InstallingPostSteps => "InstallingPostSteps",
            Step::Recording => "Recording",
            Step::Done(_) => "Done",
        };
        f.write_str(name)
    }
}

/// Per-run context shared by every step.
pub struct InstallResolver {
    config: Config,
    client: Client,
    manifest: ManifestFetcher,
    progress: ProgressBar,
}

impl InstallResolver {
    pub fn new(config: Config) -> Result<Self> {
        let client = build_http_client(&config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: Client) -> Self {
        let manifest = ManifestFetcher::new(config.manifest_url.clone(), client.clone());
        let progress = if config.show_progress {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.blue.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style);
            }
            pb
        } else {
            ProgressBar::hidden()
        };
        Self {
            config,
            client,
            manifest,
            progress,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn target(&self) -> &TargetIdentity {
        &self.config.target
    }

    /// Runs the state machine to completion. Any error is the `Failed` state.
    pub async fn run(&self) -> Result<Resolution> {
        let mut step = Step::CheckingLib;
        loop {
            debug!("Resolver state: {}", step);
            step = match step {
                Step::CheckingLib => self.check_lib().await?,
                Step::CheckingPath => self.check_path().await?,
                Step::Downloading => self.download().await?,
                Step::Extracting { artifact } => Step::Placing {
                    extracted: extract_artifact(&artifact)?,
                },
                Step::Placing { extracted } => {
                    let version = self.manifest.version().await?;
                    place_into(&extracted, &self.config.install_dir(), version)?;
                    Step::InstallingPostSteps
                }
                Step::InstallingPostSteps => {
                    install::run_post_install(&self.config.install_dir(), self.target())?;
                    Step::Recording
                }
                Step::Recording => Step::Done(Resolution::Installed(self.record_install()?)),
                Step::Done(resolution) => {
                    info!("Using sfdx at {}", resolution.binary().display());
                    return Ok(resolution);
                }
            };
        }
    }

    async fn check_lib(&self) -> Result<Step> {
        let version = self.manifest.version().await?;
        let record_path = self.config.location_file();
        match locator::find_valid_binary(&record_path, version, self.target()) {
            Some(found) => {
                info!("sfdx is previously installed at {}", found.display());
                Ok(Step::Done(Resolution::PreviouslyInstalled(found)))
            }
            None => Ok(Step::CheckingPath),
        }
    }

    async fn check_path(&self) -> Result<Step> {
        if !self.target().is_host() {
            info!(
                "Target {} differs from host {}, skipping PATH search",
                self.target(),
                TargetIdentity::host()
            );
            return Ok(Step::Downloading);
        }

        let Some(found) = find_on_path(
            self.config.binary_name(),
            self.config.search_path.as_deref(),
        ) else {
            debug!("sfdx not found on PATH");
            return Ok(Step::Downloading);
        };

        let contents = match read_launcher(&found) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Could not read {}, continuing: {}", found.display(), e);
                return Ok(Step::Downloading);
            }
        };

        if is_own_shim(&found, &contents, &self.config.package_name) {
            debug!("Ignoring our own launcher at {}", found.display());
            return Ok(Step::Downloading);
        }

        let version = self.manifest.version().await?;
        if contents.contains(NPM_INSTALL_MARKER) {
            return Ok(match self.peer_install(&found, version) {
                Some(binary) => {
                    info!("Linking to global install at {}", binary.display());
                    self.finish_on_path(Resolution::LinkedGlobal(binary))
                }
                None => {
                    info!(
                        "Global install at {} has no usable binary, continuing",
                        found.display()
                    );
                    Step::Downloading
                }
            });
        }

        if locator::check_version(&found, version) {
            info!("Using manually installed sfdx at {}", found.display());
            return Ok(self.finish_on_path(Resolution::FoundOnPath(found)));
        }
        Ok(Step::Downloading)
    }

    /// Records a binary found through PATH. A record that cannot be written
    /// is a miss like any other PATH failure.
    fn finish_on_path(&self, resolution: Resolution) -> Step {
        match self.persist(resolution.binary()) {
            Ok(()) => Step::Done(resolution),
            Err(e) => {
                warn!("Error checking path, continuing: {}", e);
                Step::Downloading
            }
        }
    }

    /// Follows an npm-global launcher back to its package and asks that
    /// package's own record for a binary.
    fn peer_install(&self, launcher: &Path, version: &str) -> Option<PathBuf> {
        let real = match fs::canonicalize(launcher) {
            Ok(real) => real,
            Err(e) => {
                warn!("Could not resolve {}: {}", launcher.display(), e);
                return None;
            }
        };
        let package_root = real.parent()?.parent()?;
        let record_path = package_root.join("lib").join(sfp_common::config::location_file_name());
        debug!("Checking global record {}", record_path.display());
        locator::find_valid_binary(&record_path, version, self.target())
    }

    async fn download(&self) -> Result<Step> {
        let manifest = self.manifest.get_manifest().await?;
        let spec: BuildSpec = resolve_download_spec(manifest, self.target()).ok_or_else(|| {
            error!("No binary is available for {}", self.target());
            SfpError::UnsupportedPlatform {
                platform: self.target().platform.to_string(),
                arch: self.target().architecture.to_string(),
            }
        })?;
        let artifact = install::download(&self.config, &self.client, &spec, &self.progress).await?;
        Ok(Step::Extracting { artifact })
    }

    fn record_install(&self) -> Result<PathBuf> {
        let binary = self.config.binary_path();
        make_executable(&binary)?;

        let lib_dir = self.config.lib_dir();
        let relative = binary
            .strip_prefix(&lib_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| binary.clone());
        let record = LocationRecord::for_target(relative.to_string_lossy(), self.target());
        location_store::write(&self.config.location_file(), &record)?;
        info!("Recorded sfdx location {}", relative.display());
        Ok(binary)
    }

    fn persist(&self, binary: &Path) -> Result<()> {
        let record = LocationRecord::for_target(binary.to_string_lossy(), self.target());
        location_store::write(&self.config.location_file(), &record)
    }
}

#[cfg(unix)]
fn make_executable(binary: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(binary, fs::Permissions::from_mode(0o755)).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            SfpError::MissingBinary(binary.to_path_buf())
        } else {
            e.into()
        }
    })
}

#[cfg(not(unix))]
fn make_executable(binary: &Path) -> Result<()> {
    fs::metadata(binary).map(|_| ()).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            SfpError::MissingBinary(binary.to_path_buf())
        } else {
            e.into()
        }
    })
}
