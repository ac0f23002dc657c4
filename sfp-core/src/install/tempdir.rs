// sfp-core/src/install/tempdir.rs
use std::fs;
use std::path::{Path, PathBuf};

use sfp_common::config::Config;
use sfp_common::error::{Result, SfpError};
use tracing::{debug, error, info};

use super::{open_permissions, unique_suffix};

/// Candidate roots, in priority order: the configured override, the OS temp
/// directory, then `./tmp`.
pub fn temp_dir_candidates(config: &Config) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = &config.tmp_override {
        candidates.push(dir.clone());
    }
    candidates.push(std::env::temp_dir());
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("tmp"));
    }
    candidates
}

/// Returns the first candidate (suffixed with the installer's subdirectory)
/// that accepts a write-and-delete probe.
pub fn find_suitable_temp_dir(config: &Config) -> Result<PathBuf> {
    find_writable_dir(&temp_dir_candidates(config), config.tmp_subdir_name())
}

pub fn find_writable_dir(candidates: &[PathBuf], subdir: &str) -> Result<PathBuf> {
    for candidate in candidates {
        let dir = absolutize(candidate).join(subdir);
        match probe_writable(&dir) {
            Ok(()) => {
                debug!("Using temp directory {}", dir.display());
                return Ok(dir);
            }
            Err(e) => info!("{} is not writable: {}", dir.display(), e),
        }
    }

    error!("Can not find a writable tmp directory");
    let tried = candidates
        .iter()
        .map(|c| c.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(SfpError::NoWritableTempDir(tried))
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    // Shared across users.
    open_permissions(dir)?;
    let probe = dir.join(format!("{}.tmp", unique_suffix()));
    fs::write(&probe, "test")?;
    fs::remove_file(&probe)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn first_writable_candidate_wins() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        let found =
            find_writable_dir(&[a.path().to_path_buf(), b.path().to_path_buf()], "sfdx").unwrap();
        assert_eq!(found, a.path().join("sfdx"));
        assert!(found.is_dir());
        assert_eq!(fs::read_dir(&found).unwrap().count(), 0);
    }

    #[test]
    fn unusable_candidate_falls_through() {
        let root = tempdir().unwrap();
        // A regular file cannot hold a subdirectory.
        let blocker = root.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let good = root.path().join("good");

        let found = find_writable_dir(&[blocker, good.clone()], "sfdx").unwrap();
        assert_eq!(found, good.join("sfdx"));
    }

    #[test]
    fn exhausting_candidates_is_fatal() {
        let root = tempdir().unwrap();
        let blocker = root.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let err = find_writable_dir(&[blocker], "sfdx").unwrap_err();
        assert!(matches!(err, SfpError::NoWritableTempDir(_)));
    }

    #[test]
    fn override_is_tried_first() {
        let dir = tempdir().unwrap();
        let mut config = Config::from_lookup(PathBuf::from("/pkg"), |_| None);
        config.tmp_override = Some(dir.path().to_path_buf());
        assert_eq!(temp_dir_candidates(&config)[0], dir.path().to_path_buf());
        assert_eq!(find_suitable_temp_dir(&config).unwrap(), dir.path().join("sfdx"));
    }
}
