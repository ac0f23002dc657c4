// sfp-core/src/install/place.rs
use std::fs;
use std::path::{Path, PathBuf};

use sfp_common::error::{Result, SfpError};
use tracing::{debug, info, warn};

/// Finds the first top-level directory of `extracted` whose name contains
/// `version`.
pub fn find_versioned_dir(extracted: &Path, version: &str) -> Result<Option<PathBuf>> {
    let mut names: Vec<_> = fs::read_dir(extracted)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    names.sort();
    Ok(names.into_iter().find(|path| {
        path.is_dir()
            && path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().contains(version))
    }))
}

/// Replaces `target_dir` with the versioned directory from `extracted`.
pub fn place_into(extracted: &Path, target_dir: &Path, version: &str) -> Result<()> {
    if target_dir.exists() || target_dir.symlink_metadata().is_ok() {
        info!("Removing {}", target_dir.display());
        if target_dir.is_dir() {
            fs::remove_dir_all(target_dir)?;
        } else {
            fs::remove_file(target_dir)?;
        }
    }

    let Some(source) = find_versioned_dir(extracted, version)? else {
        let found: Vec<String> = fs::read_dir(extracted)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        warn!("Could not find extracted file, found: {:?}", found);
        return Err(SfpError::ExtractionLayout {
            dir: extracted.to_path_buf(),
            version: version.to_string(),
        });
    };

    info!(
        "Copying extracted folder {} -> {}",
        source.display(),
        target_dir.display()
    );
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    move_dir(&source, target_dir)
}

/// Renames `source` to `dest`, falling back to a recursive move when the two
/// live on different filesystems.
fn move_dir(source: &Path, dest: &Path) -> Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(
                "Rename {} -> {} failed ({}); moving recursively",
                source.display(),
                dest.display(),
                e
            );
            let options = fs_extra::dir::CopyOptions::new().copy_inside(true);
            fs_extra::dir::move_dir(source, dest, &options).map_err(|e| {
                SfpError::Extraction(format!(
                    "Failed to move {} to {}: {}",
                    source.display(),
                    dest.display(),
                    e
                ))
            })?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn moves_versioned_directory_and_replaces_target() {
        let root = tempdir().unwrap();
        let extracted = root.path().join("extract");
        fs::create_dir_all(extracted.join("sfdx-cli-v7.1.0-abc-linux-x64/bin")).unwrap();
        fs::write(
            extracted.join("sfdx-cli-v7.1.0-abc-linux-x64/bin/sfdx"),
            "bin",
        )
        .unwrap();
        fs::write(extracted.join("README-7.1.0-abc"), "a file, not a dir").unwrap();

        let target = root.path().join("lib/sfdx");
        fs::create_dir_all(target.join("stale")).unwrap();

        place_into(&extracted, &target, "7.1.0-abc").unwrap();

        assert!(target.join("bin/sfdx").is_file());
        assert!(!target.join("stale").exists());
        assert!(!extracted.join("sfdx-cli-v7.1.0-abc-linux-x64").exists());
    }

    #[test]
    fn missing_versioned_directory_is_a_layout_error() {
        let root = tempdir().unwrap();
        let extracted = root.path().join("extract");
        fs::create_dir_all(extracted.join("sfdx-cli-v6.0.0-old")).unwrap();

        let err = place_into(&extracted, &root.path().join("lib/sfdx"), "7.1.0-abc").unwrap_err();
        assert!(matches!(err, SfpError::ExtractionLayout { .. }));
    }
}
