// sfp-core/src/locator.rs
//! Probes for an existing, version-matching sfdx binary.
//!
//! Everything here is a probe: failures are logged and turned into a negative
//! answer, never propagated.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;
use sfp_common::config::location_file_name;
use sfp_common::model::TargetIdentity;
use tracing::{debug, info, warn};

use crate::location_store;

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"sfdx-cli/([0-9.a-zA-Z\-]+)\s").expect("version pattern is valid")
});

/// Pulls the version token out of `sfdx --version` output.
pub fn extract_version(output: &str) -> Option<&str> {
    VERSION_PATTERN
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Runs `binary --version` and compares the reported version to `expected`.
pub fn check_version(binary: &Path, expected: &str) -> bool {
    info!("Found sfdx at {} ...verifying", binary.display());
    let output = match Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            warn!("Error verifying sfdx at {}, continuing: {}", binary.display(), e);
            return false;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let long_version = stdout.trim();
    if long_version.is_empty() {
        info!("sfdx --version is empty @ {}.", binary.display());
        return false;
    }

    // The pattern wants trailing whitespace, so match on the trimmed text with
    // a newline restored.
    let Some(actual) = extract_version(&format!("{long_version}\n")).map(str::to_string) else {
        info!(
            "sfdx detected, but could not extract version '{}' @ {}.",
            long_version,
            binary.display()
        );
        return false;
    };

    if actual == expected {
        true
    } else {
        info!(
            "sfdx detected, but wrong version '{}' (expected {}) @ {}.",
            actual,
            expected,
            binary.display()
        );
        false
    }
}

/// Given the path of a location record, returns the binary it points at if
/// that binary exists, was recorded for `target`, and reports `expected_version`.
pub fn find_valid_binary(
    record_path: &Path,
    expected_version: &str,
    target: &TargetIdentity,
) -> Option<PathBuf> {
    let record = location_store::read(record_path)?;

    if !record.matches_target(target) {
        debug!(
            "Location record {} was written for {:?}/{:?}, not {}",
            record_path.display(),
            record.platform,
            record.architecture,
            target
        );
        return None;
    }

    let base = record_path.parent().unwrap_or_else(|| Path::new("."));
    let resolved = base.join(&record.location);
    if !resolved.is_file() {
        debug!(
            "Recorded binary {} does not exist",
            resolved.display()
        );
        return None;
    }

    check_version(&resolved, expected_version).then_some(resolved)
}

/// Where the package's recorded binary lives, for consumers of an installed
/// package. The location is resolved against `<package_dir>/lib`; absolute
/// locations stay as they are. The binary is made readable and executable
/// for everyone on the way, ignoring failures.
pub fn installed_binary(package_dir: &Path) -> Option<PathBuf> {
    let lib_dir = package_dir.join("lib");
    let record = location_store::read(&lib_dir.join(location_file_name()))?;
    let binary = lib_dir.join(&record.location);
    ensure_executable(&binary);
    Some(binary)
}

#[cfg(unix)]
fn ensure_executable(binary: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let result = std::fs::metadata(binary).and_then(|meta| {
        let mode = meta.permissions().mode() | 0o555;
        std::fs::set_permissions(binary, std::fs::Permissions::from_mode(mode))
    });
    if let Err(e) = result {
        debug!("Could not update mode of {}: {}", binary.display(), e);
    }
}

#[cfg(not(unix))]
fn ensure_executable(_binary: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_version_token() {
        assert_eq!(
            extract_version("sfdx-cli/7.8.1-8f830784cc linux-x64 node-v12.18.3\n"),
            Some("7.8.1-8f830784cc")
        );
        assert_eq!(
            extract_version("sfdx-cli/5.99.1-d7efd75 darwin-x64"),
            Some("5.99.1-d7efd75")
        );
    }

    #[test]
    fn version_requires_trailing_whitespace_and_prefix() {
        assert_eq!(extract_version("sfdx-cli/7.8.1"), None);
        assert_eq!(extract_version("heroku/7.8.1 linux-x64"), None);
        assert_eq!(extract_version(""), None);
    }

    #[test]
    fn missing_record_is_not_a_valid_binary() {
        let target = TargetIdentity::from_overrides(Some("linux"), Some("x64"));
        assert_eq!(
            find_valid_binary(Path::new("./blargh"), "5.99.1-d7efd75", &target),
            None
        );
    }

    #[test]
    fn non_executable_binary_fails_version_check() {
        assert!(!check_version(Path::new("/definitely/not/here/sfdx"), "1.0.0"));
    }

    #[cfg(unix)]
    #[test]
    fn installed_binary_resolves_against_lib_and_opens_mode() {
        use std::os::unix::fs::PermissionsExt;

        use sfp_common::model::LocationRecord;

        let pkg = tempfile::tempdir().unwrap();
        let binary = pkg.path().join("lib/sfdx/bin/sfdx");
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o600)).unwrap();
        location_store::write(
            &pkg.path().join("lib/location.js"),
            &LocationRecord::for_target(
                "sfdx/bin/sfdx",
                &TargetIdentity::from_overrides(Some("linux"), Some("x64")),
            ),
        )
        .unwrap();

        assert_eq!(installed_binary(pkg.path()), Some(binary.clone()));
        let mode = std::fs::metadata(&binary).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn installed_binary_without_record_is_none() {
        let pkg = tempfile::tempdir().unwrap();
        assert_eq!(installed_binary(pkg.path()), None);
    }
}
