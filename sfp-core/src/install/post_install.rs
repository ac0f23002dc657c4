// sfp-core/src/install/post_install.rs
use std::path::Path;
use std::process::{Command, Output, Stdio};

use sfp_common::error::{Result, SfpError};
use sfp_common::model::TargetIdentity;
use tracing::{debug, info, warn};

const INSTALLER_SCRIPT: &str = "install";

fn run(program: &str, args: &[&Path]) -> std::io::Result<Output> {
    debug!("Running command: {} {:?}", program, args);
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
}

fn describe_failure(result: &std::io::Result<Output>) -> String {
    match result {
        Ok(output) => format!(
            "exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => e.to_string(),
    }
}

/// Runs the bundled `install` script on POSIX targets, retrying once through
/// `sudo` if the plain run fails.
pub fn run_post_install(install_dir: &Path, target: &TargetIdentity) -> Result<()> {
    if !target.is_posix() {
        debug!("No post-install step for {}", target);
        return Ok(());
    }

    let installer = install_dir.join(INSTALLER_SCRIPT);
    if !installer.is_file() {
        debug!(
            "No post-install script at {}; skipping",
            installer.display()
        );
        return Ok(());
    }

    info!("Installing sfdx using {}", installer.display());
    let first = run(&installer.to_string_lossy(), &[]);
    if first.as_ref().is_ok_and(|o| o.status.success()) {
        return Ok(());
    }
    warn!(
        "{} failed ({}); retrying with sudo",
        installer.display(),
        describe_failure(&first)
    );

    let elevated = run("sudo", &[installer.as_path()]);
    if elevated.as_ref().is_ok_and(|o| o.status.success()) {
        return Ok(());
    }
    Err(SfpError::CommandExec(format!(
        "sudo {} {}",
        installer.display(),
        describe_failure(&elevated)
    )))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn non_posix_targets_skip_the_script() {
        let dir = tempdir().unwrap();
        let target = TargetIdentity::from_overrides(Some("win32"), Some("x64"));
        assert!(run_post_install(dir.path(), &target).is_ok());
    }

    #[test]
    fn missing_script_is_skipped() {
        let dir = tempdir().unwrap();
        let target = TargetIdentity::from_overrides(Some("linux"), Some("x64"));
        assert!(run_post_install(dir.path(), &target).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn successful_script_runs_once() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let script = dir.path().join("install");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho ran >> '{}'\n", dir.path().join("log").display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let target = TargetIdentity::from_overrides(Some("linux"), Some("x64"));
        run_post_install(dir.path(), &target).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("log")).unwrap(),
            "ran\n"
        );
    }
}
