// sfp-core/src/install/mod.rs
//! Acquisition steps: temp dir selection, download, extraction, placement and
//! the post-install script.

pub mod acquire;
pub mod extract;
pub mod place;
pub mod post_install;
pub mod tempdir;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub use acquire::{download, resolve_download_spec};
pub use extract::{extract_archive, extract_artifact, materialize_links, DeferredLink};
pub use place::place_into;
pub use post_install::run_post_install;
pub use tempdir::find_suitable_temp_dir;

pub(crate) fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(unix)]
pub(crate) fn open_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
pub(crate) fn open_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
