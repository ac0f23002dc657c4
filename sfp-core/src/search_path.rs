// sfp-core/src/search_path.rs
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Embedded in the package's own launcher script so it is never mistaken for
/// a real install when found on PATH.
pub const SHIM_SENTINEL: &str = "SFDX_PREBUILT_SHIM";

/// Written into launchers of npm-global installs of this package.
pub const NPM_INSTALL_MARKER: &str = "NPM_INSTALL_MARKER";

#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

/// Drops `node_modules` bin directories and `./bin` from a PATH value so the
/// lookup finds real installs rather than npm-managed shims.
pub fn clean_search_path(path: &str) -> String {
    path.split(PATH_SEPARATOR)
        .filter(|entry| !entry.contains("node_modules"))
        .filter(|entry| *entry != "./bin")
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string())
}

/// Looks up `binary_name` on the cleaned search path.
pub fn find_on_path(binary_name: &str, search_path: Option<&str>) -> Option<PathBuf> {
    let cleaned = clean_search_path(search_path.unwrap_or_default());
    if cleaned.is_empty() {
        debug!("Search path is empty after cleaning");
        return None;
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match which::which_in(binary_name, Some(&cleaned), cwd) {
        Ok(path) => Some(path),
        Err(e) => {
            debug!("{} not found on PATH: {}", binary_name, e);
            None
        }
    }
}

/// Whether `found` is this package's own launcher. Matches either the npm
/// global layout (`npm/<package>`) or the sentinel embedded in the shim.
pub fn is_own_shim(found: &Path, contents: &str, package_name: &str) -> bool {
    let display = found.to_string_lossy();
    let layout_hit = display.contains(&format!("npm/{package_name}"))
        || display.contains(&format!("npm\\{package_name}"));
    layout_hit || contents.contains(SHIM_SENTINEL)
}

/// Reads a found launcher as text. Binaries are read lossily; the markers we
/// look for are ASCII.
pub fn read_launcher(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
