// sfp-core/src/location_store.rs
//! Persists where the resolved binary lives.
//!
//! The record is a tiny CommonJS module (`lib/location.js`) so the package's
//! runtime entry point can `require` it directly:
//!
//! ```text
//! module.exports.location = "sfdx/bin/sfdx"
//! module.exports.platform = "linux"
//! module.exports.architecture = "x64"
//! ```

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use sfp_common::error::Result;
use sfp_common::model::LocationRecord;
use tracing::{debug, info};

static EXPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*module\.exports\.(\w+)\s*=\s*"((?:[^"\\]|\\.)*)"\s*;?\s*$"#)
        .expect("export line pattern is valid")
});

/// Values interpolated into generated code must be plain alphanumerics.
fn is_safe_identifier_value(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Renders the module text for `record`.
///
/// Platform and architecture are emitted only when both are alphanumeric;
/// otherwise the record degrades to location-only and will not match any
/// target on the next read. Backslashes in the location are escaped for
/// Windows targets.
pub fn render(record: &LocationRecord) -> String {
    let location = if record.platform.as_deref() == Some("win32") {
        record.location.replace('\\', "\\\\")
    } else {
        record.location.clone()
    };
    let mut contents = format!("module.exports.location = \"{location}\"\n");

    if let (Some(platform), Some(arch)) = (&record.platform, &record.architecture) {
        if is_safe_identifier_value(platform) && is_safe_identifier_value(arch) {
            contents.push_str(&format!("module.exports.platform = \"{platform}\"\n"));
            contents.push_str(&format!("module.exports.architecture = \"{arch}\"\n"));
        } else {
            debug!(
                "Omitting platform/architecture from location record: {:?}/{:?} is not alphanumeric",
                platform, arch
            );
        }
    }
    contents
}

/// Writes `record` to `path`, replacing any previous record.
pub fn write(path: &Path, record: &LocationRecord) -> Result<()> {
    info!("Writing {} file", path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render(record))?;
    Ok(())
}

/// Reads the record at `path`. Missing or unparsable files are `None`.
pub fn read(path: &Path) -> Option<LocationRecord> {
    match fs::read_to_string(path) {
        Ok(contents) => parse(&contents),
        Err(e) => {
            debug!("No location record at {}: {}", path.display(), e);
            None
        }
    }
}

pub fn parse(contents: &str) -> Option<LocationRecord> {
    let mut location = None;
    let mut platform = None;
    let mut architecture = None;

    for caps in EXPORT_LINE.captures_iter(contents) {
        let value = unescape(&caps[2]);
        match &caps[1] {
            "location" => location = Some(value),
            "platform" => platform = Some(value),
            // `arch` is what earlier installers wrote.
            "architecture" | "arch" => architecture = Some(value),
            other => debug!("Ignoring unknown location record field '{}'", other),
        }
    }

    location.map(|location| LocationRecord {
        location,
        platform,
        architecture,
    })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn record(location: &str, platform: &str, arch: &str) -> LocationRecord {
        LocationRecord {
            location: location.to_string(),
            platform: Some(platform.to_string()),
            architecture: Some(arch.to_string()),
        }
    }

    #[test]
    fn alphanumeric_record_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lib").join("location.js");
        let original = record("sfdx/bin/sfdx", "linux", "x64");

        write(&path, &original).unwrap();
        assert_eq!(read(&path), Some(original));
    }

    #[test]
    fn non_alphanumeric_metadata_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("location.js");
        write(&path, &record("sfdx/bin/sfdx", "linux\"; evil()", "x64")).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("evil"));
        assert_eq!(
            read(&path),
            Some(LocationRecord {
                location: "sfdx/bin/sfdx".to_string(),
                platform: None,
                architecture: None,
            })
        );
    }

    #[test]
    fn windows_paths_are_escaped_and_decoded() {
        let original = record(r"sfdx\bin\sfdx.exe", "win32", "x64");
        let rendered = render(&original);
        assert!(rendered.contains(r#"module.exports.location = "sfdx\\bin\\sfdx.exe""#));
        assert_eq!(parse(&rendered), Some(original));
    }

    #[test]
    fn legacy_arch_field_is_accepted() {
        let legacy = "module.exports.location = \"sfdx/bin/sfdx\"\n\
                      module.exports.platform = \"darwin\"\n\
                      module.exports.arch = \"x64\"\n";
        assert_eq!(parse(legacy), Some(record("sfdx/bin/sfdx", "darwin", "x64")));
    }

    #[test]
    fn missing_or_garbage_records_are_none() {
        let dir = tempdir().unwrap();
        assert_eq!(read(&dir.path().join("absent.js")), None);
        assert_eq!(parse("this is not a module"), None);
        assert_eq!(parse("module.exports.platform = \"linux\"\n"), None);
    }

    #[test]
    fn write_overwrites_previous_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("location.js");
        write(&path, &record("old/sfdx", "linux", "x64")).unwrap();
        write(&path, &record("/usr/local/bin/sfdx", "linux", "x64")).unwrap();
        assert_eq!(read(&path).unwrap().location, "/usr/local/bin/sfdx");
    }
}
