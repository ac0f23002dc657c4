// Path: sfp-core/src/install/extract.rs
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use sfp_common::error::{Result, SfpError};
use tar::{Archive, EntryType};
use tracing::{debug, error, info, warn};
use xz2::read::XzDecoder;

use super::{open_permissions, unique_suffix};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarXz,
    TarGz,
    TarBz2,
    Tar,
}

impl ArchiveKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(ArchiveKind::TarXz)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".tbz")
        {
            Some(ArchiveKind::TarBz2)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }
}

/// A link entry held back until every regular entry is on disk, because its
/// target may appear later in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredLink {
    pub link_path: PathBuf,
    pub link_target: PathBuf,
}

/// Unpacks `artifact` into a fresh `<artifact>-extract-<millis>` directory
/// and returns that directory.
pub fn extract_artifact(artifact: &Path) -> Result<PathBuf> {
    let extracted = PathBuf::from(format!(
        "{}-extract-{}",
        artifact.display(),
        unique_suffix()
    ));
    fs::create_dir_all(&extracted)?;
    open_permissions(&extracted)?;

    info!("Decompressing files");
    extract_archive(artifact, &extracted)?;
    info!("Files decompressed");
    Ok(extracted)
}

pub fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<()> {
    let kind = ArchiveKind::from_path(archive_path).ok_or_else(|| {
        SfpError::Extraction(format!(
            "Unsupported archive type for {}",
            archive_path.display()
        ))
    })?;
    debug!(
        "Extracting archive '{}' ({:?}) to '{}'",
        archive_path.display(),
        kind,
        target_dir.display()
    );

    let file = File::open(archive_path).map_err(|e| {
        SfpError::Io(std::sync::Arc::new(io::Error::new(
            e.kind(),
            format!("Failed to open archive {}: {}", archive_path.display(), e),
        )))
    })?;

    let links = match kind {
        ArchiveKind::TarXz => extract_tar_archive(XzDecoder::new(file), target_dir, archive_path),
        ArchiveKind::TarGz => extract_tar_archive(GzDecoder::new(file), target_dir, archive_path),
        ArchiveKind::TarBz2 => extract_tar_archive(BzDecoder::new(file), target_dir, archive_path),
        ArchiveKind::Tar => extract_tar_archive(file, target_dir, archive_path),
    }?;

    info!("Linking files");
    materialize_links(&links);
    Ok(())
}

/// Joins the normal components of `relative` onto `root`, refusing anything
/// that would climb out of it.
fn safe_join(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    for comp in relative.components() {
        match comp {
            Component::Normal(p) => out.push(p),
            Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => return None,
        }
    }
    Some(out)
}

/// Resolves `..` lexically; `None` if the result leaves `root`.
fn normalize_within(root: &Path, path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out.starts_with(root).then_some(out)
}

fn extract_tar_archive<R: Read>(
    reader: R,
    target_dir: &Path,
    archive_path_for_log: &Path,
) -> Result<Vec<DeferredLink>> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let mut deferred_links: Vec<DeferredLink> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result.map_err(|e| {
            SfpError::Extraction(format!(
                "Error reading TAR entry from {}: {}",
                archive_path_for_log.display(),
                e
            ))
        })?;

        let path_in_archive: PathBuf = entry
            .path()
            .map_err(|e| {
                SfpError::Extraction(format!(
                    "Invalid path in TAR entry from {}: {}",
                    archive_path_for_log.display(),
                    e
                ))
            })?
            .into_owned();

        let Some(disk_path) = safe_join(target_dir, &path_in_archive) else {
            let msg = format!(
                "Unsafe path {} in {}",
                path_in_archive.display(),
                archive_path_for_log.display()
            );
            error!("{}", msg);
            errors.push(msg);
            continue;
        };
        if disk_path == target_dir {
            continue;
        }

        if let Some(parent) = disk_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    SfpError::Io(std::sync::Arc::new(io::Error::new(
                        e.kind(),
                        format!("Failed create parent dir {}: {}", parent.display(), e),
                    )))
                })?;
            }
        }

        let entry_type = entry.header().entry_type();
        if matches!(entry_type, EntryType::Link | EntryType::Symlink) {
            match entry.link_name() {
                Ok(Some(link_name)) => {
                    let link_name = link_name.into_owned();
                    // Hard links name their target from the archive root,
                    // symlinks from the directory holding the link.
                    let link_target = if entry_type == EntryType::Link {
                        safe_join(target_dir, &link_name)
                    } else {
                        let base = disk_path.parent().unwrap_or(target_dir);
                        normalize_within(target_dir, &base.join(&link_name))
                    };
                    match link_target {
                        Some(link_target) => {
                            debug!(
                                "Deferring link: '{}' -> '{}'",
                                disk_path.display(),
                                link_target.display()
                            );
                            deferred_links.push(DeferredLink {
                                link_path: disk_path,
                                link_target,
                            });
                        }
                        None => warn!(
                            "Ignoring link {} whose target {} leaves the archive",
                            path_in_archive.display(),
                            link_name.display()
                        ),
                    }
                }
                _ => warn!(
                    "Link entry '{}' in {} has no link target name.",
                    path_in_archive.display(),
                    archive_path_for_log.display()
                ),
            }
            continue;
        }

        match entry.unpack(&disk_path) {
            Ok(_) => debug!("Unpacked TAR entry to: {}", disk_path.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Entry already exists at {}", disk_path.display());
            }
            Err(e) => {
                let msg = format!(
                    "Failed to unpack entry {:?} to {}: {}. Entry type: {:?}",
                    path_in_archive,
                    disk_path.display(),
                    e,
                    entry_type
                );
                error!("{}", msg);
                errors.push(msg);
            }
        }
    }

    if !errors.is_empty() {
        return Err(SfpError::Extraction(format!(
            "Failed during TAR extraction for {} with {} error(s): {}",
            archive_path_for_log.display(),
            errors.len(),
            errors.join("; ")
        )));
    }

    debug!(
        "Finished TAR extraction for {} ({} deferred links)",
        archive_path_for_log.display(),
        deferred_links.len()
    );
    Ok(deferred_links)
}

/// Hard-links every deferred entry. A failed link is retried once after
/// removing whatever occupies the destination; a second failure is logged
/// and skipped.
pub fn materialize_links(links: &[DeferredLink]) {
    for link in links {
        if fs::hard_link(&link.link_target, &link.link_path).is_ok() {
            continue;
        }
        let retried = fs::remove_file(&link.link_path)
            .or_else(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(e)
                }
            })
            .and_then(|_| fs::hard_link(&link.link_target, &link.link_path));
        if let Err(e) = retried {
            warn!(
                "Ignoring link between {} and {} because of exception: {}",
                link.link_target.display(),
                link.link_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_kind_follows_extension() {
        assert_eq!(
            ArchiveKind::from_path(Path::new("/tmp/sfdx-linux-x64.tar.xz")),
            Some(ArchiveKind::TarXz)
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("a.TGZ")),
            Some(ArchiveKind::TarGz)
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("a.tar")),
            Some(ArchiveKind::Tar)
        );
        assert_eq!(ArchiveKind::from_path(Path::new("a.zip")), None);
    }

    #[test]
    fn safe_join_rejects_escapes() {
        let root = Path::new("/x");
        assert_eq!(
            safe_join(root, Path::new("./a/b")),
            Some(PathBuf::from("/x/a/b"))
        );
        assert_eq!(safe_join(root, Path::new("../etc/passwd")), None);
        assert_eq!(safe_join(root, Path::new("/etc/passwd")), None);
    }

    #[test]
    fn symlink_targets_normalize_inside_root() {
        let root = Path::new("/x");
        assert_eq!(
            normalize_within(root, Path::new("/x/pkg/bin/../lib/run.js")),
            Some(PathBuf::from("/x/pkg/lib/run.js"))
        );
        assert_eq!(normalize_within(root, Path::new("/x/../y/file")), None);
    }

    #[test]
    fn links_replace_existing_files_and_skip_unlinkable_targets() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("target.txt");
        fs::write(&target, "T").unwrap();
        let occupied = root.path().join("occupied.txt");
        fs::write(&occupied, "stale").unwrap();
        let subdir = root.path().join("subdir");
        fs::create_dir(&subdir).unwrap();

        let links = vec![
            DeferredLink {
                link_path: occupied.clone(),
                link_target: target.clone(),
            },
            DeferredLink {
                link_path: root.path().join("dangling.txt"),
                link_target: root.path().join("missing.txt"),
            },
            DeferredLink {
                link_path: root.path().join("dirlink"),
                link_target: subdir,
            },
        ];
        materialize_links(&links);

        assert_eq!(fs::read_to_string(&occupied).unwrap(), "T");
        assert!(!root.path().join("dangling.txt").exists());
        assert!(!root.path().join("dirlink").exists());
    }
}
