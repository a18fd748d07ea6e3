//! Archive expansion and cleanup.
//!
//! A downloaded archive at `<dir>/<name>.zip` is expanded into the sibling
//! directory `<dir>/<name>/`. Once expanded, [`clean`] can delete the
//! archives to reclaim disk space.

use std::{
    fs::{self, File},
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
};

use zip::ZipArchive;

use crate::error::DatasetError;

/// Extension of the dataset's annotation archives (without the dot).
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Archive formats that [`expand`] understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArchiveFormat {
    Zip,
}

impl ArchiveFormat {
    /// Infer the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case(ARCHIVE_EXTENSION) {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Returns `true` if `path` is an archive [`expand`] understands.
///
/// Same rule as [`ArchiveFormat::from_path`], so every archive that can be
/// expanded can also be cleaned.
pub fn has_archive_extension(path: &Path) -> bool {
    ArchiveFormat::from_path(path).is_some()
}

/// The directory an archive expands into: its path without the extension.
pub fn unpack_destination(archive_path: &Path) -> PathBuf {
    archive_path.with_extension("")
}

/// Expand an archive into its sibling [`unpack_destination`].
///
/// Returns the destination directory. Expanding into a directory that
/// already holds files merges with or fails on the existing content, so do
/// not expand the same archive twice.
///
/// # Errors
///
/// Returns [`DatasetError::Unpack`] if the archive is missing, corrupt, or
/// not a supported format.
pub fn expand(archive_path: &Path) -> Result<PathBuf, DatasetError> {
    let destination = unpack_destination(archive_path);
    let unpack_error = |reason: String| DatasetError::Unpack {
        path: archive_path.to_path_buf(),
        reason,
    };

    log::debug!(
        "Unarchiving {} into {}",
        archive_path.display(),
        destination.display()
    );

    match ArchiveFormat::from_path(archive_path) {
        Some(ArchiveFormat::Zip) => {
            let file = File::open(archive_path).map_err(|error| unpack_error(error.to_string()))?;
            let mut archive =
                ZipArchive::new(BufReader::new(file)).map_err(|error| unpack_error(error.to_string()))?;
            fs::create_dir_all(&destination).map_err(|error| unpack_error(error.to_string()))?;
            archive
                .extract(&destination)
                .map_err(|error| unpack_error(error.to_string()))?;
            log::debug!(
                "Unpacked {} entries from {}",
                archive.len(),
                archive_path.display()
            );
        }
        None => return Err(unpack_error("unsupported archive format".to_string())),
    }

    Ok(destination)
}

/// Delete every archive among `paths`; other paths are never touched.
///
/// An archive that is already gone counts as cleaned, so this can run more
/// than once over the same list. Returns the number of files deleted by
/// this call.
///
/// # Errors
///
/// Returns [`DatasetError::Io`] if an existing archive cannot be removed.
pub fn clean<I, P>(paths: I) -> Result<usize, DatasetError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut removed = 0;

    for path in paths {
        let path = path.as_ref();
        if !has_archive_extension(path) {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                log::debug!("Removed archive {}", path.display());
                removed += 1;
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                log::debug!("Archive {} already removed", path.display());
            }
            Err(error) => return Err(DatasetError::Io(error)),
        }
    }

    Ok(removed)
}
