use std::fs;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::SpawriousError;

/// Unpacks a gzip tar archive under `target_dir` using the entry paths as
/// stored. The archive is removed afterwards when `delete_after` is set.
pub fn extract_tar_gz(
    archive_path: &Path,
    target_dir: &Path,
    delete_after: bool,
) -> Result<usize, SpawriousError> {
    let extraction_error = |message: String| SpawriousError::Extraction {
        path: archive_path.display().to_string(),
        message,
    };

    let file = fs::File::open(archive_path).map_err(|err| extraction_error(err.to_string()))?;
    fs::create_dir_all(target_dir).map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut unpacked = 0usize;
    let entries = archive
        .entries()
        .map_err(|err| extraction_error(err.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| extraction_error(err.to_string()))?;
        // unpack_in refuses entries that would land outside target_dir
        let inside = entry
            .unpack_in(target_dir)
            .map_err(|err| extraction_error(err.to_string()))?;
        if !inside {
            return Err(extraction_error(
                "archive entry path traversal detected".to_string(),
            ));
        }
        unpacked += 1;
    }
    tracing::info!(archive = %archive_path.display(), unpacked, "archive extracted");

    if delete_after {
        fs::remove_file(archive_path).map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
    }
    Ok(unpacked)
}

/// Lists the immediate children of `dir` sorted by file name.
pub fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>, SpawriousError> {
    let entries = fs::read_dir(dir)
        .map_err(|err| SpawriousError::PathResolution(format!("{}: {err}", dir.display())))?;
    let mut items = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
        items.push(entry.path());
    }
    items.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(items)
}

/// Recursive file listing in sorted order. Symlinked directories are not
/// descended into; symlinked files are listed.
pub fn walk_files_sorted(root: &Path) -> Result<Vec<PathBuf>, SpawriousError> {
    let mut files = Vec::new();
    for path in sorted_children(root)? {
        let file_type = fs::symlink_metadata(&path)
            .map_err(|err| SpawriousError::Filesystem(format!("{}: {err}", path.display())))?
            .file_type();
        if file_type.is_dir() {
            files.extend(walk_files_sorted(&path)?);
        } else if file_type.is_symlink() && path.is_dir() {
            tracing::warn!(path = %path.display(), "skipping symlinked directory");
        } else {
            files.push(path);
        }
    }
    Ok(files)
}
