//! Folder scanning for exifcheck.
//!
//! Lists the candidate images of a directory the same way the metadata
//! extractor filters them: by extension only. Decoding is left to `inspect`.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::metadata::is_supported_extension;

/// Absolute paths of the supported images in `dir`, sorted.
///
/// With `recursive`, sub-directories are walked too. Entries that can't be
/// read are skipped with a warning.
pub fn scan_folder(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let root = fs::canonicalize(dir)
        .with_context(|| format!("Failed to resolve folder {}", dir.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Not a folder: {}", dir.display());
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images: Vec<PathBuf> = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir() && is_supported_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    images.sort();
    debug!("Found {} candidate images under {}", images.len(), dir.display());
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_filters_by_extension() -> Result<()> {
        let temp_dir = tempdir()?;
        for name in ["b.JPG", "a.jpeg", "c.heic", "d.png", "notes.txt"] {
            fs::write(temp_dir.path().join(name), b"")?;
        }
        fs::create_dir(temp_dir.path().join("nested"))?;
        fs::write(temp_dir.path().join("nested").join("e.jpg"), b"")?;

        let found = scan_folder(temp_dir.path(), false)?;
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpeg", "b.JPG", "c.heic"]);
        assert!(found.iter().all(|p| p.is_absolute()));

        let found = scan_folder(temp_dir.path(), true)?;
        assert_eq!(found.len(), 4);
        Ok(())
    }

    #[test]
    fn test_folder_named_like_an_image_is_skipped() -> Result<()> {
        let temp_dir = tempdir()?;
        fs::create_dir(temp_dir.path().join("album.jpg"))?;
        fs::write(temp_dir.path().join("album.jpg").join("inner.jpg"), b"")?;

        assert!(scan_folder(temp_dir.path(), false)?.is_empty());
        assert_eq!(scan_folder(temp_dir.path(), true)?.len(), 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subfolder_does_not_abort_scan() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir()?;
        fs::write(temp_dir.path().join("top.jpg"), b"")?;
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked)?;
        fs::write(locked.join("hidden.jpg"), b"")?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

        let result = scan_folder(temp_dir.path(), true);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;

        let found = result?;
        assert!(found.iter().any(|p| p.ends_with("top.jpg")));
        Ok(())
    }

    #[test]
    fn test_scan_missing_folder_fails() {
        assert!(scan_folder(Path::new("/nonexistent/folder"), false).is_err());
    }

    #[test]
    fn test_scan_of_a_file_fails() -> Result<()> {
        let temp_dir = tempdir()?;
        let file = temp_dir.path().join("single.jpg");
        fs::write(&file, b"")?;
        assert!(scan_folder(&file, false).is_err());
        Ok(())
    }
}
