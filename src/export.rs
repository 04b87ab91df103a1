//! Saving images to a destination of the user's choice.
//!
//! A `.jpg`/`.jpeg` destination gets a re-encoded RGB JPEG; anything else, or a
//! source that can't be decoded, is copied byte for byte. A batch save into a
//! folder keeps each file's name and never overwrites an existing file.

use anyhow::{Context, Result};
use image::ImageReader;
use image::codecs::jpeg::JpegEncoder;
use log::{debug, info, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default JPEG quality for converted exports
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// How an export was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Decoded and re-encoded as JPEG
    Converted,
    /// JPEG destination, but the source couldn't be converted so it was copied
    CopiedFallback,
    /// Non-JPEG destination, plain copy
    Copied,
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExportOutcome::Converted => "Saved (converted)",
            ExportOutcome::CopiedFallback => "Saved by copy (fallback)",
            ExportOutcome::Copied => "Saved",
        };
        write!(f, "{}", text)
    }
}

/// Save `src` to `dest`, converting to JPEG when the destination asks for it
pub fn export_image(src: &Path, dest: &Path, quality: u8) -> Result<ExportOutcome> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create destination directory {}", parent.display())
            })?;
        }
    }

    let wants_jpeg = dest
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

    if !wants_jpeg {
        copy_file(src, dest)?;
        return Ok(ExportOutcome::Copied);
    }

    match convert_to_jpeg(src, dest, quality.clamp(1, 100)) {
        Ok(()) => {
            info!("Converted {} to {}", src.display(), dest.display());
            Ok(ExportOutcome::Converted)
        }
        Err(e) => {
            warn!("Could not convert {}: {:#}; copying instead", src.display(), e);
            copy_file(src, dest)?;
            Ok(ExportOutcome::CopiedFallback)
        }
    }
}

/// Result of saving a batch of images into one folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderExport {
    pub dest_dir: PathBuf,
    /// Destination paths written, in source order
    pub saved: Vec<PathBuf>,
    /// One `"<file name>: <reason>"` line per source that wasn't saved
    pub failures: Vec<String>,
}

impl fmt::Display for FolderExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Saved {} images to:\n{}", self.saved.len(), self.dest_dir.display())?;
        if !self.failures.is_empty() {
            write!(f, "\n\nFailures:\n{}", self.failures.join("\n"))?;
        }
        Ok(())
    }
}

/// Save every source into `dest_dir` under its own file name.
///
/// A name already taken in `dest_dir` gets a short random suffix. A source
/// that is missing or fails to save is recorded in `failures` and the batch
/// carries on.
pub fn export_folder(srcs: &[PathBuf], dest_dir: &Path, quality: u8) -> Result<FolderExport> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create destination folder {}", dest_dir.display()))?;

    let mut result = FolderExport {
        dest_dir: dest_dir.to_path_buf(),
        saved: Vec::new(),
        failures: Vec::new(),
    };

    for src in srcs {
        let Some(file_name) = src.file_name() else {
            result.failures.push(format!("{}: not a file", src.display()));
            continue;
        };
        let name = file_name.to_string_lossy();
        if !src.is_file() {
            result.failures.push(format!("{}: source missing", name));
            continue;
        }

        let dest = free_destination(dest_dir, src);
        match export_image(src, &dest, quality) {
            Ok(outcome) => {
                debug!("{} to {}", outcome, dest.display());
                result.saved.push(dest);
            }
            Err(e) => {
                warn!("Could not save {}: {:#}", src.display(), e);
                result.failures.push(format!("{}: {:#}", name, e));
            }
        }
    }

    info!(
        "Saved {} of {} images to {}",
        result.saved.len(),
        srcs.len(),
        dest_dir.display()
    );
    Ok(result)
}

/// `dest_dir/<name>`, or `dest_dir/<stem>_<6 hex chars>.<ext>` when that is taken
fn free_destination(dest_dir: &Path, src: &Path) -> PathBuf {
    let mut dest = dest_dir.join(src.file_name().unwrap_or_default());
    while dest.exists() {
        let stem = src.file_stem().unwrap_or_default().to_string_lossy();
        let id = Uuid::new_v4().simple().to_string();
        let suffix = &id[..6];
        let name = match src.extension() {
            Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
            None => format!("{}_{}", stem, suffix),
        };
        dest = dest_dir.join(name);
    }
    dest
}

fn convert_to_jpeg(src: &Path, dest: &Path, quality: u8) -> Result<()> {
    let img = ImageReader::open(src)
        .with_context(|| format!("Failed to open {}", src.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("Failed to decode {}", src.display()))?;

    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
    let mut writer = BufWriter::new(
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?,
    );
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .with_context(|| format!("Failed to encode {}", dest.display()))?;
    writer.flush()?;
    Ok(())
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest).with_context(|| {
        format!("Failed to copy {} to {}", src.display(), dest.display())
    })?;
    info!("Copied {} to {}", src.display(), dest.display());
    Ok(())
}
