//! Tests for the exifcheck command-line interface

use assert_cmd::Command;
use exif::Tag;
use exifcheck::mock::{self, MockExif};
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use tempfile::TempDir;

fn exifcheck() -> Command {
    Command::cargo_bin("exifcheck").expect("Failed to find exifcheck binary")
}

#[test]
fn test_init_creates_config() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("exifcheck.yaml");

    exifcheck()
        .arg("init")
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    let content = fs::read_to_string(&config_path)?;
    assert!(content.contains("output"), "Config should contain output");
    assert!(content.contains("jpeg_quality"), "Config should contain jpeg_quality");
    Ok(())
}

#[test]
fn test_init_without_force_keeps_config() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("exifcheck.yaml");
    let initial_content = "output: json\n";
    fs::write(&config_path, initial_content)?;

    exifcheck()
        .arg("init")
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Config file already exists"));
    assert_eq!(fs::read_to_string(&config_path)?, initial_content);

    exifcheck()
        .args(["init", "--force"])
        .current_dir(temp_dir.path())
        .assert()
        .success();
    assert_ne!(fs::read_to_string(&config_path)?, initial_content);
    Ok(())
}

#[test]
fn test_check_reports_each_path() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let exif = MockExif::default().with_text(Tag::Make, "Nikon");
    let good = mock::write_fixture(temp_dir.path(), "good.jpg", &mock::jpeg_with_exif(&exif)?)?;

    exifcheck()
        .arg("check")
        .arg(&good)
        .arg(temp_dir.path().join("other.png"))
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("good.jpg: supported=true has_metadata=true"))
        .stdout(predicate::str::contains("other.png: supported=false has_metadata=false"));
    Ok(())
}

#[test]
fn test_extract_text_panel() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let exif = MockExif::default()
        .with_text(Tag::Model, "iPhone 15 Pro")
        .with_text(Tag::GPSLatitudeRef, "S")
        .with_dms(Tag::GPSLatitude, 33, 52, 4);
    let path = mock::write_fixture(temp_dir.path(), "panel.jpg", &mock::jpeg_with_exif(&exif)?)?;

    exifcheck()
        .arg("extract")
        .arg(&path)
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("iPhone 15 Pro"))
        .stdout(predicate::str::contains("-33.867778"))
        .stdout(predicate::str::contains("Not available"));
    Ok(())
}

#[test]
fn test_extract_json() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let exif = MockExif::default().with_text(Tag::Software, "darktable 4.6");
    let path = mock::write_fixture(temp_dir.path(), "json.jpg", &mock::jpeg_with_exif(&exif)?)?;

    let output = exifcheck()
        .args(["extract", "--json"])
        .arg(&path)
        .current_dir(temp_dir.path())
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone())?;
    let value: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(value["supported"], true);
    assert_eq!(value["metadata"]["program_name"], "darktable 4.6");
    assert!(value["metadata"]["latitude"].is_null());
    Ok(())
}

#[test]
fn test_extract_unsupported_image() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;

    exifcheck()
        .arg("extract")
        .arg(temp_dir.path().join("missing.bmp"))
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Unsupported image"));
    Ok(())
}

#[test]
fn test_scan_lists_images() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let exif = MockExif::default().with_text(Tag::DateTimeOriginal, "2021:03:04 05:06:07");
    mock::write_fixture(temp_dir.path(), "one.jpg", &mock::jpeg_with_exif(&exif)?)?;
    mock::write_fixture(temp_dir.path(), "skip.png", b"")?;

    exifcheck()
        .arg("scan")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 candidate images"))
        .stdout(predicate::str::contains("taken=2021-03-04 05:06:07"));
    Ok(())
}

#[test]
fn test_scan_empty_folder() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;

    exifcheck()
        .arg("scan")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No JPG / HEIC images found"));
    Ok(())
}

#[test]
fn test_export_converts() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let src = mock::write_fixture(temp_dir.path(), "in.jpg", &mock::jpeg_bytes(8, 8)?)?;
    let dest = temp_dir.path().join("saved").join("in_decrypted.jpg");

    exifcheck()
        .arg("export")
        .arg(&src)
        .arg(&dest)
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved (converted)"));
    assert!(dest.exists());
    Ok(())
}

#[test]
fn test_export_dir_reports_summary() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let src = mock::write_fixture(temp_dir.path(), "keep.jpg", &mock::jpeg_bytes(8, 8)?)?;
    let out = temp_dir.path().join("saved");

    exifcheck()
        .args(["export-dir", "--out"])
        .arg(&out)
        .arg(&src)
        .arg(temp_dir.path().join("missing.jpg"))
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 1 images to:"))
        .stdout(predicate::str::contains("Failures:\nmissing.jpg: source missing"));
    assert!(out.join("keep.jpg").exists());
    Ok(())
}

#[test]
fn test_missing_config_error() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let nonexistent_path = temp_dir.path().join("does_not_exist.yaml");

    exifcheck()
        .arg("scan")
        .arg(temp_dir.path())
        .arg("--config")
        .arg(&nonexistent_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
    Ok(())
}
