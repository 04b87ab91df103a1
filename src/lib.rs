//! # exifcheck
//!
//! A command-line tool that validates JPG/HEIC images and extracts their EXIF metadata.
//!
//! The core is a pure, per-call metadata extractor: given a path it reports
//! whether the file is a supported image, whether it carries embedded
//! metadata, and (on request) a normalized record of capture dates, camera
//! and lens details, and GPS position in decimal degrees.
//!
//! ## Features
//!
//! - Extension allow-list check that never touches the disk for other files
//! - JPEG header decoding, and HEIF through libheif with the `heif` feature
//! - EXIF tag resolution through fixed main and GPS dictionaries
//! - DMS to decimal degree conversion with per-field failure isolation
//! - Folder scanning, JPEG export and batch saving helpers for the CLI

pub mod config;
pub mod decode;
pub mod export;
pub mod folder;
pub mod gps;
pub mod metadata;
pub mod mock;
pub mod tags;

pub use metadata::{
    ExtractMode, ImageMetadata, Inspection, check_validity, extract_metadata, inspect,
};
