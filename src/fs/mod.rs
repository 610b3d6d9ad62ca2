//! Filesystem module.
//!
//! Provides:
//! - Output directory layout
//! - Filename validation and part-file naming

pub mod naming;
pub mod paths;

pub use naming::{extension_for_content_type, part_filename, sanitize_filename};
pub use paths::{OutputLayout, MANIFEST_FILENAME};
