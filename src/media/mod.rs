//! Media module for descriptor representation and extraction.

pub mod descriptor;
pub mod extractor;

pub use descriptor::{DownloadStatus, MediaDescriptor, MediaKind};
pub use extractor::MediaExtractor;
