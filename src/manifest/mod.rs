//! Manifest persistence (`data.json`).

pub mod store;

pub use store::{ManifestRecord, MetadataStore, RunManifest};
