//! Configuration module for the timeline downloader.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Video backend selection
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{ApiConfig, Config, OptionsConfig};
pub use modes::VideoBackend;
pub use validation::{validate_config, validate_profile_id};
