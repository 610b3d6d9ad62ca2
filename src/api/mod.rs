//! Timeline API module.
//!
//! This module provides:
//! - HTTP client for the timeline REST API and the media CDN
//! - Status-code classification into the error taxonomy
//! - API response types

pub mod client;
pub mod types;

pub use client::{error_for_status, TimelineApi, DEFAULT_USER_AGENT};
pub use types::*;
