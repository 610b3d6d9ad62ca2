//! Timeline pagination.
//!
//! Provides:
//! - The `TimelineSource` seam over the remote API
//! - Opaque cursors and pages
//! - A restartable, retrying paginator

pub mod paginator;
pub mod source;

pub use paginator::TimelinePaginator;
pub use source::{TimelineCursor, TimelinePage, TimelineSource};
