//! Command-line interface.

pub mod args;
pub mod interrupt;

pub use args::{Args, VideoBackendArg};
pub use interrupt::{handle_interrupt, Interrupt};
