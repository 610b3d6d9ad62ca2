//! Ctrl-C handling.

use tokio_util::sync::CancellationToken;

/// What an interrupt should do to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Stop dispatching and let in-flight downloads finish.
    Cancel,
    /// The run was already winding down; exit now.
    ForceQuit,
}

/// Escalate an interrupt: the first one cancels the run, any later one
/// asks for an immediate exit.
pub fn handle_interrupt(cancel: &CancellationToken) -> Interrupt {
    if cancel.is_cancelled() {
        return Interrupt::ForceQuit;
    }
    cancel.cancel();
    Interrupt::Cancel
}
