use thiserror::Error;

use crate::ticket::Ticket;

/// Rejections raised by the screen state machines.
///
/// None of these are fatal. The shell reports them and the screen keeps its
/// previous state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenError {
    #[error("a {0} request is already in flight")]
    Busy(&'static str),
    #[error("completion for {ticket} does not match the outstanding request")]
    StaleTicket { ticket: Ticket },
    #[error("nothing is outstanding for {ticket}")]
    NotPending { ticket: Ticket },
    #[error("camera permission has not been determined yet")]
    PermissionUnknown,
    #[error("camera permission was denied")]
    PermissionDenied,
    #[error("a photo capture is already in progress")]
    CaptureInProgress,
    #[error("prompt must not be empty")]
    EmptyPrompt,
}
