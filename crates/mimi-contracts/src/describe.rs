use crate::error::ScreenError;
use crate::ticket::{Ticket, TicketCounter};

pub const DESCRIBE_PROMPT: &str = "Tell me about this image.";
pub const DESCRIBE_ALERT_TITLE: &str = "What is this?";
pub const PERMISSION_MESSAGE: &str = "We need your permission to show the camera. If granting \
     permission below doesn't work, make sure the camera path exists and is readable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPermission {
    Unknown,
    Granted,
    Denied,
}

impl CameraPermission {
    pub fn as_str(self) -> &'static str {
        match self {
            CameraPermission::Unknown => "unknown",
            CameraPermission::Granted => "granted",
            CameraPermission::Denied => "denied",
        }
    }
}

/// A single shot, consumed by exactly one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescribeView {
    /// Permission not known yet.
    Blank,
    PermissionPrompt { message: &'static str },
    Camera { loading: bool },
}

#[derive(Debug, Clone)]
pub struct DescribeState {
    permission: CameraPermission,
    capturing: Option<Ticket>,
    tickets: TicketCounter,
}

impl Default for DescribeState {
    fn default() -> Self {
        Self::new()
    }
}

impl DescribeState {
    pub fn new() -> Self {
        Self {
            permission: CameraPermission::Unknown,
            capturing: None,
            tickets: TicketCounter::default(),
        }
    }

    pub fn permission(&self) -> CameraPermission {
        self.permission
    }

    /// Returns true when the permission actually changed.
    pub fn set_permission(&mut self, permission: CameraPermission) -> bool {
        let changed = self.permission != permission;
        self.permission = permission;
        changed
    }

    pub fn is_loading(&self) -> bool {
        self.capturing.is_some()
    }

    pub fn view(&self) -> DescribeView {
        match self.permission {
            CameraPermission::Unknown => DescribeView::Blank,
            CameraPermission::Denied => DescribeView::PermissionPrompt {
                message: PERMISSION_MESSAGE,
            },
            CameraPermission::Granted => DescribeView::Camera {
                loading: self.is_loading(),
            },
        }
    }

    /// Starts a capture. Only one may be outstanding.
    pub fn begin_capture(&mut self) -> Result<Ticket, ScreenError> {
        match self.permission {
            CameraPermission::Unknown => return Err(ScreenError::PermissionUnknown),
            CameraPermission::Denied => return Err(ScreenError::PermissionDenied),
            CameraPermission::Granted => {}
        }
        if self.capturing.is_some() {
            return Err(ScreenError::CaptureInProgress);
        }
        let ticket = self.tickets.issue();
        self.capturing = Some(ticket);
        Ok(ticket)
    }

    /// Clears the loading flag whether the capture succeeded or not.
    pub fn finish_capture(&mut self, ticket: Ticket) -> Result<(), ScreenError> {
        match self.capturing {
            Some(current) if current == ticket => {
                self.capturing = None;
                Ok(())
            }
            Some(_) => Err(ScreenError::StaleTicket { ticket }),
            None => Err(ScreenError::NotPending { ticket }),
        }
    }
}
