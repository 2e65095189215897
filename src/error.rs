use std::fmt;

/// Errors that can occur while talking to the tracking runtime.
#[derive(Debug, thiserror::Error)]
pub enum VrTrackError {
    #[error("Tracking runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Pose query failed: {0}")]
    PoseQuery(String),

    #[error("Malformed transform for device {index}")]
    MalformedTransform { index: u32 },

    #[error("Device {index} query failed: {reason}")]
    DeviceQuery { index: u32, reason: String },

    #[error("Controller state for device {index} unavailable: {reason}")]
    ControllerState { index: u32, reason: String },

    #[error("Runtime does not support {0}")]
    Unsupported(&'static str),

    #[error("Failed to spawn polling thread: {0}")]
    ThreadSpawn(String),

    #[error("Tracking runtime already released")]
    RuntimeReleased,
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &VrTrackError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
