use thiserror::Error;

use crate::pin::PinId;

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("Could not read pin {pin}: {reason}")]
    IoFailure { pin: PinId, reason: String },
    #[error("Unknown input event: {0}")]
    InvalidEvent(u8),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Input not found: {0}")]
    NotFoundInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GpioError {
    pub fn io(pin: PinId, reason: impl ToString) -> Self {
        GpioError::IoFailure {
            pin,
            reason: reason.to_string(),
        }
    }
}
