//! # Error Types
//!
//! Custom error types for VISCA Joystick using `thiserror`.

use thiserror::Error;

/// Main error type for VISCA Joystick
#[derive(Debug, Error)]
pub enum ViscaJoystickError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No supported joystick is attached
    #[error("No joystick or game controller found")]
    ControllerNotFound,

    /// Controller input errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// A physical input index has no runtime object behind it
    #[error("Unbound {kind} index {index}")]
    UnboundInput {
        /// Input kind ("button", "axis" or "hat")
        kind: &'static str,
        /// Raw physical index reported by the device
        index: usize,
    },

    /// Relay socket errors
    #[error("Relay error: {0}")]
    Relay(String),
}

/// Result type alias for VISCA Joystick
pub type Result<T> = std::result::Result<T, ViscaJoystickError>;
