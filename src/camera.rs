//! # Camera Module
//!
//! Collaborator interfaces for the PTZ camera driver and the video switcher,
//! plus dry-run implementations that log every command.
//!
//! The actions layer only talks to these traits. A real deployment plugs in
//! a VISCA-over-IP driver and a switcher client; the dry-run versions make
//! the binary usable for checking a controller layout without hardware.
//!
//! ## Usage
//!
//! ```
//! use visca_joystick::camera::{CameraConnector, TracingConnector};
//!
//! let connector = TracingConnector;
//! let mut camera = connector.connect("10.100.1.202", 52381)?;
//! camera.pan_tilt(5, -3)?;
//! camera.recall_preset(0)?;
//! camera.close()?;
//! # Ok::<(), visca_joystick::camera::CameraError>(())
//! ```

use std::fmt;

use thiserror::Error;
use tracing::info;

/// Failure reported by a camera or switcher collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// The camera answered with an error for the command
    #[error("Camera rejected command: {0}")]
    Rejected(String),

    /// The camera could not be reached
    #[error("Camera unavailable: {0}")]
    Unavailable(String),
}

/// Focus control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Auto,
    Manual,
}

/// Auto-exposure mode. Brightness changes need full auto, the only mode
/// the handlers select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    Auto,
}

/// White balance mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteBalanceMode {
    Auto,
    /// One-push mode; the camera holds the last calibration.
    OnePush,
    /// Triggers a one-push calibration.
    OnePushTrigger,
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusMode::Auto => write!(f, "auto"),
            FocusMode::Manual => write!(f, "manual"),
        }
    }
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExposureMode::Auto => write!(f, "auto"),
        }
    }
}

impl fmt::Display for WhiteBalanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WhiteBalanceMode::Auto => "auto",
            WhiteBalanceMode::OnePush => "one push",
            WhiteBalanceMode::OnePushTrigger => "one push trigger",
        };
        write!(f, "{}", name)
    }
}

/// Commands the actions layer issues to one camera.
///
/// Speeds are signed camera units; zero stops the movement. Preset numbers
/// are zero-based.
#[cfg_attr(test, mockall::automock)]
pub trait CameraDriver: Send {
    fn pan_tilt(&mut self, pan_speed: i32, tilt_speed: i32) -> Result<(), CameraError>;
    fn zoom(&mut self, speed: i32) -> Result<(), CameraError>;
    fn manual_focus(&mut self, speed: i32) -> Result<(), CameraError>;
    fn set_focus_mode(&mut self, mode: FocusMode) -> Result<(), CameraError>;
    fn set_autoexposure_mode(&mut self, mode: ExposureMode) -> Result<(), CameraError>;
    fn increase_exposure_compensation(&mut self) -> Result<(), CameraError>;
    fn decrease_exposure_compensation(&mut self) -> Result<(), CameraError>;
    fn white_balance_mode(&mut self, mode: WhiteBalanceMode) -> Result<(), CameraError>;
    fn recall_preset(&mut self, preset: u8) -> Result<(), CameraError>;
    fn save_preset(&mut self, preset: u8) -> Result<(), CameraError>;
    fn close(&mut self) -> Result<(), CameraError>;
}

/// Opens a driver for a camera address.
#[cfg_attr(test, mockall::automock)]
pub trait CameraConnector: Send {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn CameraDriver>, CameraError>;
}

/// Sends "location press" notifications to a video switcher.
#[cfg_attr(test, mockall::automock)]
pub trait Switcher: Send {
    fn press_location(&mut self, page: u16, row: u16, column: u16) -> Result<(), CameraError>;
}

/// Dry-run camera that logs each command.
#[derive(Debug, Clone)]
pub struct TracingCamera {
    address: String,
}

impl TracingCamera {
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            address: format!("{}:{}", host, port),
        }
    }
}

impl CameraDriver for TracingCamera {
    fn pan_tilt(&mut self, pan_speed: i32, tilt_speed: i32) -> Result<(), CameraError> {
        info!("[{}] pan/tilt {} {}", self.address, pan_speed, tilt_speed);
        Ok(())
    }

    fn zoom(&mut self, speed: i32) -> Result<(), CameraError> {
        info!("[{}] zoom {}", self.address, speed);
        Ok(())
    }

    fn manual_focus(&mut self, speed: i32) -> Result<(), CameraError> {
        info!("[{}] manual focus {}", self.address, speed);
        Ok(())
    }

    fn set_focus_mode(&mut self, mode: FocusMode) -> Result<(), CameraError> {
        info!("[{}] focus mode {}", self.address, mode);
        Ok(())
    }

    fn set_autoexposure_mode(&mut self, mode: ExposureMode) -> Result<(), CameraError> {
        info!("[{}] exposure mode {}", self.address, mode);
        Ok(())
    }

    fn increase_exposure_compensation(&mut self) -> Result<(), CameraError> {
        info!("[{}] exposure compensation up", self.address);
        Ok(())
    }

    fn decrease_exposure_compensation(&mut self) -> Result<(), CameraError> {
        info!("[{}] exposure compensation down", self.address);
        Ok(())
    }

    fn white_balance_mode(&mut self, mode: WhiteBalanceMode) -> Result<(), CameraError> {
        info!("[{}] white balance {}", self.address, mode);
        Ok(())
    }

    fn recall_preset(&mut self, preset: u8) -> Result<(), CameraError> {
        info!("[{}] recall preset {}", self.address, preset);
        Ok(())
    }

    fn save_preset(&mut self, preset: u8) -> Result<(), CameraError> {
        info!("[{}] save preset {}", self.address, preset);
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        info!("[{}] close", self.address);
        Ok(())
    }
}

/// Connector producing [`TracingCamera`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConnector;

impl CameraConnector for TracingConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn CameraDriver>, CameraError> {
        info!("Connecting to camera at {}:{}", host, port);
        Ok(Box::new(TracingCamera::new(host, port)))
    }
}

/// Dry-run switcher that logs each location press.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSwitcher;

impl Switcher for TracingSwitcher {
    fn press_location(&mut self, page: u16, row: u16, column: u16) -> Result<(), CameraError> {
        info!("Switcher: LOCATION {}/{}/{} PRESS", page, row, column);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(FocusMode::Manual.to_string(), "manual");
        assert_eq!(ExposureMode::Auto.to_string(), "auto");
        assert_eq!(WhiteBalanceMode::OnePushTrigger.to_string(), "one push trigger");
    }

    #[test]
    fn test_error_display() {
        let err = CameraError::Unavailable("timeout".to_string());
        assert_eq!(err.to_string(), "Camera unavailable: timeout");
        let err = CameraError::Rejected("syntax error".to_string());
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_tracing_connector_accepts_every_command() {
        let mut camera = TracingConnector.connect("127.0.0.1", 52381).unwrap();
        assert!(camera.pan_tilt(1, -1).is_ok());
        assert!(camera.zoom(3).is_ok());
        assert!(camera.manual_focus(-2).is_ok());
        assert!(camera.set_focus_mode(FocusMode::Auto).is_ok());
        assert!(camera.set_autoexposure_mode(ExposureMode::Auto).is_ok());
        assert!(camera.increase_exposure_compensation().is_ok());
        assert!(camera.decrease_exposure_compensation().is_ok());
        assert!(camera.white_balance_mode(WhiteBalanceMode::Auto).is_ok());
        assert!(camera.recall_preset(0).is_ok());
        assert!(camera.save_preset(7).is_ok());
        assert!(camera.close().is_ok());
    }

    #[test]
    fn test_tracing_switcher() {
        assert!(TracingSwitcher.press_location(99, 0, 1).is_ok());
    }
}
