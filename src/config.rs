//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field has a default, so an empty file yields a
//! working dry-run setup with two camera slots and the relay disabled.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::actions::{ActionSettings, CameraSlot, CAMERA_BANK};
use crate::controller::button::GestureLimits;
use crate::controller::session::SessionSettings;
use crate::controller::speed::SensitivityTables;
use crate::controller::task::InputTaskConfig;
use crate::error::{Result, ViscaJoystickError};

/// Camera slots reachable through the bank buttons.
pub const MAX_CAMERAS: usize = CAMERA_BANK as usize * 2;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub sensitivity: SensitivityTables,
    #[serde(default = "default_cameras")]
    pub cameras: Vec<CameraConfig>,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub switcher: SwitcherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Device node to open; empty picks the first joystick found
    #[serde(default)]
    pub device_path: String,

    /// Overrides the profile dead zone
    #[serde(default)]
    pub dead_zone: Option<f32>,

    #[serde(default)]
    pub double_click_ms: u64,

    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,

    #[serde(default = "default_hat_settle_ms")]
    pub hat_settle_ms: u64,

    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Pan/tilt direction options
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MotionConfig {
    #[serde(default)]
    pub invert_tilt: bool,

    #[serde(default)]
    pub swap_pan: bool,
}

/// One camera slot
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    pub host: String,

    #[serde(default = "default_visca_port")]
    pub port: u16,
}

/// VISCA relay configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_visca_port")]
    pub listen_port: u16,
}

/// Video switcher configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SwitcherConfig {
    #[serde(default = "default_switcher_page")]
    pub page: u16,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            motion: MotionConfig::default(),
            sensitivity: SensitivityTables::default(),
            cameras: default_cameras(),
            relay: RelayConfig::default(),
            switcher: SwitcherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            dead_zone: None,
            double_click_ms: 0,
            long_press_ms: default_long_press_ms(),
            hat_settle_ms: default_hat_settle_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_port: default_visca_port(),
        }
    }
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        Self {
            page: default_switcher_page(),
        }
    }
}

// Default value functions
fn default_long_press_ms() -> u64 { 2000 }
fn default_hat_settle_ms() -> u64 { 100 }
fn default_poll_timeout_ms() -> u64 { 100 }
fn default_reconnect_interval_ms() -> u64 { 1000 }
fn default_visca_port() -> u16 { 52381 }
fn default_switcher_page() -> u16 { 99 }

fn default_cameras() -> Vec<CameraConfig> {
    vec![
        CameraConfig { host: "10.100.1.202".to_string(), port: default_visca_port() },
        CameraConfig { host: "10.100.1.116".to_string(), port: default_visca_port() },
    ]
}

fn invalid(msg: impl std::fmt::Display) -> ViscaJoystickError {
    ViscaJoystickError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use visca_joystick::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing or validation fails
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if let Some(dz) = self.controller.dead_zone {
            if !(0.0..1.0).contains(&dz) {
                return Err(invalid("dead_zone must be at least 0.0 and below 1.0"));
            }
        }

        if self.controller.long_press_ms == 0 {
            return Err(invalid("long_press_ms must be greater than 0"));
        }

        // The input loop needs a bounded wait to notice shutdown
        if self.controller.poll_timeout_ms == 0 || self.controller.poll_timeout_ms > 10000 {
            return Err(invalid("poll_timeout_ms must be between 1 and 10000"));
        }

        if self.controller.reconnect_interval_ms == 0 || self.controller.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        for (name, curve) in self.sensitivity.iter() {
            if let Err(msg) = curve.check() {
                return Err(invalid(format!("sensitivity.{}: {}", name, msg)));
            }
        }

        if self.cameras.is_empty() {
            return Err(invalid("at least one camera must be configured"));
        }

        if self.cameras.len() > MAX_CAMERAS {
            return Err(invalid(format!("at most {} cameras can be configured", MAX_CAMERAS)));
        }

        for (i, camera) in self.cameras.iter().enumerate() {
            if camera.host.is_empty() {
                return Err(invalid(format!("camera {} host cannot be empty", i + 1)));
            }
            if camera.port == 0 {
                return Err(invalid(format!("camera {} port must be non-zero", i + 1)));
            }
        }

        if self.relay.listen_port == 0 {
            return Err(invalid("relay listen_port must be non-zero"));
        }

        Ok(())
    }

    /// Controller settings that survive hot-plug.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            dead_zone: self.controller.dead_zone,
            limits: GestureLimits {
                double_click: Duration::from_millis(self.controller.double_click_ms),
                long_press: Duration::from_millis(self.controller.long_press_ms),
            },
        }
    }

    /// Device selection and timing for the input task.
    #[must_use]
    pub fn task_config(&self) -> InputTaskConfig {
        let device_path = if self.controller.device_path.is_empty() {
            None
        } else {
            Some(self.controller.device_path.clone())
        };

        InputTaskConfig {
            device_path,
            hat_settle: Duration::from_millis(self.controller.hat_settle_ms),
            poll_timeout: Duration::from_millis(self.controller.poll_timeout_ms),
            reconnect_interval: Duration::from_millis(self.controller.reconnect_interval_ms),
        }
    }

    /// Settings for the PTZ action handlers.
    #[must_use]
    pub fn action_settings(&self) -> ActionSettings {
        ActionSettings {
            sensitivity: self.sensitivity.clone(),
            invert_tilt: self.motion.invert_tilt,
            swap_pan: self.motion.swap_pan,
            cameras: self
                .cameras
                .iter()
                .map(|c| CameraSlot::new(&c.host, c.port))
                .collect(),
            switcher_page: self.switcher.page,
        }
    }
}
