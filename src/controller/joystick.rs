//! # Joystick Module
//!
//! Discovery and opening of joysticks and game controllers through the
//! Linux evdev interface.
//!
//! ## Detection
//!
//! An input device counts as a joystick when it reports at least one key in
//! the joystick/gamepad block (`BTN_JOYSTICK..BTN_DIGI`) and at least one
//! absolute axis. Auto-detection scans `/dev/input/event*` in sorted order
//! and picks the first match; a configured device path skips the scan.
//!
//! The device class (game controller or flight joystick) is decided later by
//! the session from the axis count in [`Joystick::info`].

use std::path::{Path, PathBuf};

use evdev::{Device, EventStream};
use tracing::{debug, info};

use super::mapper::{AxisRange, EventMapper, InputLayout};
use super::session::DeviceInfo;
use crate::error::{Result, ViscaJoystickError};

/// Directory scanned for input devices.
const INPUT_DIR: &str = "/dev/input";

/// An opened joystick and its index layout.
pub struct Joystick {
    device: Device,
    path: PathBuf,
    name: String,
    layout: InputLayout,
}

impl std::fmt::Debug for Joystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joystick")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("layout", &self.layout)
            .finish()
    }
}

impl Joystick {
    /// Opens the configured device, or the first joystick found.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no joystick present
    /// - `Controller`: the configured device cannot be opened or is not a joystick
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use visca_joystick::controller::joystick::Joystick;
    ///
    /// let joystick = Joystick::open(None)?;
    /// println!("Using {} at {}", joystick.name(), joystick.path().display());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(device_path: Option<&str>) -> Result<Self> {
        match device_path {
            Some(path) => Self::open_path(Path::new(path)),
            None => Self::scan(),
        }
    }

    /// Opens a specific `/dev/input/eventN` node.
    pub fn open_path(path: &Path) -> Result<Self> {
        let device = Device::open(path).map_err(|e| {
            ViscaJoystickError::Controller(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let joystick = Self::from_device(device, path)?;
        if !joystick.layout.is_joystick() {
            return Err(ViscaJoystickError::Controller(format!(
                "{} ({}) is not a joystick",
                path.display(),
                joystick.name
            )));
        }
        Ok(joystick)
    }

    fn scan() -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);
        if !input_dir.exists() {
            return Err(ViscaJoystickError::Controller(format!("{} directory not found", INPUT_DIR)));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| ViscaJoystickError::Controller(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ViscaJoystickError::Controller(format!("Failed to read directory entry: {}", e)))?;
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();
            let is_event_node = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("event"));
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => match Self::from_device(device, &path) {
                    Ok(joystick) if joystick.layout.is_joystick() => {
                        info!("Found joystick {} at {}", joystick.name, path.display());
                        return Ok(joystick);
                    }
                    Ok(other) => debug!("Skipping {} ({})", path.display(), other.name),
                    Err(e) => debug!("Could not inspect {}: {}", path.display(), e),
                },
                Err(e) => debug!("Could not open {}: {}", path.display(), e),
            }
        }

        Err(ViscaJoystickError::ControllerNotFound)
    }

    fn from_device(device: Device, path: &Path) -> Result<Self> {
        let name = device.name().unwrap_or("Unknown device").to_string();
        let keys: Vec<u16> = device
            .supported_keys()
            .map(|keys| keys.iter().map(|key| key.code()).collect())
            .unwrap_or_default();

        let axes = match device.supported_absolute_axes() {
            Some(supported) => {
                let state = device.get_abs_state().map_err(|e| {
                    ViscaJoystickError::Controller(format!("Failed to read axis ranges: {}", e))
                })?;
                supported
                    .iter()
                    .filter_map(|axis| {
                        state
                            .get(usize::from(axis.0))
                            .map(|info| AxisRange::new(axis.0, info.minimum, info.maximum))
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        let layout = InputLayout::new(keys, axes);
        Ok(Self {
            device,
            path: path.to_path_buf(),
            name,
            layout,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn layout(&self) -> &InputLayout {
        &self.layout
    }

    /// Counts reported to the session on attach.
    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        self.layout.device_info(&self.name)
    }

    /// Converts into an async event stream and its matching mapper.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn into_parts(self) -> Result<(EventStream, EventMapper)> {
        let stream = self.device.into_event_stream().map_err(|e| {
            ViscaJoystickError::Controller(format!("Failed to start event stream: {}", e))
        })?;
        Ok((stream, EventMapper::new(self.layout)))
    }
}
