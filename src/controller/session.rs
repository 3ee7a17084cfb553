//! # Controller Session Module
//!
//! Owns the runtime buttons, axes and hats for the currently attached
//! device and turns physical events into logical [`ControlEvent`]s for the
//! registered handlers.
//!
//! ## Lifecycle
//!
//! - [`PhysicalEvent::DeviceAdded`] resolves a [`DeviceProfile`] from the
//!   device's axis count and builds fresh runtime arrays. Every physical
//!   index gets a runtime object; indices the profile does not mention are
//!   bound to [`ControlFunction::None`].
//! - [`PhysicalEvent::DeviceRemoved`] drops the arrays. Events arriving
//!   with no device attached are ignored.
//! - Only session settings (dead-zone override, gesture limits) and the
//!   handler table survive a hot swap.
//!
//! ## Thread Safety
//!
//! `ControllerSession` is not internally synchronised. The input task and
//! application code share it behind one `Arc<Mutex<_>>`.
//!
//! ## Usage
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use visca_joystick::controller::profile::ControlFunction;
//! use visca_joystick::controller::session::{
//!     ControlEvent, ControllerSession, DeviceInfo, PhysicalEvent, SessionSettings,
//! };
//!
//! let presses = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&presses);
//!
//! let mut session = ControllerSession::new(SessionSettings::default());
//! session.set_handler(ControlFunction::CameraSelect, Box::new(move |event: &ControlEvent| {
//!     if let ControlEvent::Button(button) = event {
//!         sink.lock().unwrap().push((button.value, button.is_down));
//!     }
//! }));
//!
//! session.handle_event(PhysicalEvent::DeviceAdded(DeviceInfo::new("pad", 11, 6, 1)))?;
//! session.handle_event(PhysicalEvent::ButtonDown(2))?;
//! session.handle_event(PhysicalEvent::ButtonUp(2))?;
//!
//! assert_eq!(*presses.lock().unwrap(), vec![(3, true), (3, false)]);
//! # Ok::<(), visca_joystick::error::ViscaJoystickError>(())
//! ```

use std::time::Instant;

use tracing::{debug, info, warn};

use super::axis::Axis;
use super::button::{Button, ButtonEvent, GestureLimits};
use super::hat::Hat;
use super::profile::{ControlFunction, DeviceProfile, LogicalInput, ProfileEntry};
use crate::error::{Result, ViscaJoystickError};

/// Counts and name reported by a newly attached device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub buttons: usize,
    pub axes: usize,
    pub hats: usize,
}

impl DeviceInfo {
    #[must_use]
    pub fn new(name: &str, buttons: usize, axes: usize, hats: usize) -> Self {
        Self {
            name: name.to_string(),
            buttons,
            axes,
            hats,
        }
    }
}

/// Raw notification from the input source.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalEvent {
    ButtonDown(usize),
    ButtonUp(usize),
    /// Normalised axis sample (`-1.0..=1.0`).
    AxisMotion { axis: usize, value: f32 },
    /// Settled hat position, `y = 1` is up.
    HatMotion { hat: usize, value: (i8, i8) },
    DeviceAdded(DeviceInfo),
    DeviceRemoved,
}

/// Filtered analog sample handed to axis handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEvent {
    pub function: ControlFunction,
    /// Raw index of the axis that moved.
    pub axis: usize,
    /// Filtered, rescaled value of that axis.
    pub value: f32,
    /// Current filtered pan and tilt positions, for [`ControlFunction::PanTilt`].
    pub pan_tilt: Option<(f32, f32)>,
}

/// Logical event delivered to a handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    Button(ButtonEvent),
    Axis(AxisEvent),
}

impl ControlEvent {
    #[must_use]
    pub fn function(&self) -> ControlFunction {
        match self {
            ControlEvent::Button(button) => button.function,
            ControlEvent::Axis(axis) => axis.function,
        }
    }
}

/// Callback bound to one control function.
pub type Handler = Box<dyn FnMut(&ControlEvent) + Send>;

/// Settings that outlive any single device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionSettings {
    /// Overrides the profile's default dead zone.
    pub dead_zone: Option<f32>,
    pub limits: GestureLimits,
}

/// Runtime objects for the attached device.
#[derive(Debug)]
struct AttachedDevice {
    info: DeviceInfo,
    profile: Option<DeviceProfile>,
    buttons: Vec<Button>,
    axes: Vec<Axis>,
    hats: Vec<Hat>,
    pan_axis: Option<usize>,
    tilt_axis: Option<usize>,
    dead_zone: f32,
}

impl AttachedDevice {
    fn setup(info: DeviceInfo, settings: &SessionSettings) -> Self {
        let profile = DeviceProfile::resolve(info.axes);
        let dead_zone = settings
            .dead_zone
            .unwrap_or_else(|| profile.map_or(0.0, DeviceProfile::dead_zone));

        let mut device = Self {
            buttons: vec![Button::unbound(); info.buttons],
            axes: (0..info.axes).map(Axis::unbound).collect(),
            hats: vec![Hat::unbound(); info.hats],
            pan_axis: None,
            tilt_axis: None,
            dead_zone,
            profile,
            info,
        };

        if let Some(profile) = profile {
            device.bind(profile);
        }
        device
    }

    fn bind(&mut self, profile: DeviceProfile) {
        let mut preset_base = None;
        let mut preset_count = 0usize;
        let mut inverted = Vec::new();

        for &(name, entry) in profile.entries() {
            match (name, entry) {
                (LogicalInput::CameraSelect(n), ProfileEntry::Button(i)) => {
                    self.bind_button(i, Button::new(ControlFunction::CameraSelect, n));
                }
                (LogicalInput::BrightnessUp, ProfileEntry::Button(i)) => {
                    self.bind_button(i, Button::new(ControlFunction::BrightnessUp, 0));
                }
                (LogicalInput::BrightnessDown, ProfileEntry::Button(i)) => {
                    self.bind_button(i, Button::new(ControlFunction::BrightnessDown, 0));
                }
                (LogicalInput::AutoFocus, ProfileEntry::Button(i)) => {
                    self.bind_button(i, Button::new(ControlFunction::AutoFocus, 0));
                }
                (LogicalInput::WhiteBalance, ProfileEntry::Button(i)) => {
                    self.bind_button(i, Button::new(ControlFunction::WhiteBalance, 0));
                }
                (LogicalInput::FadeToProgram(_), ProfileEntry::Button(i)) => {
                    self.bind_button(i, Button::new(ControlFunction::FadeToProgram, 0));
                }
                (LogicalInput::Pan, ProfileEntry::Axis(i)) => {
                    if self.bind_axis(i, ControlFunction::PanTilt, self.dead_zone) {
                        self.pan_axis = Some(i);
                    }
                }
                (LogicalInput::Tilt, ProfileEntry::Axis(i)) => {
                    if self.bind_axis(i, ControlFunction::PanTilt, self.dead_zone) {
                        self.tilt_axis = Some(i);
                    }
                }
                (LogicalInput::Zoom, ProfileEntry::Axis(i)) => {
                    self.bind_axis(i, ControlFunction::Zoom, self.dead_zone);
                }
                // Triggers and the throttle rest at one end of their travel,
                // not the centre.
                (LogicalInput::FocusNear, ProfileEntry::Axis(i)) => {
                    self.bind_axis(i, ControlFunction::FocusNear, 0.0);
                }
                (LogicalInput::FocusFar, ProfileEntry::Axis(i)) => {
                    self.bind_axis(i, ControlFunction::FocusFar, 0.0);
                }
                (LogicalInput::Focus, ProfileEntry::Axis(i)) => {
                    self.bind_axis(i, ControlFunction::Focus, 0.0);
                }
                (LogicalInput::InvertAxis, ProfileEntry::Axis(i)) => inverted.push(i),
                (LogicalInput::PresetHat, ProfileEntry::Hat(i)) => {
                    if let Some(slot) = self.hats.get_mut(i) {
                        *slot = Hat::new(ControlFunction::Preset);
                    } else {
                        warn!("Profile hat {} not present on {}", i, self.info.name);
                    }
                }
                (LogicalInput::PresetButtonBase, ProfileEntry::Button(i)) => preset_base = Some(i),
                (LogicalInput::PresetButtonCount, ProfileEntry::Scalar(n)) => {
                    preset_count = n.max(0.0) as usize;
                }
                (LogicalInput::DeadZone | LogicalInput::HelpText | LogicalInput::HelpImage, _) => {}
                (name, entry) => warn!("Ignoring malformed profile entry {:?} = {:?}", name, entry),
            }
        }

        if let Some(base) = preset_base {
            for k in 0..preset_count {
                let preset = u8::try_from(k + 1).unwrap_or(u8::MAX);
                self.bind_button(base + k, Button::new(ControlFunction::Preset, preset));
            }
        }

        for i in inverted {
            if let Some(axis) = self.axes.get_mut(i) {
                *axis = axis.clone().inverted();
            }
        }
    }

    fn bind_button(&mut self, index: usize, button: Button) {
        match self.buttons.get_mut(index) {
            Some(slot) => *slot = button,
            None => warn!("Profile button {} not present on {}", index, self.info.name),
        }
    }

    fn bind_axis(&mut self, index: usize, function: ControlFunction, dead_zone: f32) -> bool {
        match self.axes.get_mut(index) {
            Some(slot) => {
                *slot = Axis::new(function, index, dead_zone);
                true
            }
            None => {
                warn!("Profile axis {} not present on {}", index, self.info.name);
                false
            }
        }
    }

    fn axis_position(&self, index: Option<usize>) -> f32 {
        index
            .and_then(|i| self.axes.get(i))
            .map_or(0.0, Axis::position)
    }
}

/// Live input state plus the handler table.
pub struct ControllerSession {
    settings: SessionSettings,
    handlers: Vec<Option<Handler>>,
    device: Option<AttachedDevice>,
}

impl std::fmt::Debug for ControllerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSession")
            .field("settings", &self.settings)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl ControllerSession {
    /// Creates a session with no device attached and no handlers.
    #[must_use]
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            handlers: (0..ControlFunction::COUNT).map(|_| None).collect(),
            device: None,
        }
    }

    /// Binds `handler` to `function`, replacing any previous one.
    ///
    /// Handlers for [`ControlFunction::None`] are never called.
    pub fn set_handler(&mut self, function: ControlFunction, handler: Handler) {
        self.handlers[function.index()] = Some(handler);
    }

    pub fn clear_handler(&mut self, function: ControlFunction) {
        self.handlers[function.index()] = None;
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Changes the dead-zone override. Applies to the attached device's
    /// centre-returning axes immediately.
    pub fn set_dead_zone_override(&mut self, dead_zone: Option<f32>) {
        self.settings.dead_zone = dead_zone;
        if let Some(device) = self.device.as_mut() {
            device.dead_zone = dead_zone
                .unwrap_or_else(|| device.profile.map_or(0.0, DeviceProfile::dead_zone));
            for axis in &mut device.axes {
                if matches!(axis.function(), ControlFunction::PanTilt | ControlFunction::Zoom) {
                    axis.set_dead_zone(device.dead_zone);
                }
            }
        }
    }

    pub fn set_gesture_limits(&mut self, limits: GestureLimits) {
        self.settings.limits = limits;
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.device.is_some()
    }

    /// Profile of the attached device, `None` if detached or unsupported.
    #[must_use]
    pub fn profile(&self) -> Option<DeviceProfile> {
        self.device.as_ref().and_then(|d| d.profile)
    }

    #[must_use]
    pub fn device_name(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.info.name.as_str())
    }

    /// Effective dead zone of the attached device.
    #[must_use]
    pub fn dead_zone(&self) -> Option<f32> {
        self.device.as_ref().map(|d| d.dead_zone)
    }

    /// Help text for the attached device, empty when there is none.
    #[must_use]
    pub fn help_text(&self) -> &'static str {
        self.profile().map_or("", DeviceProfile::help_text)
    }

    /// Help image path for the attached device, empty when there is none.
    #[must_use]
    pub fn help_image(&self) -> &'static str {
        self.profile().map_or("", DeviceProfile::help_image)
    }

    /// Function bound to a physical button, for diagnostics and the UI.
    #[must_use]
    pub fn button_function(&self, index: usize) -> Option<(ControlFunction, u8)> {
        let button = self.device.as_ref()?.buttons.get(index)?;
        Some((button.function(), button.value()))
    }

    #[must_use]
    pub fn axis_function(&self, index: usize) -> Option<ControlFunction> {
        Some(self.device.as_ref()?.axes.get(index)?.function())
    }

    #[must_use]
    pub fn hat_function(&self, index: usize) -> Option<ControlFunction> {
        Some(self.device.as_ref()?.hats.get(index)?.function())
    }

    /// Handles one physical event using the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ViscaJoystickError::UnboundInput`] if the event names an
    /// index the attached device did not report. That cannot happen for
    /// events produced from the same device and is treated as fatal.
    pub fn handle_event(&mut self, event: PhysicalEvent) -> Result<()> {
        self.handle_event_at(event, Instant::now())
    }

    /// Handles one physical event as if it happened at `now`.
    pub fn handle_event_at(&mut self, event: PhysicalEvent, now: Instant) -> Result<()> {
        match event {
            PhysicalEvent::DeviceAdded(info) => {
                self.attach(info);
                Ok(())
            }
            PhysicalEvent::DeviceRemoved => {
                self.detach();
                Ok(())
            }
            PhysicalEvent::ButtonDown(index) => self.button(index, true, now),
            PhysicalEvent::ButtonUp(index) => self.button(index, false, now),
            PhysicalEvent::AxisMotion { axis, value } => self.axis(axis, value),
            PhysicalEvent::HatMotion { hat, value } => self.hat(hat, value, now),
        }
    }

    fn attach(&mut self, info: DeviceInfo) {
        if self.device.is_some() {
            self.detach();
        }
        let device = AttachedDevice::setup(info, &self.settings);
        match device.profile {
            Some(profile) => info!(
                "Attached {} as {} ({} buttons, {} axes, {} hats, dead zone {})",
                device.info.name,
                profile,
                device.info.buttons,
                device.info.axes,
                device.info.hats,
                device.dead_zone
            ),
            None => warn!(
                "Unsupported device {} with {} axes; input will be ignored",
                device.info.name, device.info.axes
            ),
        }
        self.device = Some(device);
    }

    fn detach(&mut self) {
        if let Some(device) = self.device.take() {
            info!("Detached {}", device.info.name);
        }
    }

    fn button(&mut self, index: usize, down: bool, now: Instant) -> Result<()> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        let limits = self.settings.limits;
        let button = device
            .buttons
            .get_mut(index)
            .ok_or(ViscaJoystickError::UnboundInput { kind: "button", index })?;
        let event = if down {
            button.press_at(now, &limits)
        } else {
            button.release_at(now, &limits)
        };
        if let Some(event) = event {
            dispatch(&mut self.handlers, ControlEvent::Button(event));
        }
        Ok(())
    }

    fn axis(&mut self, index: usize, raw: f32) -> Result<()> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        let axis = device
            .axes
            .get_mut(index)
            .ok_or(ViscaJoystickError::UnboundInput { kind: "axis", index })?;
        let function = axis.function();
        let Some(value) = axis.sample(raw) else {
            return Ok(());
        };
        let pan_tilt = (function == ControlFunction::PanTilt).then(|| {
            (
                device.axis_position(device.pan_axis),
                device.axis_position(device.tilt_axis),
            )
        });
        debug!("Axis {} ({:?}) -> {}", index, function, value);
        dispatch(
            &mut self.handlers,
            ControlEvent::Axis(AxisEvent {
                function,
                axis: index,
                value,
                pan_tilt,
            }),
        );
        Ok(())
    }

    fn hat(&mut self, index: usize, value: (i8, i8), now: Instant) -> Result<()> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        let limits = self.settings.limits;
        let hat = device
            .hats
            .get_mut(index)
            .ok_or(ViscaJoystickError::UnboundInput { kind: "hat", index })?;
        if let Some(event) = hat.update_at(value, now, &limits) {
            dispatch(&mut self.handlers, ControlEvent::Button(event));
        }
        Ok(())
    }
}

fn dispatch(handlers: &mut [Option<Handler>], event: ControlEvent) {
    let function = event.function();
    if function == ControlFunction::None {
        return;
    }
    if let Some(handler) = handlers[function.index()].as_mut() {
        handler(&event);
    }
}
