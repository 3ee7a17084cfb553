//! # Device Profile Module
//!
//! Declarative tables describing how a physical input device's raw indices
//! map to logical camera-control functions.
//!
//! Two device classes are supported:
//!
//! | Class | Axes | Presets | Notes |
//! |-------|------|---------|-------|
//! | Game controller | 6 | D-pad (hat 0), presets 1-8 | Xbox-style layout |
//! | Flight joystick | 4 | Buttons 6-11, presets 1-6 | Stick + twist + throttle |
//!
//! The class is chosen from the number of analog axes the device reports;
//! anything else is unsupported and gets no bindings.
//!
//! ## Usage
//!
//! ```
//! use visca_joystick::controller::profile::{DeviceProfile, LogicalInput, ProfileEntry};
//!
//! let profile = DeviceProfile::resolve(6).unwrap();
//! assert_eq!(profile, DeviceProfile::GameController);
//! assert_eq!(profile.lookup(LogicalInput::Pan), Some(ProfileEntry::Axis(0)));
//! assert!(DeviceProfile::resolve(3).is_none());
//! ```

use std::fmt;

/// Semantic action a physical control is bound to.
///
/// The discriminant doubles as the index into the session's handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFunction {
    /// Unbound slot; events are silently dropped.
    None = 0,
    CameraSelect,
    BrightnessUp,
    BrightnessDown,
    Preset,
    FadeToProgram,
    AutoFocus,
    WhiteBalance,
    PanTilt,
    Zoom,
    FocusNear,
    FocusFar,
    /// Throttle lever driving focus from its back stop.
    Focus,
}

impl ControlFunction {
    /// Number of control functions, including [`ControlFunction::None`].
    pub const COUNT: usize = 13;

    /// Every control function in discriminant order.
    pub const ALL: [ControlFunction; Self::COUNT] = [
        ControlFunction::None,
        ControlFunction::CameraSelect,
        ControlFunction::BrightnessUp,
        ControlFunction::BrightnessDown,
        ControlFunction::Preset,
        ControlFunction::FadeToProgram,
        ControlFunction::AutoFocus,
        ControlFunction::WhiteBalance,
        ControlFunction::PanTilt,
        ControlFunction::Zoom,
        ControlFunction::FocusNear,
        ControlFunction::FocusFar,
        ControlFunction::Focus,
    ];

    /// Index into a handler table.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Logical input names a profile can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalInput {
    /// Camera select button for slot 1-4.
    CameraSelect(u8),
    BrightnessUp,
    BrightnessDown,
    AutoFocus,
    WhiteBalance,
    /// Fade preview to program; profiles may declare several.
    FadeToProgram(u8),
    Pan,
    Tilt,
    Zoom,
    /// Trigger-style axis: rests at its minimum, travel drives focus near.
    FocusNear,
    /// Trigger-style axis: rests at its minimum, travel drives focus far.
    FocusFar,
    /// Throttle lever: rests at its back stop, pushing forward drives focus far.
    Focus,
    /// Axis whose sign is reported flipped.
    InvertAxis,
    /// Hat whose eight directions recall presets 1-8.
    PresetHat,
    /// First button of a contiguous run of preset buttons.
    PresetButtonBase,
    /// Number of buttons in the preset run.
    PresetButtonCount,
    /// Default dead zone for analog axes.
    DeadZone,
    HelpText,
    HelpImage,
}

/// Physical input kind and value a logical input resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileEntry {
    Button(usize),
    Axis(usize),
    Hat(usize),
    Scalar(f32),
    Text(&'static str),
    Path(&'static str),
}

/// Supported physical device classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProfile {
    /// Twin-stick game controller (6 axes, 1 hat).
    GameController,
    /// Flight joystick with twist and throttle (4 axes).
    FlightJoystick,
}

const GAME_CONTROLLER_HELP: &str = "\
VISCA Controller - control IP PTZ cameras using a Game Controller

Pan & Tilt: Left stick
Zoom: Right stick
Brightness: Left bumper: Increase, Right: Decrease
Manual Focus: Left trigger: Near, Right: Far
Select Camera: A, B, X, Y = 1:4; Long press = 5:8
Fade Preview to Program: Push left or right stick
Back button: AutoFocus
Start button: short press = one push white balance, long press = auto white balance
D-pad: short press = recall preset 1-8, long press = set preset 1-8
";

const FLIGHT_JOYSTICK_HELP: &str = "\
VISCA Controller - control IP PTZ cameras using a Flight Joystick

Pan & Tilt: Stick
Zoom: Twist
Manual Focus: Throttle lever pushed forward = far, pulled fully back = stop
Select Camera: Buttons 3-6 = 1:4; Long press = 5:8
Fade Preview to Program: Trigger
Thumb button: AutoFocus
Base buttons 7-12: short press = recall preset 1-6, long press = set preset 1-6
";

const GAME_CONTROLLER: &[(LogicalInput, ProfileEntry)] = &[
    (LogicalInput::CameraSelect(1), ProfileEntry::Button(0)),
    (LogicalInput::CameraSelect(2), ProfileEntry::Button(1)),
    (LogicalInput::CameraSelect(3), ProfileEntry::Button(2)),
    (LogicalInput::CameraSelect(4), ProfileEntry::Button(3)),
    (LogicalInput::BrightnessUp, ProfileEntry::Button(4)),
    (LogicalInput::BrightnessDown, ProfileEntry::Button(5)),
    (LogicalInput::AutoFocus, ProfileEntry::Button(6)),
    (LogicalInput::WhiteBalance, ProfileEntry::Button(7)),
    (LogicalInput::FadeToProgram(1), ProfileEntry::Button(9)),
    (LogicalInput::FadeToProgram(2), ProfileEntry::Button(10)),
    (LogicalInput::Pan, ProfileEntry::Axis(0)),
    (LogicalInput::Tilt, ProfileEntry::Axis(1)),
    (LogicalInput::FocusNear, ProfileEntry::Axis(2)),
    (LogicalInput::Zoom, ProfileEntry::Axis(4)),
    (LogicalInput::FocusFar, ProfileEntry::Axis(5)),
    (LogicalInput::PresetHat, ProfileEntry::Hat(0)),
    (LogicalInput::DeadZone, ProfileEntry::Scalar(0.1)),
    (LogicalInput::HelpText, ProfileEntry::Text(GAME_CONTROLLER_HELP)),
    (LogicalInput::HelpImage, ProfileEntry::Path("help/game_controller.png")),
];

const FLIGHT_JOYSTICK: &[(LogicalInput, ProfileEntry)] = &[
    (LogicalInput::FadeToProgram(1), ProfileEntry::Button(0)),
    (LogicalInput::AutoFocus, ProfileEntry::Button(1)),
    (LogicalInput::CameraSelect(1), ProfileEntry::Button(2)),
    (LogicalInput::CameraSelect(2), ProfileEntry::Button(3)),
    (LogicalInput::CameraSelect(3), ProfileEntry::Button(4)),
    (LogicalInput::CameraSelect(4), ProfileEntry::Button(5)),
    (LogicalInput::PresetButtonBase, ProfileEntry::Button(6)),
    (LogicalInput::PresetButtonCount, ProfileEntry::Scalar(6.0)),
    (LogicalInput::Pan, ProfileEntry::Axis(0)),
    (LogicalInput::Tilt, ProfileEntry::Axis(1)),
    (LogicalInput::Zoom, ProfileEntry::Axis(2)),
    // Flipped so that pushing the lever forward increases travel.
    (LogicalInput::Focus, ProfileEntry::Axis(3)),
    (LogicalInput::InvertAxis, ProfileEntry::Axis(3)),
    (LogicalInput::DeadZone, ProfileEntry::Scalar(0.15)),
    (LogicalInput::HelpText, ProfileEntry::Text(FLIGHT_JOYSTICK_HELP)),
    (LogicalInput::HelpImage, ProfileEntry::Path("help/flight_joystick.png")),
];

impl DeviceProfile {
    /// Picks a profile from the number of analog axes the device reports.
    ///
    /// Returns `None` for devices that match neither class.
    #[must_use]
    pub fn resolve(axis_count: usize) -> Option<Self> {
        match axis_count {
            6 => Some(DeviceProfile::GameController),
            4 => Some(DeviceProfile::FlightJoystick),
            _ => None,
        }
    }

    /// Every (logical input, physical entry) pair the profile declares.
    #[must_use]
    pub fn entries(self) -> &'static [(LogicalInput, ProfileEntry)] {
        match self {
            DeviceProfile::GameController => GAME_CONTROLLER,
            DeviceProfile::FlightJoystick => FLIGHT_JOYSTICK,
        }
    }

    /// Looks up a single logical input.
    #[must_use]
    pub fn lookup(self, input: LogicalInput) -> Option<ProfileEntry> {
        self.entries()
            .iter()
            .find(|(name, _)| *name == input)
            .map(|(_, entry)| *entry)
    }

    /// Default dead zone declared by the profile.
    #[must_use]
    pub fn dead_zone(self) -> f32 {
        match self.lookup(LogicalInput::DeadZone) {
            Some(ProfileEntry::Scalar(value)) => value,
            _ => 0.0,
        }
    }

    /// Help text for the UI.
    #[must_use]
    pub fn help_text(self) -> &'static str {
        match self.lookup(LogicalInput::HelpText) {
            Some(ProfileEntry::Text(text)) => text,
            _ => "",
        }
    }

    /// Path of the help image for the UI.
    #[must_use]
    pub fn help_image(self) -> &'static str {
        match self.lookup(LogicalInput::HelpImage) {
            Some(ProfileEntry::Path(path)) => path,
            _ => "",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::GameController => write!(f, "game controller"),
            DeviceProfile::FlightJoystick => write!(f, "flight joystick"),
        }
    }
}
