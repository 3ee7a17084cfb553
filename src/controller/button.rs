//! # Button Module
//!
//! Debounce and gesture state machine for a single logical button.
//!
//! A button is either up or down. Repeated press signals while down (and
//! repeated releases while up) are ignored. Each transition produces a
//! [`ButtonEvent`] carrying the gesture flags:
//!
//! - **double click**: the press came within `double_click_limit` of the
//!   previous press (a zero limit disables detection)
//! - **long press**: the release came strictly more than `long_press_limit`
//!   after the press
//!
//! ## Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use visca_joystick::controller::button::{Button, GestureLimits};
//! use visca_joystick::controller::profile::ControlFunction;
//!
//! let limits = GestureLimits::default();
//! let mut button = Button::new(ControlFunction::Preset, 3);
//! let t0 = Instant::now();
//!
//! assert!(button.press_at(t0, &limits).is_some());
//! assert!(button.press_at(t0, &limits).is_none()); // debounced
//!
//! let released = button.release_at(t0 + Duration::from_secs(3), &limits).unwrap();
//! assert!(released.is_long_press);
//! assert_eq!(released.value, 3);
//! ```

use std::time::{Duration, Instant};

use super::profile::ControlFunction;

/// Default long-press threshold.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_secs(2);

/// Timing thresholds shared by every button in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureLimits {
    /// Maximum gap between presses to count as a double click. Zero disables it.
    pub double_click: Duration,
    /// Minimum hold time for a long press (exclusive).
    pub long_press: Duration,
}

impl Default for GestureLimits {
    fn default() -> Self {
        Self {
            double_click: Duration::ZERO,
            long_press: DEFAULT_LONG_PRESS,
        }
    }
}

/// Snapshot handed to the bound handler on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Function the button is bound to.
    pub function: ControlFunction,
    /// Payload: camera number, preset number, ...
    pub value: u8,
    pub is_down: bool,
    pub is_double_click: bool,
    pub is_long_press: bool,
}

/// Runtime state of one button.
#[derive(Debug, Clone)]
pub struct Button {
    function: ControlFunction,
    value: u8,
    is_down: bool,
    time_pressed: Option<Instant>,
    is_double_click: bool,
    is_long_press: bool,
}

impl Button {
    /// Creates a released button bound to `function` with payload `value`.
    #[must_use]
    pub fn new(function: ControlFunction, value: u8) -> Self {
        Self {
            function,
            value,
            is_down: false,
            time_pressed: None,
            is_double_click: false,
            is_long_press: false,
        }
    }

    /// Creates a button with no binding.
    #[must_use]
    pub fn unbound() -> Self {
        Self::new(ControlFunction::None, 0)
    }

    #[must_use]
    pub fn function(&self) -> ControlFunction {
        self.function
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Changes the payload. Hats use this to carry the current direction.
    pub fn set_value(&mut self, value: u8) {
        self.value = value;
    }

    #[must_use]
    pub fn is_down(&self) -> bool {
        self.is_down
    }

    /// Physical press. Returns `None` if the button was already down.
    pub fn press_at(&mut self, now: Instant, limits: &GestureLimits) -> Option<ButtonEvent> {
        if self.is_down {
            return None;
        }
        self.is_down = true;
        self.is_double_click = match self.time_pressed {
            Some(previous) => now.saturating_duration_since(previous) < limits.double_click,
            None => false,
        };
        self.time_pressed = Some(now);
        self.is_long_press = false;
        Some(self.event())
    }

    /// Physical release. Returns `None` if the button was already up.
    pub fn release_at(&mut self, now: Instant, limits: &GestureLimits) -> Option<ButtonEvent> {
        if !self.is_down {
            return None;
        }
        self.is_down = false;
        self.is_long_press = match self.time_pressed {
            Some(pressed) => now.saturating_duration_since(pressed) > limits.long_press,
            None => false,
        };
        Some(self.event())
    }

    fn event(&self) -> ButtonEvent {
        ButtonEvent {
            function: self.function,
            value: self.value,
            is_down: self.is_down,
            is_double_click: self.is_double_click,
            is_long_press: self.is_long_press,
        }
    }
}
