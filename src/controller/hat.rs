//! # Hat Module
//!
//! A hat (D-pad) reports one of nine states as an `(x, y)` pair of
//! `-1`/`0`/`1`. It is modelled as an eight-valued button: any of the eight
//! directions is a press whose payload is the direction number, centre is a
//! release.
//!
//! Directions are numbered clockwise starting with "up":
//!
//! ```text
//!   8  1  2
//!   7  .  3
//!   6  5  4
//! ```

use std::time::Instant;

use super::button::{Button, ButtonEvent, GestureLimits};
use super::profile::ControlFunction;

/// Maps a raw hat position to its direction number (1-8).
///
/// `y = 1` is up. Centre and malformed positions return `None`.
///
/// # Examples
///
/// ```
/// use visca_joystick::controller::hat::hat_direction;
///
/// assert_eq!(hat_direction((0, 1)), Some(1));
/// assert_eq!(hat_direction((1, 0)), Some(3));
/// assert_eq!(hat_direction((0, 0)), None);
/// ```
#[must_use]
pub fn hat_direction(position: (i8, i8)) -> Option<u8> {
    match position {
        (0, 1) => Some(1),
        (1, 1) => Some(2),
        (1, 0) => Some(3),
        (1, -1) => Some(4),
        (0, -1) => Some(5),
        (-1, -1) => Some(6),
        (-1, 0) => Some(7),
        (-1, 1) => Some(8),
        _ => None,
    }
}

/// Runtime state of one hat.
#[derive(Debug, Clone)]
pub struct Hat {
    is_down: bool,
    button: Button,
}

impl Hat {
    /// Creates a centred hat bound to `function`.
    #[must_use]
    pub fn new(function: ControlFunction) -> Self {
        Self {
            is_down: false,
            button: Button::new(function, 0),
        }
    }

    #[must_use]
    pub fn unbound() -> Self {
        Self::new(ControlFunction::None)
    }

    #[must_use]
    pub fn function(&self) -> ControlFunction {
        self.button.function()
    }

    #[must_use]
    pub fn is_down(&self) -> bool {
        self.is_down
    }

    /// Feeds a settled hat position into the inner button.
    ///
    /// Moving from one direction straight to another keeps the button down
    /// and only updates its payload, so the eventual release reports the
    /// last direction held.
    pub fn update_at(
        &mut self,
        position: (i8, i8),
        now: Instant,
        limits: &GestureLimits,
    ) -> Option<ButtonEvent> {
        match hat_direction(position) {
            Some(direction) => {
                self.button.set_value(direction);
                if self.is_down {
                    None
                } else {
                    self.is_down = true;
                    self.button.press_at(now, limits)
                }
            }
            None => {
                if self.is_down {
                    self.is_down = false;
                    self.button.release_at(now, limits)
                } else {
                    None
                }
            }
        }
    }
}
